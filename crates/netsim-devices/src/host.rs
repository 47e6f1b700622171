use core::net::Ipv4Addr;
use std::collections::HashMap;

use netsim_protocol::{
    arp, bits, Bit, CheckAlgorithm, Frame, IpPacket, MacAddr, ICMP_ECHO_REQUEST,
};
use netsim_wire::{Endpoint, WireBoard};
use rand::Rng;

use crate::{FrameAssembler, LineEvent, LogEntry, PortInUse, SendReceiver};

/// Link-layer receipt, one per frame delivered to (or corrupted at) the
/// host. Written to `{name}_data.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRecord {
    pub time: u64,
    pub source: MacAddr,
    pub payload_hex: String,
    pub error: bool,
}

/// Network-layer receipt, one per IP packet addressed to this host.
/// Written to `{name}_payload.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadRecord {
    pub time: u64,
    pub source: Ipv4Addr,
    pub payload_hex: String,
}

/// An endpoint PC: one CSMA/CD port plus the address state and the
/// ARP/ICMP behavior that sits on top of it.
#[derive(Debug)]
pub struct Host {
    name: String,
    sr: SendReceiver,
    assembler: FrameAssembler,
    mac: Option<MacAddr>,
    ip: Option<(Ipv4Addr, Ipv4Addr)>,
    arp_table: HashMap<Ipv4Addr, MacAddr>,
    pending_arp: HashMap<Ipv4Addr, Vec<Vec<Bit>>>,
    check: CheckAlgorithm,
    error_prob: f64,
    log: Vec<LogEntry>,
    data_records: Vec<DataRecord>,
    payload_records: Vec<PayloadRecord>,
}

impl Host {
    pub fn new(name: impl Into<String>, signal_time: u64, check: CheckAlgorithm, error_prob: f64) -> Self {
        Self {
            name: name.into(),
            sr: SendReceiver::new(signal_time),
            assembler: FrameAssembler::new(),
            mac: None,
            ip: None,
            arp_table: HashMap::new(),
            pending_arp: HashMap::new(),
            check,
            error_prob,
            log: Vec::new(),
            data_records: Vec::new(),
            payload_records: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mac(&self) -> Option<MacAddr> {
        self.mac
    }

    pub fn set_mac(&mut self, mac: MacAddr) {
        self.mac = Some(mac);
    }

    pub fn ip(&self) -> Option<Ipv4Addr> {
        self.ip.map(|(addr, _)| addr)
    }

    pub fn set_ip(&mut self, addr: Ipv4Addr, mask: Ipv4Addr) {
        self.ip = Some((addr, mask));
    }

    pub fn arp_table(&self) -> &HashMap<Ipv4Addr, MacAddr> {
        &self.arp_table
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn data_records(&self) -> &[DataRecord] {
        &self.data_records
    }

    pub fn payload_records(&self) -> &[PayloadRecord] {
        &self.payload_records
    }

    pub fn is_active(&self) -> bool {
        self.sr.is_active()
    }

    pub fn is_attached(&self) -> bool {
        self.sr.is_attached()
    }

    pub fn endpoint(&self) -> Option<Endpoint> {
        self.sr.endpoint()
    }

    pub fn attach(&mut self, endpoint: Endpoint, time: u64) -> Result<(), PortInUse> {
        self.sr.attach(endpoint)?;
        self.log.push(LogEntry::new(time, "Connected", ""));
        Ok(())
    }

    pub fn detach(&mut self, time: u64) {
        self.sr.detach();
        self.assembler.reset();
        self.log.push(LogEntry::new(time, "Disconnected", ""));
    }

    /// Queue a raw bit stream on the port, split into 8-bit packets.
    pub fn send_stream(&mut self, stream: &[Bit]) {
        self.sr.enqueue_stream(stream);
    }

    /// Build a frame around `payload` and queue it as one packet. With
    /// probability `error_prob` one random bit of the frame body (payload
    /// or check field) is flipped before it leaves, modelling a noisy
    /// line.
    pub fn send_frame<R: Rng + ?Sized>(&mut self, dest: MacAddr, payload: &[Bit], rng: &mut R) {
        let Some(src) = self.mac else {
            tracing::warn!(host = %self.name, "send_frame before a MAC was assigned");
            return;
        };
        let mut frame = Frame::build(dest, src, payload, &self.check).into_bits();
        if self.error_prob > 0.0 && rng.gen::<f64>() < self.error_prob {
            let flip = rng.gen_range(netsim_protocol::FRAME_HEADER_BITS..frame.len());
            frame[flip] ^= 1;
        }
        self.sr.enqueue(frame);
    }

    /// Send a network-layer packet, resolving the destination MAC first if
    /// necessary. Unresolved packets wait in the pending queue until the
    /// ARP reply arrives.
    pub fn send_ip_packet<R: Rng + ?Sized>(&mut self, packet: IpPacket, rng: &mut R) {
        if let Some(&mac) = self.arp_table.get(&packet.dest) {
            self.send_frame(mac, &packet.to_bits(), rng);
        } else {
            let dest = packet.dest;
            self.pending_arp.entry(dest).or_default().push(packet.to_bits());
            self.send_frame(MacAddr::BROADCAST, &arp::query_payload(dest), rng);
        }
    }

    /// ICMP echo request to `dest`.
    pub fn ping<R: Rng + ?Sized>(&mut self, dest: Ipv4Addr, rng: &mut R) {
        let Some((src, _)) = self.ip else {
            tracing::warn!(host = %self.name, "ping before an IP was assigned");
            return;
        };
        self.send_ip_packet(IpPacket::echo_request(dest, src), rng);
    }

    /// Transmit phase of the tick.
    pub fn advance(&mut self, board: &mut WireBoard) {
        self.sr.advance(board);
    }

    /// Receive phase of the tick, after the medium settled.
    pub fn sample<R: Rng + ?Sized>(&mut self, time: u64, board: &WireBoard, rng: &mut R) {
        let mut events = Vec::new();
        self.sr.sample(board, rng, &mut events);

        for event in events {
            match event {
                LineEvent::Sent(bit) => {
                    self.log.push(LogEntry::new(time, "Sent", bit.to_string()));
                }
                LineEvent::Collision { wait } => {
                    self.log.push(LogEntry::new(
                        time,
                        "Collision",
                        format!("Waiting {wait}ms to send"),
                    ));
                }
                LineEvent::Received(bit) => {
                    self.log.push(LogEntry::new(time, "Received", bit.to_string()));
                    if let Some(frame) = self.assembler.push(bit, self.mac) {
                        self.handle_frame(time, &frame, rng);
                    }
                }
                LineEvent::WentIdle => {
                    self.assembler.reset();
                }
            }
        }
    }

    fn handle_frame<R: Rng + ?Sized>(&mut self, time: u64, raw: &[Bit], rng: &mut R) {
        let Some(frame) = Frame::parse(raw) else {
            return;
        };

        let ok = frame.verify(&self.check);
        self.data_records.push(DataRecord {
            time,
            source: frame.src(),
            payload_hex: bits::to_hex(frame.payload()),
            error: !ok,
        });
        if !ok {
            self.log.push(LogEntry::new(time, "ERROR", "check mismatch"));
            return;
        }

        if frame.is_broadcast() {
            if let Some(ip) = arp::parse_query(frame.payload()) {
                if self.ip() == Some(ip) {
                    self.send_frame(frame.src(), &arp::reply_payload(ip), rng);
                }
            }
            return;
        }

        if let Some(ip) = arp::parse_reply(frame.payload()) {
            if self.pending_arp.contains_key(&ip) {
                let mac = frame.src();
                self.arp_table.insert(ip, mac);
                for packet_bits in self.pending_arp.remove(&ip).unwrap_or_default() {
                    self.send_frame(mac, &packet_bits, rng);
                }
                return;
            }
        }

        if let Some(packet) = IpPacket::parse(frame.payload()) {
            if self.ip() == Some(packet.dest) {
                self.payload_records.push(PayloadRecord {
                    time,
                    source: packet.src,
                    payload_hex: bits::to_hex(&packet.payload),
                });
                if packet.icmp_opcode() == Some(ICMP_ECHO_REQUEST) {
                    self.send_ip_packet(IpPacket::echo_reply(packet.src, packet.dest), rng);
                }
            }
        }
    }
}
