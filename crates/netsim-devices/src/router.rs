use core::net::Ipv4Addr;
use std::collections::HashMap;

use netsim_protocol::{arp, Bit, CheckAlgorithm, Frame, IpPacket, MacAddr};
use netsim_wire::{Endpoint, WireBoard};
use rand::Rng;

use crate::{FrameAssembler, LineEvent, LogEntry, PortInUse, SendReceiver};

/// One entry of a router's forwarding table. `iface` is the 1-based
/// interface number the packet leaves through; a gateway of `0.0.0.0`
/// means the destination is on that interface's own subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub dest: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub iface: usize,
}

impl Route {
    pub fn matches(&self, ip: Ipv4Addr) -> bool {
        u32::from(ip) & u32::from(self.mask) == u32::from(self.dest)
    }
}

/// Routes ordered by descending mask, so the first match is the longest
/// prefix. At most one route exists per `(dest, mask)` pair.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn add(&mut self, route: Route) {
        self.routes
            .retain(|r| !(r.dest == route.dest && r.mask == route.mask));
        self.routes.push(route);
        self.routes.sort_by(|a, b| u32::from(b.mask).cmp(&u32::from(a.mask)));
    }

    pub fn remove(&mut self, route: &Route) {
        self.routes.retain(|r| r != route);
    }

    pub fn reset(&mut self) {
        self.routes.clear();
    }

    pub fn lookup(&self, ip: Ipv4Addr) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(ip))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

#[derive(Debug)]
struct Iface {
    sr: SendReceiver,
    assembler: FrameAssembler,
    mac: Option<MacAddr>,
    ip: Option<(Ipv4Addr, Ipv4Addr)>,
    arp_table: HashMap<Ipv4Addr, MacAddr>,
    pending_arp: HashMap<Ipv4Addr, Vec<Vec<Bit>>>,
}

impl Iface {
    fn new(signal_time: u64) -> Self {
        Self {
            sr: SendReceiver::new(signal_time),
            assembler: FrameAssembler::new(),
            mac: None,
            ip: None,
            arp_table: HashMap::new(),
            pending_arp: HashMap::new(),
        }
    }
}

/// A multi-interface IP forwarder: longest-prefix route lookup plus the
/// same per-interface ARP machinery a host uses.
#[derive(Debug)]
pub struct Router {
    name: String,
    ifaces: Vec<Iface>,
    table: RouteTable,
    check: CheckAlgorithm,
    log: Vec<LogEntry>,
}

impl Router {
    pub fn new(name: impl Into<String>, ports: usize, signal_time: u64, check: CheckAlgorithm) -> Self {
        Self {
            name: name.into(),
            ifaces: (0..ports).map(|_| Iface::new(signal_time)).collect(),
            table: RouteTable::default(),
            check,
            log: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ports(&self) -> usize {
        self.ifaces.len()
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn add_route(&mut self, route: Route) {
        self.table.add(route);
    }

    pub fn remove_route(&mut self, route: &Route) {
        self.table.remove(route);
    }

    pub fn reset_routes(&mut self) {
        self.table.reset();
    }

    pub fn set_mac(&mut self, iface: usize, mac: MacAddr) {
        self.ifaces[iface].mac = Some(mac);
    }

    pub fn mac(&self, iface: usize) -> Option<MacAddr> {
        self.ifaces[iface].mac
    }

    pub fn set_ip(&mut self, iface: usize, addr: Ipv4Addr, mask: Ipv4Addr) {
        self.ifaces[iface].ip = Some((addr, mask));
    }

    pub fn ip(&self, iface: usize) -> Option<Ipv4Addr> {
        self.ifaces[iface].ip.map(|(addr, _)| addr)
    }

    pub fn attach(&mut self, port: usize, endpoint: Endpoint) -> Result<(), PortInUse> {
        self.ifaces[port].sr.attach(endpoint)
    }

    pub fn detach(&mut self, port: usize) {
        self.ifaces[port].sr.detach();
        self.ifaces[port].assembler.reset();
    }

    pub fn is_attached(&self, port: usize) -> bool {
        self.ifaces[port].sr.is_attached()
    }

    pub fn has_attachments(&self) -> bool {
        self.ifaces.iter().any(|iface| iface.sr.is_attached())
    }

    pub fn is_active(&self) -> bool {
        self.ifaces.iter().any(|iface| iface.sr.is_active())
    }

    pub fn advance(&mut self, board: &mut WireBoard) {
        for iface in &mut self.ifaces {
            iface.sr.advance(board);
        }
    }

    pub fn sample<R: Rng + ?Sized>(&mut self, time: u64, board: &WireBoard, rng: &mut R) {
        let mut events = Vec::new();
        for port in 0..self.ifaces.len() {
            events.clear();
            self.ifaces[port].sr.sample(board, rng, &mut events);
            for event in events.drain(..) {
                match event {
                    LineEvent::Received(bit) => {
                        let own_mac = self.ifaces[port].mac;
                        if let Some(frame) = self.ifaces[port].assembler.push(bit, own_mac) {
                            self.handle_frame(time, port, &frame);
                        }
                    }
                    LineEvent::WentIdle => self.ifaces[port].assembler.reset(),
                    LineEvent::Sent(_) | LineEvent::Collision { .. } => {}
                }
            }
        }
    }

    fn handle_frame(&mut self, time: u64, port: usize, raw: &[Bit]) {
        let Some(frame) = Frame::parse(raw) else {
            return;
        };
        if !frame.verify(&self.check) {
            self.log
                .push(LogEntry::new(time, "ERROR", "check mismatch"));
            return;
        }

        if frame.is_broadcast() {
            if let Some(ip) = arp::parse_query(frame.payload()) {
                if self.ip(port) == Some(ip) {
                    self.send_frame(port, frame.src(), &arp::reply_payload(ip));
                }
            }
            return;
        }

        if let Some(ip) = arp::parse_reply(frame.payload()) {
            if self.ifaces[port].pending_arp.contains_key(&ip) {
                let mac = frame.src();
                self.ifaces[port].arp_table.insert(ip, mac);
                let waiting = self.ifaces[port].pending_arp.remove(&ip).unwrap_or_default();
                for packet_bits in waiting {
                    self.send_frame(port, mac, &packet_bits);
                }
                return;
            }
        }

        if let Some(packet) = IpPacket::parse(frame.payload()) {
            self.forward(time, packet);
        }
    }

    fn forward(&mut self, time: u64, mut packet: IpPacket) {
        if packet.ttl <= 1 {
            self.log.push(LogEntry::new(
                time,
                "Dropped",
                format!("TTL expired for {}", packet.dest),
            ));
            return;
        }
        packet.ttl -= 1;

        let Some(route) = self.table.lookup(packet.dest).copied() else {
            self.log.push(LogEntry::new(
                time,
                "Dropped",
                format!("no route to {}", packet.dest),
            ));
            return;
        };

        let out = route.iface.wrapping_sub(1);
        if out >= self.ifaces.len() {
            self.log.push(LogEntry::new(
                time,
                "Dropped",
                format!("route names missing interface {}", route.iface),
            ));
            return;
        }

        let next_hop = if route.gateway.is_unspecified() {
            packet.dest
        } else {
            route.gateway
        };

        let bits = packet.to_bits();
        if let Some(&mac) = self.ifaces[out].arp_table.get(&next_hop) {
            self.send_frame(out, mac, &bits);
        } else {
            self.ifaces[out]
                .pending_arp
                .entry(next_hop)
                .or_default()
                .push(bits);
            self.send_frame(out, MacAddr::BROADCAST, &arp::query_payload(next_hop));
        }
    }

    fn send_frame(&mut self, port: usize, dest: MacAddr, payload: &[Bit]) {
        let Some(src) = self.ifaces[port].mac else {
            tracing::warn!(router = %self.name, iface = port + 1, "transmit before a MAC was assigned");
            return;
        };
        let frame = Frame::build(dest, src, payload, &self.check);
        self.ifaces[port].sr.enqueue(frame.into_bits());
    }
}
