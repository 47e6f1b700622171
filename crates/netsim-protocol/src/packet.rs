use core::net::Ipv4Addr;

use crate::bits::{self, Bit};

/// Fixed packet header: dest IP (32) | source IP (32) | TTL (8) |
/// protocol (8) | payload size in bytes (8).
pub const IP_HEADER_BITS: usize = 88;

pub const PROTO_ICMP: u8 = 1;
pub const ICMP_ECHO_REQUEST: u8 = 8;
pub const ICMP_ECHO_REPLY: u8 = 0;

/// Hop limit stamped on locally originated packets.
pub const DEFAULT_TTL: u8 = 64;

/// The 32-bit address as bits, most significant octet first.
pub fn ip_bits(addr: Ipv4Addr) -> Vec<Bit> {
    bits::from_int(u64::from(u32::from(addr)), 32)
}

/// Reassemble an address from exactly 32 bits.
pub fn ip_from_bits(raw: &[Bit]) -> Option<Ipv4Addr> {
    if raw.len() != 32 {
        return None;
    }
    Some(Ipv4Addr::from(bits::to_int(raw) as u32))
}

/// A network-layer packet carried inside a frame payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpPacket {
    pub dest: Ipv4Addr,
    pub src: Ipv4Addr,
    pub ttl: u8,
    pub protocol: u8,
    pub payload: Vec<Bit>,
}

impl IpPacket {
    /// A packet with the default TTL and an opaque payload. The payload is
    /// left-padded to a whole number of bytes.
    pub fn new(dest: Ipv4Addr, src: Ipv4Addr, protocol: u8, payload: &[Bit]) -> IpPacket {
        IpPacket {
            dest,
            src,
            ttl: DEFAULT_TTL,
            protocol,
            payload: bits::pad_left_to_byte(payload),
        }
    }

    pub fn echo_request(dest: Ipv4Addr, src: Ipv4Addr) -> IpPacket {
        Self::new(dest, src, PROTO_ICMP, &bits::from_int(u64::from(ICMP_ECHO_REQUEST), 8))
    }

    pub fn echo_reply(dest: Ipv4Addr, src: Ipv4Addr) -> IpPacket {
        Self::new(dest, src, PROTO_ICMP, &bits::from_int(u64::from(ICMP_ECHO_REPLY), 8))
    }

    /// Recognize a packet at the head of `raw`. `None` while shorter than
    /// the header or than the declared length.
    pub fn parse(raw: &[Bit]) -> Option<IpPacket> {
        if raw.len() < IP_HEADER_BITS {
            return None;
        }
        let payload_bytes = bits::to_int(&raw[80..88]) as usize;
        let total = IP_HEADER_BITS + 8 * payload_bytes;
        if raw.len() < total {
            return None;
        }
        Some(IpPacket {
            dest: ip_from_bits(&raw[0..32])?,
            src: ip_from_bits(&raw[32..64])?,
            ttl: bits::to_int(&raw[64..72]) as u8,
            protocol: bits::to_int(&raw[72..80]) as u8,
            payload: raw[IP_HEADER_BITS..total].to_vec(),
        })
    }

    pub fn to_bits(&self) -> Vec<Bit> {
        let mut out = Vec::with_capacity(IP_HEADER_BITS + self.payload.len());
        out.extend(ip_bits(self.dest));
        out.extend(ip_bits(self.src));
        out.extend(bits::from_int(u64::from(self.ttl), 8));
        out.extend(bits::from_int(u64::from(self.protocol), 8));
        out.extend(bits::from_int((self.payload.len() / 8) as u64, 8));
        out.extend_from_slice(&self.payload);
        out
    }

    /// The ICMP opcode byte, for ICMP packets that carry one.
    pub fn icmp_opcode(&self) -> Option<u8> {
        if self.protocol != PROTO_ICMP || self.payload.len() < 8 {
            return None;
        }
        Some(bits::to_int(&self.payload[..8]) as u8)
    }
}
