//! The ad-hoc address-resolution payloads: a query is the ASCII literal
//! `ARPQ` followed by the 32-bit address being resolved, broadcast on the
//! segment; a reply is a unicast frame whose payload is just the resolved
//! 32-bit address (the answering MAC rides in the frame's source field).

use core::net::Ipv4Addr;

use crate::bits::{self, Bit};
use crate::packet::{ip_bits, ip_from_bits};

const QUERY_TAG: &str = "ARPQ";

pub fn query_payload(ip: Ipv4Addr) -> Vec<Bit> {
    let mut out = bits::from_ascii(QUERY_TAG);
    out.extend(ip_bits(ip));
    out
}

/// The queried address, when `payload` starts with the query tag.
pub fn parse_query(payload: &[Bit]) -> Option<Ipv4Addr> {
    let tag = bits::from_ascii(QUERY_TAG);
    if payload.len() < tag.len() + 32 || payload[..tag.len()] != tag[..] {
        return None;
    }
    ip_from_bits(&payload[tag.len()..tag.len() + 32])
}

pub fn reply_payload(ip: Ipv4Addr) -> Vec<Bit> {
    ip_bits(ip)
}

/// The resolved address, when `payload` is exactly one 32-bit address.
pub fn parse_reply(payload: &[Bit]) -> Option<Ipv4Addr> {
    ip_from_bits(payload)
}
