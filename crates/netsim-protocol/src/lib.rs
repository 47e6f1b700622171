//! Wire formats of the simulated network: bit-vector helpers, hardware and
//! network addresses, the link-layer [`Frame`] and network-layer
//! [`IpPacket`] codecs, the ad-hoc ARP payloads, and the pluggable
//! error-detection algorithms.
//!
//! Everything here is pure data manipulation over MSB-first bit vectors;
//! no simulation state is involved.

pub mod arp;
pub mod bits;

mod check;
mod frame;
mod mac;
mod packet;

pub use bits::Bit;
pub use check::{CheckAlgorithm, CheckData, UnknownAlgorithm};
pub use frame::{Frame, FRAME_HEADER_BITS};
pub use mac::{MacAddr, ParseMacError};
pub use packet::{
    ip_bits, ip_from_bits, IpPacket, DEFAULT_TTL, ICMP_ECHO_REPLY, ICMP_ECHO_REQUEST,
    IP_HEADER_BITS, PROTO_ICMP,
};
