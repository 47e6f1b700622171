//! Device models of the simulated LAN: the per-port CSMA/CD
//! [`SendReceiver`], the inbound [`FrameAssembler`], and the four device
//! kinds ([`Host`], [`Hub`], [`Switch`], [`Router`]) the driver ticks.
//!
//! Devices never hold references to each other; they touch the shared
//! medium only through [`netsim_wire::Endpoint`]s handed to them on
//! connect. Per-tick behavior is split into a transmit phase (`advance`)
//! and a receive phase (`sample`), which the driver interleaves with the
//! hub fixpoint so that every device observes a consistent medium.

use std::fmt;

mod assembler;
mod host;
mod hub;
mod router;
mod send_receiver;
mod switch;

pub use assembler::FrameAssembler;
pub use host::{DataRecord, Host, PayloadRecord};
pub use hub::Hub;
pub use router::{Route, RouteTable, Router};
pub use send_receiver::{LineEvent, SendReceiver, PACKET_CHUNK_BITS};
pub use switch::Switch;

/// A transcript line: what a device did at a given tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub time: u64,
    pub action: String,
    pub info: String,
}

impl LogEntry {
    pub fn new(time: u64, action: impl Into<String>, info: impl Into<String>) -> Self {
        Self {
            time,
            action: action.into(),
            info: info.into(),
        }
    }
}

/// Attaching to a port that already has a link plugged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortInUse;

impl fmt::Display for PortInUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("port is currently in use")
    }
}

impl std::error::Error for PortInUse {}
