use thiserror::Error;

/// Fatal simulation errors: topology mistakes and malformed instructions
/// abort the run. Link- and network-level trouble (collisions, check
/// failures, routing misses) never surfaces here; it stays in the device
/// transcripts.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("the device name {0} is already taken")]
    DuplicateDevice(String),

    #[error("unknown device {0}")]
    UnknownDevice(String),

    #[error("unknown port {0}")]
    UnknownPort(String),

    #[error("unknown host {0}")]
    UnknownHost(String),

    #[error("port {0} is currently in use")]
    PortInUse(String),

    #[error("{device} is not a {expected}")]
    WrongDeviceKind {
        device: String,
        expected: &'static str,
    },

    #[error("{device} has no interface {iface}")]
    NoSuchInterface { device: String, iface: usize },

    #[error("{device} needs an IP address assigned first")]
    MissingAddress { device: String },
}
