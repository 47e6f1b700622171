use netsim_protocol::Bit;
use netsim_wire::{Endpoint, WireBoard};

use crate::PortInUse;

/// An N-port repeater. A hub holds no state beyond its attachments: each
/// merge pass ORs every driven inbound bit and drives the result back out
/// on all attached wires, the source port included. The driver repeats
/// [`Hub::merge`] until the medium stops changing so that chained hubs
/// converge within one tick.
#[derive(Debug)]
pub struct Hub {
    name: String,
    ports: Vec<Option<Endpoint>>,
}

impl Hub {
    pub fn new(name: impl Into<String>, ports: usize) -> Self {
        Self {
            name: name.into(),
            ports: vec![None; ports],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ports(&self) -> usize {
        self.ports.len()
    }

    pub fn attach(&mut self, port: usize, endpoint: Endpoint) -> Result<(), PortInUse> {
        if self.ports[port].is_some() {
            return Err(PortInUse);
        }
        self.ports[port] = Some(endpoint);
        Ok(())
    }

    pub fn detach(&mut self, port: usize) {
        self.ports[port] = None;
    }

    pub fn is_attached(&self, port: usize) -> bool {
        self.ports[port].is_some()
    }

    pub fn has_attachments(&self) -> bool {
        self.ports.iter().any(Option::is_some)
    }

    /// One merge pass. Returns whether any wire value changed, so the
    /// driver can stop iterating once the segment is stable.
    pub fn merge(&self, board: &mut WireBoard) -> bool {
        let merged = self
            .ports
            .iter()
            .flatten()
            .filter_map(|endpoint| endpoint.receive(board))
            .reduce(|a, b| a | b);

        let Some(value) = merged else {
            return false;
        };

        let mut changed = false;
        for endpoint in self.ports.iter().flatten() {
            if endpoint.send_value(board) != Some(value) {
                changed = true;
            }
            endpoint.send(board, Some(value));
            if endpoint.receive(board).is_some() && endpoint.receive(board) != Some(value) {
                changed = true;
                board.drive(endpoint.recv, value);
            }
        }
        changed
    }

    /// The realized value on each port's conductor, `None` for detached
    /// ports or idle wires. Used for the per-tick transcript row.
    pub fn port_values(&self, board: &WireBoard) -> Vec<Option<Bit>> {
        self.ports
            .iter()
            .map(|port| port.and_then(|endpoint| endpoint.receive(board)))
            .collect()
    }
}
