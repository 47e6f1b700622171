use std::collections::HashMap;

use netsim_protocol::{Bit, Frame, MacAddr};
use netsim_wire::{Endpoint, WireBoard};
use rand::Rng;

use crate::{LineEvent, PortInUse, SendReceiver};

/// A learning bridge: buffers the inbound bit stream of every port,
/// recognizes complete frames, learns which port each source MAC lives
/// behind, and forwards to the learned port or floods everywhere else.
#[derive(Debug)]
pub struct Switch {
    name: String,
    ports: Vec<SendReceiver>,
    buffers: Vec<Vec<Bit>>,
    mac_table: HashMap<MacAddr, usize>,
}

impl Switch {
    pub fn new(name: impl Into<String>, ports: usize, signal_time: u64) -> Self {
        Self {
            name: name.into(),
            ports: (0..ports).map(|_| SendReceiver::new(signal_time)).collect(),
            buffers: vec![Vec::new(); ports],
            mac_table: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ports(&self) -> usize {
        self.ports.len()
    }

    /// Learned source-MAC to port mapping (0-based port indices).
    pub fn mac_table(&self) -> &HashMap<MacAddr, usize> {
        &self.mac_table
    }

    pub fn attach(&mut self, port: usize, endpoint: Endpoint) -> Result<(), PortInUse> {
        self.ports[port].attach(endpoint)
    }

    /// Detach a port, dropping whatever partial frame it was buffering.
    pub fn detach(&mut self, port: usize) {
        self.ports[port].detach();
        self.buffers[port].clear();
    }

    pub fn is_attached(&self, port: usize) -> bool {
        self.ports[port].is_attached()
    }

    pub fn has_attachments(&self) -> bool {
        self.ports.iter().any(SendReceiver::is_attached)
    }

    pub fn is_active(&self) -> bool {
        self.ports.iter().any(SendReceiver::is_active)
    }

    pub fn advance(&mut self, board: &mut WireBoard) {
        for port in &mut self.ports {
            port.advance(board);
        }
    }

    pub fn sample<R: Rng + ?Sized>(&mut self, board: &WireBoard, rng: &mut R) {
        let mut events = Vec::new();
        for port in 0..self.ports.len() {
            events.clear();
            self.ports[port].sample(board, rng, &mut events);
            for event in events.drain(..) {
                if let LineEvent::Received(bit) = event {
                    self.buffers[port].push(bit);
                    self.drain_buffer(port);
                }
            }
        }
    }

    fn drain_buffer(&mut self, port: usize) {
        let Some(frame) = Frame::parse(&self.buffers[port]) else {
            return;
        };
        self.buffers[port].clear();

        let src = frame.src();
        if !src.is_broadcast() {
            self.mac_table.insert(src, port);
        }

        match self.mac_table.get(&frame.dest()).copied() {
            Some(out) => {
                tracing::debug!(switch = %self.name, %src, port = out + 1, "forwarding");
                self.ports[out].enqueue(frame.into_bits());
            }
            None => {
                let bits = frame.into_bits();
                for (i, out) in self.ports.iter_mut().enumerate() {
                    if i != port && out.is_attached() {
                        out.enqueue(bits.clone());
                    }
                }
            }
        }
    }

    /// Per-port `(received, sent)` wire values for the transcript row.
    pub fn port_values(&self, board: &WireBoard) -> Vec<(Option<Bit>, Option<Bit>)> {
        self.ports
            .iter()
            .map(|port| match port.endpoint() {
                Some(endpoint) => (endpoint.receive(board), endpoint.send_value(board)),
                None => (None, None),
            })
            .collect()
    }
}
