use std::collections::VecDeque;

use netsim_protocol::Bit;
use netsim_wire::{Endpoint, WireBoard};
use rand::Rng;

/// Raw `send` streams are split into packets of this many bits.
pub const PACKET_CHUNK_BITS: usize = 8;

const INITIAL_BACKOFF_CAP: u64 = 16;

/// What a [`SendReceiver`] observed during its sampling phase. The owning
/// device reacts: hosts log and reassemble, switches buffer and forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// First tick of a new outbound symbol.
    Sent(Bit),
    /// A full symbol window closed on the inbound wire; this is the
    /// majority vote over the window's samples.
    Received(Bit),
    /// The realized wire value contradicted the driven bit.
    Collision { wait: u64 },
    /// A symbol window closed with no driven value on the inbound wire.
    WentIdle,
}

/// Per-port transmit/receive state machine realizing CSMA/CD: carrier
/// sense by reading the wire back while driving it, collision detection
/// on mismatch, and binary-exponential back-off before retrying.
#[derive(Debug)]
pub struct SendReceiver {
    endpoint: Option<Endpoint>,
    signal_time: u64,
    queue: VecDeque<Vec<Bit>>,
    current: Vec<Bit>,
    index: usize,
    send_time: u64,
    time_to_send: u64,
    max_backoff: u64,
    is_sending: bool,
    sending_bit: Bit,
    time_connected: u64,
    received_bits: Vec<Bit>,
}

impl SendReceiver {
    pub fn new(signal_time: u64) -> Self {
        Self {
            endpoint: None,
            signal_time,
            queue: VecDeque::new(),
            current: Vec::new(),
            index: 0,
            send_time: 0,
            time_to_send: 0,
            max_backoff: INITIAL_BACKOFF_CAP,
            is_sending: false,
            sending_bit: 0,
            time_connected: 0,
            received_bits: Vec::new(),
        }
    }

    pub fn attach(&mut self, endpoint: Endpoint) -> Result<(), crate::PortInUse> {
        if self.endpoint.is_some() {
            return Err(crate::PortInUse);
        }
        self.endpoint = Some(endpoint);
        self.time_connected = 0;
        Ok(())
    }

    /// Unplug the link. A partially transmitted packet goes back to the
    /// queue head unchanged; all transient state is cleared.
    pub fn detach(&mut self) {
        if !self.current.is_empty() {
            let packet = std::mem::take(&mut self.current);
            self.queue.push_front(packet);
        }
        self.endpoint = None;
        self.index = 0;
        self.send_time = 0;
        self.time_to_send = 0;
        self.max_backoff = INITIAL_BACKOFF_CAP;
        self.is_sending = false;
        self.sending_bit = 0;
        self.time_connected = 0;
        self.received_bits.clear();
    }

    pub fn endpoint(&self) -> Option<Endpoint> {
        self.endpoint
    }

    pub fn is_attached(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Still transmitting or waiting out a back-off. Detached ports are
    /// never active.
    pub fn is_active(&self) -> bool {
        self.endpoint.is_some() && (self.is_sending || self.time_to_send > 0)
    }

    /// Current back-off cap; doubles on every collision.
    pub fn backoff_cap(&self) -> u64 {
        self.max_backoff
    }

    /// Queue one packet, transmitted as a unit.
    pub fn enqueue(&mut self, packet: Vec<Bit>) {
        if !packet.is_empty() {
            self.queue.push_back(packet);
        }
    }

    /// Queue a raw bit stream, split into [`PACKET_CHUNK_BITS`]-sized
    /// packets. An empty stream queues nothing.
    pub fn enqueue_stream(&mut self, stream: &[Bit]) {
        for chunk in stream.chunks(PACKET_CHUNK_BITS) {
            self.enqueue(chunk.to_vec());
        }
    }

    /// Transmit phase: pick up the next packet if idle, count down
    /// back-off, and drive the current bit onto the outbound wire.
    pub fn advance(&mut self, board: &mut WireBoard) {
        let Some(endpoint) = self.endpoint else {
            return;
        };

        self.load_next(&endpoint, board);

        if self.time_to_send > 0 {
            self.time_to_send -= 1;
        }
        if self.time_to_send > 0 {
            return;
        }

        if !self.current.is_empty() {
            self.is_sending = true;
            self.sending_bit = self.current[self.index];
            endpoint.send(board, Some(self.sending_bit));
        }

        self.time_connected += 1;
    }

    fn load_next(&mut self, endpoint: &Endpoint, board: &mut WireBoard) {
        if !self.current.is_empty() {
            return;
        }
        if let Some(next) = self.queue.pop_front() {
            self.current = next;
            self.index = 0;
            self.send_time = 0;
            self.max_backoff = INITIAL_BACKOFF_CAP;
            self.is_sending = true;
        } else if self.is_sending {
            self.sending_bit = 0;
            self.is_sending = false;
            endpoint.send(board, None);
        }
    }

    /// Receive phase, run after the medium has settled for this tick.
    pub fn sample<R: Rng + ?Sized>(
        &mut self,
        board: &WireBoard,
        rng: &mut R,
        events: &mut Vec<LineEvent>,
    ) {
        let Some(endpoint) = self.endpoint else {
            return;
        };

        if self.is_sending {
            if self.check_collision(&endpoint, board, rng, events) {
                return;
            }
            if self.send_time == 0 {
                events.push(LineEvent::Sent(self.sending_bit));
            }
            self.send_time += 1;
            if self.send_time == self.signal_time {
                self.index += 1;
                if self.index == self.current.len() {
                    self.current.clear();
                }
                self.send_time = 0;
            }
            return;
        }

        // Reception only happens over a dedicated inbound conductor; on a
        // shared segment the port would just read its own transmissions
        // back.
        if endpoint.is_shared() {
            return;
        }

        let sample_every = (self.signal_time / 3).max(1);
        if self.time_connected % sample_every == 0 {
            if let Some(bit) = endpoint.receive(board) {
                self.received_bits.push(bit);
            }
        }

        if self.time_connected % self.signal_time == 0 {
            if self.received_bits.is_empty() {
                events.push(LineEvent::WentIdle);
            } else {
                events.push(LineEvent::Received(majority(&self.received_bits)));
                self.received_bits.clear();
            }
        }
    }

    fn check_collision<R: Rng + ?Sized>(
        &mut self,
        endpoint: &Endpoint,
        board: &WireBoard,
        rng: &mut R,
        events: &mut Vec<LineEvent>,
    ) -> bool {
        if endpoint.send_value(board) == Some(self.sending_bit) {
            return false;
        }

        self.time_to_send = rng.gen_range(1..=self.max_backoff);
        self.max_backoff *= 2;
        self.index = 0;
        self.send_time = 0;
        self.is_sending = false;
        tracing::debug!(wait = self.time_to_send, "collision detected");
        events.push(LineEvent::Collision {
            wait: self.time_to_send,
        });
        true
    }
}

/// Majority vote over a symbol window; ties prefer the larger bit value.
fn majority(samples: &[Bit]) -> Bit {
    let ones = samples.iter().filter(|&&b| b == 1).count();
    let zeros = samples.len() - ones;
    if ones >= zeros {
        1
    } else {
        0
    }
}
