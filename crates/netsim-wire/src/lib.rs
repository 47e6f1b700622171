//! Physical layer of the simulator: single-bit tri-state wires and the
//! duplex links that bind them into per-device endpoints.
//!
//! Wires live in a [`WireBoard`] arena and are addressed by [`WireId`];
//! devices hold endpoints (a pair of wire ids), never references into the
//! arena, so links can be shared between two devices without ownership
//! cycles.

/// A transmitted bit. Only `0` and `1` are ever driven onto a wire.
pub type Bit = u8;

/// Handle to a wire inside a [`WireBoard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WireId(u32);

/// One side of a duplex link: the wire this endpoint reads from and the
/// wire it writes to. For a *shared* link both ids alias the same wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub recv: WireId,
    pub send: WireId,
}

impl Endpoint {
    /// Whether both directions run over one conductor (hub-facing links).
    pub fn is_shared(&self) -> bool {
        self.recv == self.send
    }

    /// Drive the outbound wire. `None` releases it back to idle.
    pub fn send(&self, board: &mut WireBoard, bit: Option<Bit>) {
        board.set(self.send, bit);
    }

    /// Sample the inbound wire.
    pub fn receive(&self, board: &WireBoard) -> Option<Bit> {
        board.sample(self.recv)
    }

    /// Current value of the outbound wire, as realized after any merging.
    pub fn send_value(&self, board: &WireBoard) -> Option<Bit> {
        board.sample(self.send)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Wire {
    value: Option<Bit>,
}

/// Arena of all wires in a simulation.
#[derive(Debug, Default)]
pub struct WireBoard {
    wires: Vec<Wire>,
}

impl WireBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self) -> WireId {
        let id = WireId(self.wires.len() as u32);
        self.wires.push(Wire::default());
        id
    }

    /// Build a full duplex link: two independent wires, with the two
    /// endpoints seeing them swapped.
    pub fn full_link(&mut self) -> (Endpoint, Endpoint) {
        let a = self.alloc();
        let b = self.alloc();
        (
            Endpoint { recv: a, send: b },
            Endpoint { recv: b, send: a },
        )
    }

    /// Build a shared link: both directions alias a single conductor.
    pub fn shared_link(&mut self) -> (Endpoint, Endpoint) {
        let w = self.alloc();
        (
            Endpoint { recv: w, send: w },
            Endpoint { recv: w, send: w },
        )
    }

    pub fn drive(&mut self, id: WireId, bit: Bit) {
        self.wires[id.0 as usize].value = Some(bit);
    }

    pub fn clear(&mut self, id: WireId) {
        self.wires[id.0 as usize].value = None;
    }

    pub fn set(&mut self, id: WireId, bit: Option<Bit>) {
        self.wires[id.0 as usize].value = bit;
    }

    pub fn sample(&self, id: WireId) -> Option<Bit> {
        self.wires[id.0 as usize].value
    }

    /// Restore every wire to idle. The driver calls this at the start of
    /// each tick, before any device transmits.
    pub fn clear_all(&mut self) {
        for wire in &mut self.wires {
            wire.value = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_link_keeps_directions_separate() {
        let mut board = WireBoard::new();
        let (a, b) = board.full_link();
        assert!(!a.is_shared());

        a.send(&mut board, Some(1));
        assert_eq!(b.receive(&board), Some(1));
        assert_eq!(a.receive(&board), None);

        b.send(&mut board, Some(0));
        assert_eq!(a.receive(&board), Some(0));
        assert_eq!(b.receive(&board), Some(1));
    }

    #[test]
    fn shared_link_aliases_one_conductor() {
        let mut board = WireBoard::new();
        let (a, b) = board.shared_link();
        assert!(a.is_shared());

        a.send(&mut board, Some(1));
        assert_eq!(a.receive(&board), Some(1));
        assert_eq!(b.receive(&board), Some(1));

        b.send(&mut board, Some(0));
        assert_eq!(a.receive(&board), Some(0));
    }

    #[test]
    fn clear_all_returns_wires_to_idle() {
        let mut board = WireBoard::new();
        let (a, b) = board.full_link();
        a.send(&mut board, Some(1));
        b.send(&mut board, Some(1));
        board.clear_all();
        assert_eq!(a.receive(&board), None);
        assert_eq!(b.receive(&board), None);
        assert_eq!(a.send_value(&board), None);
    }
}
