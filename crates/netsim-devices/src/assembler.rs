use netsim_protocol::{bits, Bit, MacAddr, FRAME_HEADER_BITS};

/// Reassembles frames out of the inbound bit stream of one port.
///
/// The start of a frame is recognized when the last 16 received bits equal
/// the port's own MAC or the broadcast MAC; the header then declares how
/// many more bits belong to the frame. When the line goes quiet mid-frame
/// the owner calls [`FrameAssembler::reset`] and the partial frame is
/// discarded.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buf: Vec<Bit>,
    receiving: bool,
    start: usize,
    total: Option<usize>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.buf.clear();
        self.receiving = false;
        self.start = 0;
        self.total = None;
    }

    pub fn is_receiving(&self) -> bool {
        self.receiving
    }

    /// Feed one received bit. Returns the complete frame's bits once the
    /// whole declared length has arrived.
    pub fn push(&mut self, bit: Bit, own_mac: Option<MacAddr>) -> Option<Vec<Bit>> {
        self.buf.push(bit);

        if self.receiving {
            let have = self.buf.len() - self.start;
            if have == FRAME_HEADER_BITS {
                let data_bytes = bits::to_int(&self.buf[self.start + 32..self.start + 40]) as usize;
                let check_bytes =
                    bits::to_int(&self.buf[self.start + 40..self.start + 48]) as usize;
                self.total = Some(FRAME_HEADER_BITS + 8 * (data_bytes + check_bytes));
            }
            if self.total == Some(self.buf.len() - self.start) {
                let frame = self.buf[self.start..].to_vec();
                self.reset();
                return Some(frame);
            }
            return None;
        }

        if self.buf.len() >= 16 {
            let tail = MacAddr::from_bits(&self.buf[self.buf.len() - 16..]);
            let matches = match (tail, own_mac) {
                (Some(mac), Some(own)) => mac == own || mac.is_broadcast(),
                (Some(mac), None) => mac.is_broadcast(),
                _ => false,
            };
            if matches {
                self.receiving = true;
                self.start = self.buf.len() - 16;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsim_protocol::{CheckAlgorithm, Frame};

    fn feed(assembler: &mut FrameAssembler, stream: &[Bit], mac: MacAddr) -> Option<Vec<Bit>> {
        let mut out = None;
        for &bit in stream {
            if let Some(frame) = assembler.push(bit, Some(mac)) {
                assert!(out.is_none(), "two frames out of one stream");
                out = Some(frame);
            }
        }
        out
    }

    #[test]
    fn assembles_a_frame_addressed_to_us() {
        let mac = MacAddr(0x000B);
        let frame = Frame::build(
            mac,
            MacAddr(0x000A),
            &bits::from_hex("AB").unwrap(),
            &CheckAlgorithm::SimpleHash,
        );

        let mut assembler = FrameAssembler::new();
        let got = feed(&mut assembler, frame.bits(), mac).expect("frame should complete");
        assert_eq!(got, frame.bits());
        assert!(!assembler.is_receiving());
    }

    #[test]
    fn ignores_frames_for_other_destinations() {
        let frame = Frame::build(
            MacAddr(0x000C),
            MacAddr(0x000A),
            &bits::from_hex("AB").unwrap(),
            &CheckAlgorithm::SimpleHash,
        );

        let mut assembler = FrameAssembler::new();
        assert!(feed(&mut assembler, frame.bits(), MacAddr(0x000B)).is_none());
    }

    #[test]
    fn broadcast_frames_complete_without_an_assigned_mac() {
        let frame = Frame::build(
            MacAddr::BROADCAST,
            MacAddr(0x000A),
            &bits::from_hex("AB").unwrap(),
            &CheckAlgorithm::SimpleHash,
        );

        let mut assembler = FrameAssembler::new();
        let mut got = None;
        for &bit in frame.bits() {
            if let Some(out) = assembler.push(bit, None) {
                got = Some(out);
            }
        }
        assert_eq!(got.as_deref(), Some(frame.bits()));
    }

    #[test]
    fn reset_discards_a_partial_frame() {
        let mac = MacAddr(0x000B);
        let frame = Frame::build(
            mac,
            MacAddr(0x000A),
            &bits::from_hex("ABCD").unwrap(),
            &CheckAlgorithm::SimpleHash,
        );

        let mut assembler = FrameAssembler::new();
        for &bit in &frame.bits()[..60] {
            assert!(assembler.push(bit, Some(mac)).is_none());
        }
        assert!(assembler.is_receiving());

        assembler.reset();
        assert!(!assembler.is_receiving());

        // The rest of the old frame no longer completes anything.
        assert!(feed(&mut assembler, &frame.bits()[60..], mac).is_none());
    }

    #[test]
    fn back_to_back_frames_both_complete() {
        let mac = MacAddr(0x000B);
        let first = Frame::build(
            mac,
            MacAddr(0x000A),
            &bits::from_hex("AB").unwrap(),
            &CheckAlgorithm::SimpleHash,
        );
        let second = Frame::build(
            mac,
            MacAddr(0x000C),
            &bits::from_hex("CD").unwrap(),
            &CheckAlgorithm::SimpleHash,
        );

        let mut assembler = FrameAssembler::new();
        let mut frames = Vec::new();
        for &bit in first.bits().iter().chain(second.bits()) {
            if let Some(frame) = assembler.push(bit, Some(mac)) {
                frames.push(frame);
            }
        }
        assert_eq!(frames, vec![first.bits().to_vec(), second.bits().to_vec()]);
    }
}
