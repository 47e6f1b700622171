use crate::bits::{self, Bit};
use crate::check::CheckAlgorithm;
use crate::mac::MacAddr;

/// Fixed frame header: dest MAC (16) | source MAC (16) | data size in
/// bytes (8) | check size in bytes (8).
pub const FRAME_HEADER_BITS: usize = 48;

/// A link-layer frame, stored as the exact bit sequence that travels on
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bits: Vec<Bit>,
}

impl Frame {
    /// Recognize a frame at the head of `stream`. Returns `None` while the
    /// stream is shorter than the header or than the length the header
    /// declares; extra trailing bits are ignored.
    pub fn parse(stream: &[Bit]) -> Option<Frame> {
        if stream.len() < FRAME_HEADER_BITS {
            return None;
        }
        let data_bytes = bits::to_int(&stream[32..40]) as usize;
        let check_bytes = bits::to_int(&stream[40..48]) as usize;
        let total = FRAME_HEADER_BITS + 8 * (data_bytes + check_bytes);
        if stream.len() < total {
            return None;
        }
        Some(Frame {
            bits: stream[..total].to_vec(),
        })
    }

    /// Assemble a frame around `payload`, computing the trailing check
    /// field with `check`. The payload is left-padded to a whole number of
    /// bytes.
    pub fn build(dest: MacAddr, src: MacAddr, payload: &[Bit], check: &CheckAlgorithm) -> Frame {
        let payload = bits::pad_left_to_byte(payload);
        let check_data = check.encode(&payload);

        let mut out = Vec::with_capacity(FRAME_HEADER_BITS + payload.len() + check_data.bits.len());
        out.extend(dest.bits());
        out.extend(src.bits());
        out.extend(bits::from_int((payload.len() / 8) as u64, 8));
        out.extend(check_data.size);
        out.extend(payload);
        out.extend(check_data.bits);
        Frame { bits: out }
    }

    pub fn dest(&self) -> MacAddr {
        MacAddr(bits::to_int(&self.bits[0..16]) as u16)
    }

    pub fn src(&self) -> MacAddr {
        MacAddr(bits::to_int(&self.bits[16..32]) as u16)
    }

    pub fn is_broadcast(&self) -> bool {
        self.dest().is_broadcast()
    }

    pub fn data_bytes(&self) -> usize {
        bits::to_int(&self.bits[32..40]) as usize
    }

    pub fn check_bytes(&self) -> usize {
        bits::to_int(&self.bits[40..48]) as usize
    }

    pub fn payload(&self) -> &[Bit] {
        &self.bits[FRAME_HEADER_BITS..FRAME_HEADER_BITS + 8 * self.data_bytes()]
    }

    pub fn check(&self) -> &[Bit] {
        &self.bits[FRAME_HEADER_BITS + 8 * self.data_bytes()..]
    }

    /// Whether the carried check field matches a recomputation over the
    /// carried payload.
    pub fn verify(&self, check: &CheckAlgorithm) -> bool {
        check.verify(self.payload(), self.check())
    }

    pub fn bits(&self) -> &[Bit] {
        &self.bits
    }

    pub fn into_bits(self) -> Vec<Bit> {
        self.bits
    }

    pub fn len_bits(&self) -> usize {
        self.bits.len()
    }
}
