use std::fmt;
use std::str::FromStr;

use crate::bits::{self, Bit};

/// Error-detection algorithm appended to every frame as a trailing check
/// field. Selected by name in the configuration; unknown names are
/// rejected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckAlgorithm {
    /// Byte-padded binary representation of the arithmetic sum of the
    /// payload bits.
    SimpleHash,
    /// Classical Hamming parity bits over the payload plus one overall
    /// parity bit, padded to a byte boundary.
    Hamming,
}

/// Output of [`CheckAlgorithm::encode`]: the check-size header byte and
/// the check field itself, both as bit vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckData {
    /// Check field size in bytes, as 8 bits.
    pub size: Vec<Bit>,
    /// The check field, a whole number of bytes.
    pub bits: Vec<Bit>,
}

impl CheckAlgorithm {
    pub fn encode(&self, payload: &[Bit]) -> CheckData {
        let raw = match self {
            CheckAlgorithm::SimpleHash => simple_hash(payload),
            CheckAlgorithm::Hamming => hamming(payload),
        };
        let padded = bits::pad_left_to_byte(&raw);
        CheckData {
            size: bits::from_int((padded.len() / 8) as u64, 8),
            bits: padded,
        }
    }

    /// Recompute the check over `payload` and compare it against the
    /// check field carried by a frame.
    pub fn verify(&self, payload: &[Bit], check: &[Bit]) -> bool {
        self.encode(payload).bits == check
    }
}

fn simple_hash(payload: &[Bit]) -> Vec<Bit> {
    let sum: u64 = payload.iter().map(|&b| u64::from(b)).sum();
    // Width of the minimal binary rendering, never zero digits.
    let width = (64 - sum.leading_zeros()).max(1) as usize;
    bits::from_int(sum, width)
}

fn hamming(payload: &[Bit]) -> Vec<Bit> {
    let n = payload.len();
    let mut r = 0usize;
    while (1usize << r) < n + r + 1 {
        r += 1;
    }

    // Codeword positions 1..=n+r with data filling the non-power-of-two
    // slots in order. Parity bit i covers every position with bit i set.
    let total = n + r;
    let mut bit_at = vec![0u8; total + 1];
    let mut next = payload.iter();
    for pos in 1..=total {
        if !pos.is_power_of_two() {
            bit_at[pos] = *next.next().unwrap_or(&0);
        }
    }

    let mut out = Vec::with_capacity(r + 1);
    for i in 0..r {
        let mut parity = 0u8;
        for pos in 1..=total {
            if pos & (1 << i) != 0 && !pos.is_power_of_two() {
                parity ^= bit_at[pos];
            }
        }
        out.push(parity);
    }

    let overall = payload.iter().chain(out.iter()).fold(0u8, |acc, &b| acc ^ b);
    out.push(overall);
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAlgorithm(pub String);

impl fmt::Display for UnknownAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown error-detection algorithm {:?} (expected \"simple_hash\" or \"hamming\")",
            self.0
        )
    }
}

impl std::error::Error for UnknownAlgorithm {}

impl FromStr for CheckAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple_hash" => Ok(CheckAlgorithm::SimpleHash),
            "hamming" => Ok(CheckAlgorithm::Hamming),
            other => Err(UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for CheckAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CheckAlgorithm::SimpleHash => "simple_hash",
            CheckAlgorithm::Hamming => "hamming",
        })
    }
}
