use std::path::Path;

use netsim_protocol::{CheckAlgorithm, UnknownAlgorithm};
use serde::Deserialize;
use thiserror::Error;

/// Validated simulation parameters, shared by every device.
#[derive(Debug, Clone, Copy)]
pub struct SimParams {
    /// Ticks each symbol is held on the wire.
    pub signal_time: u64,
    /// Check algorithm appended to every frame.
    pub check: CheckAlgorithm,
    /// Probability that a transmitted frame has one bit flipped.
    pub error_prob: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            signal_time: 10,
            check: CheckAlgorithm::SimpleHash,
            error_prob: 0.0,
        }
    }
}

/// On-disk configuration: a JSON mapping with the three keys below, each
/// optional. Unknown keys are a startup error.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct RawConfig {
    signal_time: u64,
    error_detection: String,
    error_prob: f64,
}

impl Default for RawConfig {
    fn default() -> Self {
        let params = SimParams::default();
        Self {
            signal_time: params.signal_time,
            error_detection: params.check.to_string(),
            error_prob: params.error_prob,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("signal_time must be a positive number of ticks")]
    InvalidSignalTime,

    #[error("error_prob must lie in [0, 1], got {0}")]
    InvalidErrorProb(f64),

    #[error(transparent)]
    UnknownAlgorithm(#[from] UnknownAlgorithm),
}

impl SimParams {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)?;
        if raw.signal_time == 0 {
            return Err(ConfigError::InvalidSignalTime);
        }
        if !(0.0..=1.0).contains(&raw.error_prob) {
            return Err(ConfigError::InvalidErrorProb(raw.error_prob));
        }
        Ok(Self {
            signal_time: raw.signal_time,
            check: raw.error_detection.parse()?,
            error_prob: raw.error_prob,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}
