//! The simulation driver: owns the devices and the wire board, executes
//! the instruction script tick by tick in the mandated phase order, and
//! writes the per-device transcripts when the run ends.

mod config;
mod error;
mod script;
mod simulation;
mod transcript;

pub use config::{ConfigError, SimParams};
pub use error::SimError;
pub use script::{parse_script, Instruction, Op, ScriptError};
pub use simulation::Simulation;
pub use transcript::write_transcripts;
