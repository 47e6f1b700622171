use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use netsim_machine::{parse_script, SimParams, Simulation};

/// Bit-level LAN simulator: runs an instruction script and writes one
/// transcript file per simulated device.
#[derive(Debug, Parser)]
#[command(name = "netsim", version)]
struct Args {
    /// Instruction script, one `time verb args...` line per instruction.
    script: PathBuf,

    /// JSON configuration (signal_time, error_detection, error_prob).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the transcripts are written into.
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Seed for the simulation's random generator (back-off draws and
    /// injected bit errors). Equal seeds give identical runs.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let params = match &args.config {
        Some(path) => SimParams::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimParams::default(),
    };

    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("reading script {}", args.script.display()))?;
    let instructions = parse_script(&text)?;

    let mut sim = Simulation::new(params, args.seed);
    sim.load_script(instructions);
    sim.run().context("simulation aborted")?;

    netsim_machine::write_transcripts(&sim, &args.output)
        .with_context(|| format!("writing transcripts to {}", args.output.display()))?;
    Ok(())
}
