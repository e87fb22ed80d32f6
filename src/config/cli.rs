//! CLI argument parsing using `clap`.
//!
//! Mirrors the original tool's positional-and-keyword invocation:
//! `program FILE TARGET [TARGET ...]`.

use clap::Parser;
use std::path::PathBuf;

/// Classifies a binary dataset of doubles against uniform / normal /
/// exponential / Poisson via a chi-square goodness-of-fit test.
#[derive(Parser, Debug)]
#[command(name = "pprsolver")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the input file: packed little-endian IEEE-754 doubles.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// TARGET: `ALL`, `SMP`, or one or more accelerator device names.
    ///
    /// `ALL` dispatches across every discovered accelerator plus the CPU
    /// pool; `SMP` restricts dispatch to the CPU pool; naming specific
    /// devices selects an accelerator-only policy limited to those devices.
    /// A single quoted argument containing whitespace is split into
    /// multiple device names.
    #[arg(value_name = "TARGET", required = true, num_args = 1..)]
    pub targets: Vec<String>,

    /// Number of values read per `InputStream` batch.
    #[arg(long, default_value_t = 100_000)]
    pub batch_size: usize,

    /// Emit the report as JSON instead of (in addition to) text.
    #[arg(long)]
    pub json: bool,

    /// Raise the tracing log filter to `debug` (overridden by `RUST_LOG`).
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses `std::env::args()`, exiting the process on a usage error,
    /// `clap`'s normal behavior, kept here so `main` stays a thin shell.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
