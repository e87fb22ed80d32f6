//! Run configuration.
//!
//! [`cli`] defines the `clap` argument surface; this module converts the parsed
//! arguments into an immutable [`RunConfig`] shared read-only across the run
//! behind an `Arc`.

pub mod cli;

use crate::error::{Result, SolverError};
use std::path::PathBuf;

/// How the farmer is allowed to dispatch batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// CPU worker pool only ("SMP" in the original tool's vocabulary).
    CpuOnly,
    /// Only the listed accelerator devices; never falls back to CPU.
    AcceleratorOnly,
    /// All discovered accelerators plus the CPU pool ("ALL").
    Both,
}

/// Immutable, fully-validated run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_file: PathBuf,
    pub policy: DispatchPolicy,
    pub accelerator_devices: Vec<String>,
    pub batch_size: usize,
    pub json_output: bool,
}

/// Devices the accelerator backend can actually provide, discovered once at
/// startup. A real accelerator backend would populate this from driver
/// enumeration; the in-process simulation backend used here reports a fixed,
/// small set so the CLI's device-selection path is exercised end to end.
pub fn discover_accelerator_devices() -> Vec<String> {
    crate::worker::accelerator::simulated_device_names()
}

impl RunConfig {
    /// Validates parsed CLI arguments and resolves the dispatch policy from
    /// the `TARGET` list, per the `ALL | SMP | device-name-list` convention.
    pub fn from_cli(cli: cli::Cli) -> Result<Self> {
        if !cli.file.is_file() {
            return Err(SolverError::Argument(format!(
                "file \"{}\" does not exist",
                cli.file.display()
            )));
        }

        if cli.targets.is_empty() {
            return Err(SolverError::Argument(
                "expected at least one TARGET: ALL, SMP, or an accelerator device name".into(),
            ));
        }

        let available = discover_accelerator_devices();

        // A single positional TARGET may itself be a whitespace-separated
        // list of device names passed as one quoted shell argument.
        let mut tokens: Vec<String> = Vec::new();
        for t in &cli.targets {
            if cli.targets.len() == 1 && t.split_whitespace().count() > 1 {
                tokens.extend(t.split_whitespace().map(str::to_owned));
            } else {
                tokens.push(t.clone());
            }
        }

        let policy;
        let mut accelerator_devices = Vec::new();

        if tokens.len() == 1 && tokens[0].eq_ignore_ascii_case("all") {
            policy = DispatchPolicy::Both;
            accelerator_devices = available.clone();
        } else if tokens.len() == 1 && tokens[0].eq_ignore_ascii_case("smp") {
            policy = DispatchPolicy::CpuOnly;
        } else {
            for name in &tokens {
                if !available.iter().any(|d| d == name) {
                    let list = if available.is_empty() {
                        "none".to_string()
                    } else {
                        available.join(", ")
                    };
                    return Err(SolverError::Argument(format!(
                        "device \"{name}\" is not a valid accelerator device. Available devices: {list}"
                    )));
                }
                accelerator_devices.push(name.clone());
            }
            policy = DispatchPolicy::AcceleratorOnly;
        }

        Ok(RunConfig {
            input_file: cli.file,
            policy,
            accelerator_devices,
            batch_size: cli.batch_size,
            json_output: cli.json,
        })
    }
}
