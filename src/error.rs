//! Typed error hierarchy.
//!
//! Every fallible path in the library returns this enum (or an [`anyhow::Error`]
//! wrapping it once the binary boundary is crossed). Nothing below the farmer
//! boundary panics on bad input; a worker failure is folded into a typed result
//! instead of unwinding.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the solver library.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Bad argument count, unrecognized target, or a file that does not exist.
    #[error("argument error: {0}")]
    Argument(String),

    /// The input file could not be opened or a read failed mid-stream.
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An accelerator worker could not be set up (device compile / alloc failure).
    #[error("accelerator \"{device}\" unavailable: {reason}")]
    AcceleratorUnavailable { device: String, reason: String },

    /// A chi-square stage produced a non-recoverable degenerate probability.
    #[error("numeric degeneracy in chi-square pipeline: {0}")]
    NumericDegeneracy(String),

    /// Pass 1 found zero valid values in the input file.
    #[error("dataset is empty: no valid (Normal or Zero) IEEE values in file")]
    EmptyDataset,
}

pub type Result<T> = std::result::Result<T, SolverError>;
