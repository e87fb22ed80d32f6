//! pprsolver - classifies a binary dataset of doubles against a fixed
//! family of probability distributions via a chi-square goodness-of-fit
//! test.
//!
//! # Architecture
//!
//! - **Two-pass streaming aggregation**: [`input`] + [`stats`] + [`interval`]
//!   compute min/max/validity in pass 1, then Welford mean/variance and
//!   histogram binning in pass 2, without ever materializing the dataset.
//! - **Heterogeneous dispatch**: [`worker`] abstracts one execution target
//!   (CPU pool or accelerator); [`farmer`] dispatches batches across
//!   whichever are available under the selected policy.
//! - **Chi-square evaluation**: [`chisquare`] turns the finished histogram
//!   into per-distribution test criteria and picks the winner, gated by
//!   [`distribution::DistributionClass`].
//! - [`pipeline`] orchestrates both passes end to end; [`report`] renders
//!   the result.

pub mod chisquare;
pub mod config;
pub mod distribution;
pub mod error;
pub mod farmer;
pub mod input;
pub mod interval;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod watchdog;
pub mod worker;

pub use error::{Result, SolverError};
