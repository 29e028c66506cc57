//! Typed errors for the conditions that abort a run.
//!
//! Per-unit failures (a siever exiting non-zero, a temp file that will not go
//! away) never become errors; they are logged where they happen.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SieveError {
    /// The siever executable is not on `PATH`.
    #[error("lattice siever {name} could not be found, did you forget to update PATH?")]
    SieverNotFound { name: String },

    /// The factor-base preparation step exited non-zero (or was killed).
    #[error("factor base preparation `{program}` failed with {status}")]
    FactorBasePrep { program: String, status: String },

    /// A range that cannot be split as requested.
    #[error("invalid range [{start}, {end}): {reason}")]
    InvalidRange { start: u64, end: u64, reason: String },

    /// Worker budget of zero.
    #[error("worker count must be at least 1")]
    NoWorkers,

    /// Checkpoint file that exists but cannot be parsed.
    #[error("invalid checkpoint {path}: {reason}")]
    InvalidCheckpoint { path: PathBuf, reason: String },
}
