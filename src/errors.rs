//! Typed error surface for the handful of operations the engine can reject.
//!
//! Everything else — malformed settings, injector RPC failures, precedence
//! violations — is a documented silent fallback (see `policy` and `settings`)
//! and is logged via `tracing`, never returned as an `Err`.

use thiserror::Error;

/// Shared `Result` alias for fallible engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("bucket value {0} does not correspond to a defined standby bucket")]
    InvalidBucket(i32),

    #[error("user {0} is not among the currently running users")]
    UnknownUser(i32),

    #[error("snapshot version {found} is not supported (expected {expected})")]
    UnsupportedSnapshotVersion { found: u32, expected: u32 },
}
