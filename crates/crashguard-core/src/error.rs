//! Error types shared by the guard and its collaborators

use thiserror::Error;

/// Errors from arming a deadline timer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("Timer has been shut down")]
    Closed,

    #[error("Failed to start timer worker: {0}")]
    Spawn(String),
}

/// Errors a recovery trigger may report back to the guard
///
/// These never propagate past the guard; they are logged and the
/// deadline is armed regardless.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecoveryError {
    #[error("Recovery surface is unavailable")]
    Unavailable,

    #[error("Failed to present recovery surface: {0}")]
    Failed(String),
}
