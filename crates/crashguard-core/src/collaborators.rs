//! Host-supplied collaborators
//!
//! The guard never renders UI or terminates the process itself; it calls
//! out through these traits.

use crate::error::RecoveryError;
use crate::fatal::FatalError;

/// Presents the in-process recovery surface
///
/// Best-effort: the guard arms its deadline whatever `show` returns.
pub trait RecoveryTrigger: Send + Sync {
    fn show(&self, error: &FatalError) -> Result<(), RecoveryError>;
}

/// A fatal-error receiver the guard can delegate to on fallback
///
/// Typically the receiver that was registered before the guard took over.
/// It may terminate the process.
pub trait FatalErrorHandler: Send + Sync {
    fn handle_fatal(&self, error: &FatalError);
}

impl<F> FatalErrorHandler for F
where
    F: Fn(&FatalError) + Send + Sync,
{
    fn handle_fatal(&self, error: &FatalError) {
        self(error)
    }
}

/// Unconditional process termination
///
/// Real implementations do not return. Test doubles may, in which case the
/// guard treats itself as terminated and ignores all further input.
pub trait ProcessTerminator: Send + Sync {
    fn terminate(&self, code: i32);
}

/// Trigger used when the host supplies none
pub(crate) struct NoRecoveryTrigger;

impl RecoveryTrigger for NoRecoveryTrigger {
    fn show(&self, _error: &FatalError) -> Result<(), RecoveryError> {
        Err(RecoveryError::Unavailable)
    }
}
