//! Panic hook integration
//!
//! Panics are the process's uncaught fatal errors. `install` makes the guard
//! the process-wide receiver; only one guard may ever be installed.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::{self, PanicHookInfo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crashguard_core::{FailureEscalationGuard, FatalError, ThreadContext};

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Errors from installing the panic hook
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    #[error("A crashguard panic hook is already installed")]
    AlreadyInstalled,
}

/// Register `guard` as the receiver of every panic in the process
///
/// The previously registered hook is replaced. It cannot be invoked after
/// the panicking call returns, so hosts that need the standard report on
/// fallback should use [`PanicReportHandler`](crate::fallback::PanicReportHandler)
/// as the guard's original handler.
pub fn install(guard: Arc<FailureEscalationGuard>) -> Result<(), InstallError> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Err(InstallError::AlreadyInstalled);
    }

    drop(panic::take_hook());
    log::debug!("Replaced the previously registered panic hook");
    panic::set_hook(Box::new(move |info| {
        guard.on_fatal_error(fatal_error_from_panic(info));
    }));

    log::debug!("Installed crashguard panic hook");
    Ok(())
}

/// Whether a guard has been installed in this process
pub fn is_installed() -> bool {
    INSTALLED.load(Ordering::SeqCst)
}

/// Snapshot a panic into an owned fatal error
pub fn fatal_error_from_panic(info: &PanicHookInfo<'_>) -> FatalError {
    let payload = info.payload();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());

    let mut error = FatalError::on_thread(message, ThreadContext::current());
    if let Some(location) = info.location() {
        error = error.with_location(location.to_string());
    }

    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        error = error.with_backtrace(backtrace.to_string());
    }

    error
}
