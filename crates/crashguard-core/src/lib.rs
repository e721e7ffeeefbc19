//! crashguard-core: Fatal-error escalation for crashguard
//!
//! This crate provides the pieces that decide what happens after a fatal
//! error:
//! - One-shot deadline timers (thread, Tokio and manual clocks)
//! - The escalation guard state machine
//! - Collaborator traits the host implements (recovery surface, original
//!   handler, process termination)

pub mod collaborators;
pub mod config;
pub mod error;
pub mod fatal;
pub mod guard;
pub mod timer;

pub use collaborators::{FatalErrorHandler, ProcessTerminator, RecoveryTrigger};
pub use config::{GuardConfig, DEFAULT_GRACE_PERIOD};
pub use error::{RecoveryError, TimerError};
pub use fatal::{FatalError, ThreadContext};
pub use guard::{FailureEscalationGuard, GuardBuilder, GuardState, GuardStats};
pub use timer::{
    DeadlineTimer, ManualDeadlineTimer, ThreadDeadlineTimer, TimerDeadline, TimerKey,
    TokioDeadlineTimer,
};
