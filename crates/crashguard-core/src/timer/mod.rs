//! One-shot deadline timers
//!
//! The guard only needs three guarantees from a timer:
//! - each successful `arm` invokes its callback exactly once unless cancelled
//! - `cancel` is idempotent and never invokes the callback
//! - once a callback has been claimed for execution, `cancel` returns `false`
//!   and the callback still runs exactly once
//!
//! Implementations:
//! - [`ThreadDeadlineTimer`]: dedicated worker thread, no async runtime needed
//! - [`TokioDeadlineTimer`]: tasks on an existing Tokio runtime
//! - [`ManualDeadlineTimer`]: virtual clock driven by the caller (tests, embedding)

mod manual_timer;
mod schedule;
mod thread_timer;
mod tokio_timer;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::TimerError;

pub use manual_timer::ManualDeadlineTimer;
pub use thread_timer::ThreadDeadlineTimer;
pub use tokio_timer::TokioDeadlineTimer;

/// Callback run when a deadline expires
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Opaque handle to an armed deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerKey(u64);

impl TimerKey {
    /// Raw key value
    pub fn into_raw(self) -> u64 {
        self.0
    }
}

/// Hands out unique timer keys
#[derive(Debug)]
pub struct TimerKeyAllocator {
    next: AtomicU64,
}

impl TimerKeyAllocator {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn allocate(&self) -> TimerKey {
        TimerKey(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TimerKeyAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Relative deadline, measured from the moment of arming
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimerDeadline(Duration);

impl TimerDeadline {
    pub const fn from_duration(duration: Duration) -> Self {
        Self(duration)
    }

    pub const fn as_duration(self) -> Duration {
        self.0
    }
}

impl From<Duration> for TimerDeadline {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

/// A one-shot deadline timer
pub trait DeadlineTimer: Send + Sync {
    /// Schedule `callback` to run once after `deadline`
    ///
    /// Callbacks are never run inline from `arm`.
    fn arm(&self, deadline: TimerDeadline, callback: TimerCallback) -> Result<TimerKey, TimerError>;

    /// Cancel an armed deadline
    ///
    /// Returns `true` if the callback was prevented from running. Returns
    /// `false` for unknown keys, already-cancelled keys, and callbacks that
    /// have already been claimed by the firing path.
    fn cancel(&self, key: TimerKey) -> bool;
}
