//! Fatal-error escalation guard
//!
//! The guard receives the process's fatal errors, asks the host to present
//! a recovery surface, and waits a fixed grace period for that surface to
//! become active. If it does not, the guard falls back to the original
//! fatal-error handler, or terminates the process when there is none.
//!
//! ```text
//!            on_fatal_error                 on_recovery_surface_activated
//!   Idle ─────────────────────▶ Awaiting ──────────────────────────────▶ Idle
//!    ▲                          Recovery
//!    │   deadline (handler)        │ deadline (no handler)
//!    └─────────────────────────────┤
//!                                  ▼
//!                              Terminated
//! ```
//!
//! All three entry points may race. State lives behind one mutex, and no
//! collaborator is ever called while it is held. Each report gets an epoch;
//! the deadline callback carries only that epoch and a weak reference to the
//! guard, and re-validates both before acting.

use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::collaborators::{
    FatalErrorHandler, NoRecoveryTrigger, ProcessTerminator, RecoveryTrigger,
};
use crate::config::GuardConfig;
use crate::fatal::FatalError;
use crate::timer::{DeadlineTimer, TimerCallback, TimerKey};

/// Observable guard phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// No fatal error in flight
    Idle,
    /// A fatal error was reported; waiting for the recovery surface
    AwaitingRecovery,
    /// Fallback terminated the process (only observable with a terminator
    /// that returns)
    Terminated,
}

/// Counters since the guard was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardStats {
    /// Fatal errors that started an escalation
    pub reported: u64,
    /// Fatal errors dropped because one was already in flight
    pub suppressed: u64,
    /// Escalations resolved by the recovery surface
    pub recovered: u64,
    /// Escalations handed to the original handler
    pub delegated: u64,
    /// Escalations that terminated the process
    pub terminated: u64,
    /// Recovery trigger calls that failed or panicked
    pub trigger_failures: u64,
    /// Activations with no pending report
    pub spurious_activations: u64,
}

struct PendingReport {
    epoch: u64,
    error: Arc<FatalError>,
    timer: Option<TimerKey>,
}

enum Phase {
    Idle,
    AwaitingRecovery(PendingReport),
    Terminated,
}

struct Inner {
    phase: Phase,
    last_epoch: u64,
    stats: GuardStats,
}

/// Builder for [`FailureEscalationGuard`]
pub struct GuardBuilder {
    timer: Arc<dyn DeadlineTimer>,
    terminator: Arc<dyn ProcessTerminator>,
    original_handler: Option<Arc<dyn FatalErrorHandler>>,
    trigger: Weak<dyn RecoveryTrigger>,
    config: GuardConfig,
}

impl GuardBuilder {
    pub fn new(timer: Arc<dyn DeadlineTimer>, terminator: Arc<dyn ProcessTerminator>) -> Self {
        let trigger: Weak<dyn RecoveryTrigger> = Weak::<NoRecoveryTrigger>::new();
        Self {
            timer,
            terminator,
            original_handler: None,
            trigger,
            config: GuardConfig::default(),
        }
    }

    /// Handler that was receiving fatal errors before the guard
    pub fn original_handler(mut self, handler: Arc<dyn FatalErrorHandler>) -> Self {
        self.original_handler = Some(handler);
        self
    }

    /// Host object that presents the recovery surface
    ///
    /// Only a weak reference is kept; once the host is dropped, reports skip
    /// the recovery surface and go straight to the deadline.
    pub fn recovery_trigger<T: RecoveryTrigger + 'static>(mut self, trigger: &Arc<T>) -> Self {
        let weak: Weak<T> = Arc::downgrade(trigger);
        self.trigger = weak;
        self
    }

    pub fn config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.config = self.config.with_grace_period(grace_period);
        self
    }

    pub fn build(self) -> Arc<FailureEscalationGuard> {
        Arc::new_cyclic(|this| FailureEscalationGuard {
            inner: Mutex::new(Inner {
                phase: Phase::Idle,
                last_epoch: 0,
                stats: GuardStats::default(),
            }),
            original_handler: self.original_handler,
            trigger: self.trigger,
            terminator: self.terminator,
            timer: self.timer,
            config: self.config,
            this: this.clone(),
        })
    }
}

/// Escalates fatal errors from soft recovery to the original handler
pub struct FailureEscalationGuard {
    inner: Mutex<Inner>,
    original_handler: Option<Arc<dyn FatalErrorHandler>>,
    trigger: Weak<dyn RecoveryTrigger>,
    terminator: Arc<dyn ProcessTerminator>,
    timer: Arc<dyn DeadlineTimer>,
    config: GuardConfig,
    this: Weak<FailureEscalationGuard>,
}

impl FailureEscalationGuard {
    pub fn builder(
        timer: Arc<dyn DeadlineTimer>,
        terminator: Arc<dyn ProcessTerminator>,
    ) -> GuardBuilder {
        GuardBuilder::new(timer, terminator)
    }

    /// Receive a fatal error
    ///
    /// Only the first error is escalated; anything delivered while a report
    /// is in flight is dropped.
    pub fn on_fatal_error(&self, error: FatalError) {
        let (epoch, error) = {
            let mut inner = self.inner.lock();
            match inner.phase {
                Phase::Idle => {}
                Phase::AwaitingRecovery(_) => {
                    inner.stats.suppressed += 1;
                    log::debug!("Fatal error already being handled, ignoring: {}", error);
                    return;
                }
                Phase::Terminated => return,
            }

            inner.last_epoch += 1;
            let epoch = inner.last_epoch;
            let error = Arc::new(error);
            inner.phase = Phase::AwaitingRecovery(PendingReport {
                epoch,
                error: Arc::clone(&error),
                timer: None,
            });
            inner.stats.reported += 1;
            (epoch, error)
        };

        log::error!("Trying to recover from fatal error: {}", error);
        self.show_recovery(&error);
        self.arm_deadline(epoch);
    }

    /// The recovery surface became the active view
    ///
    /// Ignored unless a report is in flight.
    pub fn on_recovery_surface_activated(&self) {
        let pending = {
            let mut inner = self.inner.lock();
            match mem::replace(&mut inner.phase, Phase::Idle) {
                Phase::AwaitingRecovery(pending) => {
                    inner.stats.recovered += 1;
                    pending
                }
                other => {
                    if matches!(other, Phase::Idle) {
                        inner.stats.spurious_activations += 1;
                    }
                    inner.phase = other;
                    log::trace!("Recovery surface activated with no pending report");
                    return;
                }
            }
        };

        if let Some(key) = pending.timer {
            self.timer.cancel(key);
        }
        log::info!("Recovery surface is active, fatal error handled: {}", pending.error);
    }

    fn on_deadline_exceeded(&self, epoch: u64) {
        let pending = {
            let mut inner = self.inner.lock();
            let pending = match mem::replace(&mut inner.phase, Phase::Idle) {
                Phase::AwaitingRecovery(pending) if pending.epoch == epoch => pending,
                other => {
                    inner.phase = other;
                    log::trace!("Deadline for report #{} is stale, ignoring", epoch);
                    return;
                }
            };
            if self.original_handler.is_some() {
                inner.stats.delegated += 1;
            } else {
                inner.stats.terminated += 1;
                inner.phase = Phase::Terminated;
            }
            pending
        };

        log::error!(
            "Recovery surface did not appear within {:?}, falling back",
            self.config.grace_period()
        );

        match &self.original_handler {
            Some(handler) => handler.handle_fatal(&pending.error),
            None => {
                log::error!("No original fatal error handler, terminating: {}", pending.error);
                self.terminator.terminate(self.config.fallback_exit_code);
            }
        }
    }

    fn show_recovery(&self, error: &FatalError) {
        let Some(trigger) = self.trigger.upgrade() else {
            log::debug!("Recovery host is gone, skipping recovery surface");
            return;
        };

        // Inside a panic hook a second panic aborts before reaching here.
        let failure = match panic::catch_unwind(AssertUnwindSafe(|| trigger.show(error))) {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(_) => "recovery trigger panicked".to_string(),
        };

        log::warn!("Failed to show recovery surface: {}", failure);
        self.inner.lock().stats.trigger_failures += 1;
    }

    fn arm_deadline(&self, epoch: u64) {
        let guard = self.this.clone();
        let callback: TimerCallback = Box::new(move || {
            if let Some(guard) = guard.upgrade() {
                guard.on_deadline_exceeded(epoch);
            }
        });

        let key = match self.timer.arm(self.config.grace_period().into(), callback) {
            Ok(key) => key,
            Err(e) => {
                log::warn!("Failed to arm recovery deadline ({}), falling back now", e);
                self.on_deadline_exceeded(epoch);
                return;
            }
        };

        let resolved = {
            let mut inner = self.inner.lock();
            match &mut inner.phase {
                Phase::AwaitingRecovery(pending) if pending.epoch == epoch => {
                    pending.timer = Some(key);
                    false
                }
                _ => true,
            }
        };

        // The surface became active while the trigger was still running.
        if resolved {
            self.timer.cancel(key);
        }
    }

    pub fn state(&self) -> GuardState {
        match self.inner.lock().phase {
            Phase::Idle => GuardState::Idle,
            Phase::AwaitingRecovery(_) => GuardState::AwaitingRecovery,
            Phase::Terminated => GuardState::Terminated,
        }
    }

    /// Whether a fatal error is currently in flight
    pub fn is_reporting(&self) -> bool {
        matches!(self.inner.lock().phase, Phase::AwaitingRecovery(_))
    }

    pub fn has_original_handler(&self) -> bool {
        self.original_handler.is_some()
    }

    pub fn grace_period(&self) -> Duration {
        self.config.grace_period()
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn stats(&self) -> GuardStats {
        self.inner.lock().stats
    }
}
