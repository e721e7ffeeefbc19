//! View lifecycle wiring
//!
//! Hosts report every view transition; only the creation of the recovery
//! view counts as the recovery surface becoming active.

use std::sync::Arc;

use crashguard_core::FailureEscalationGuard;

/// Receives view lifecycle transitions from the host UI
pub trait ViewLifecycleListener: Send + Sync {
    fn on_view_created(&self, _view: &str) {}

    fn on_view_started(&self, _view: &str) {}

    fn on_view_resumed(&self, _view: &str) {}

    fn on_view_paused(&self, _view: &str) {}

    fn on_view_stopped(&self, _view: &str) {}

    fn on_view_destroyed(&self, _view: &str) {}
}

/// Forwards recovery-view creation to the guard
pub struct LifecycleWatcher {
    guard: Arc<FailureEscalationGuard>,
    recovery_view: String,
}

impl LifecycleWatcher {
    /// Watch for the recovery view named in the guard's config
    pub fn new(guard: Arc<FailureEscalationGuard>) -> Self {
        let recovery_view = guard.config().recovery_view.clone();
        Self { guard, recovery_view }
    }

    /// Watch for a specific recovery view
    pub fn with_recovery_view(
        guard: Arc<FailureEscalationGuard>,
        recovery_view: impl Into<String>,
    ) -> Self {
        Self {
            guard,
            recovery_view: recovery_view.into(),
        }
    }

    pub fn recovery_view(&self) -> &str {
        &self.recovery_view
    }
}

impl ViewLifecycleListener for LifecycleWatcher {
    fn on_view_created(&self, view: &str) {
        if view == self.recovery_view {
            self.guard.on_recovery_surface_activated();
        }
    }
}
