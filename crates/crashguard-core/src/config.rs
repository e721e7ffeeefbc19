//! Guard configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Grace period used when nothing else is configured
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(2000);

/// View identifier the host uses for the recovery surface by default
pub const DEFAULT_RECOVERY_VIEW: &str = "recovery";

/// Settings fixed for the lifetime of a guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// How long the recovery surface has to become active (milliseconds)
    pub grace_period_ms: u64,
    /// View identifier that counts as the recovery surface
    pub recovery_view: String,
    /// Exit code used when falling back without an original handler
    pub fallback_exit_code: i32,
}

impl GuardConfig {
    /// Grace period as a `Duration`
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Same config with a different grace period
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period_ms = grace_period.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: DEFAULT_GRACE_PERIOD.as_millis() as u64,
            recovery_view: DEFAULT_RECOVERY_VIEW.into(),
            fallback_exit_code: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();
        assert_eq!(config.grace_period(), Duration::from_secs(2));
        assert_eq!(config.recovery_view, "recovery");
        assert_eq!(config.fallback_exit_code, 0);
    }

    #[test]
    fn test_with_grace_period() {
        let config = GuardConfig::default().with_grace_period(Duration::from_millis(250));
        assert_eq!(config.grace_period_ms, 250);
        assert_eq!(config.grace_period(), Duration::from_millis(250));
    }
}
