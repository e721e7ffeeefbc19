//! CLI argument parsing for crashguard

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crashguard_app::Config;

/// What the demo recovery surface does when asked to appear
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scenario {
    /// Surface appears after the configured delay
    Recover,
    /// Surface is requested but never appears
    Hang,
    /// Surface fails to present
    Broken,
}

/// Timer implementation used for the grace period
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerBackend {
    Thread,
    Tokio,
}

/// crashguard - Fatal-error watchdog demo host
#[derive(Parser, Debug)]
#[command(name = "crashguard")]
#[command(about = "Simulates a fatal error and escalates it through the recovery guard")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Grace period in milliseconds, overriding the config file
    #[arg(long = "grace-ms")]
    pub grace_ms: Option<u64>,

    /// Behavior of the demo recovery surface
    #[arg(short = 's', long = "scenario", value_enum, default_value = "recover")]
    pub scenario: Scenario,

    /// How long the demo recovery surface takes to appear, in milliseconds
    #[arg(long = "surface-delay-ms", default_value = "200")]
    pub surface_delay_ms: u64,

    /// Timer backend
    #[arg(long = "timer", value_enum, default_value = "thread")]
    pub timer: TimerBackend,

    /// Log level
    #[arg(long = "log-level", default_value = "info")]
    pub log_level: String,

    /// Write the effective config to the default location and exit
    #[arg(long = "write-config")]
    pub write_config: bool,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Apply command-line overrides on top of the loaded config
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(grace_ms) = self.grace_ms {
            config.guard.grace_period_ms = grace_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cli = Cli::parse_from(["crashguard"]);
        assert!(cli.config.is_none());
        assert!(cli.grace_ms.is_none());
        assert_eq!(cli.scenario, Scenario::Recover);
        assert_eq!(cli.surface_delay_ms, 200);
        assert_eq!(cli.timer, TimerBackend::Thread);
        assert_eq!(cli.log_level, "info");
        assert!(!cli.write_config);
    }

    #[test]
    fn test_scenario_and_timer() {
        let cli = Cli::parse_from(["crashguard", "-s", "hang", "--timer", "tokio"]);
        assert_eq!(cli.scenario, Scenario::Hang);
        assert_eq!(cli.timer, TimerBackend::Tokio);
    }

    #[test]
    fn test_grace_override() {
        let cli = Cli::parse_from(["crashguard", "--grace-ms", "500"]);
        let mut config = Config::default();
        cli.apply_to(&mut config);
        assert_eq!(config.guard.grace_period_ms, 500);
    }

    #[test]
    fn test_no_override_keeps_config() {
        let cli = Cli::parse_from(["crashguard"]);
        let mut config = Config::default();
        config.guard.grace_period_ms = 1234;
        cli.apply_to(&mut config);
        assert_eq!(config.guard.grace_period_ms, 1234);
    }
}
