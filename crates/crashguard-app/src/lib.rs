//! crashguard-app: Host integration for crashguard
//!
//! This crate connects the escalation guard to a running process:
//! - Panic hook as the fatal-error source
//! - View lifecycle watcher as the recovery activation source
//! - Standard panic report and hard exit as the fallback
//! - Configuration file and logger setup

pub mod config;
pub mod fallback;
pub mod lifecycle;
pub mod logging;
pub mod panic_hook;

pub use config::{load_config, load_config_from, save_config, Config, ConfigError};
pub use fallback::{HardExit, PanicReportHandler, PANIC_EXIT_CODE};
pub use lifecycle::{LifecycleWatcher, ViewLifecycleListener};
pub use panic_hook::InstallError;
