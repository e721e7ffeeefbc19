//! Demo recovery surface
//!
//! Stands in for a host UI: when asked to show, it "opens" the recovery view
//! on its own thread after a delay and reports the lifecycle transitions.

use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

use crashguard_app::{LifecycleWatcher, ViewLifecycleListener};
use crashguard_core::{FatalError, RecoveryError, RecoveryTrigger};

use crate::cli::Scenario;

pub struct DemoSurface {
    scenario: Scenario,
    delay: Duration,
    watcher: OnceLock<Arc<LifecycleWatcher>>,
}

impl DemoSurface {
    pub fn new(scenario: Scenario, delay: Duration) -> Self {
        Self {
            scenario,
            delay,
            watcher: OnceLock::new(),
        }
    }

    /// Connect the lifecycle watcher that receives this surface's views
    pub fn attach(&self, watcher: Arc<LifecycleWatcher>) {
        if self.watcher.set(watcher).is_err() {
            log::warn!("Demo surface already has a lifecycle watcher");
        }
    }
}

impl RecoveryTrigger for DemoSurface {
    fn show(&self, error: &FatalError) -> Result<(), RecoveryError> {
        match self.scenario {
            Scenario::Broken => Err(RecoveryError::Failed("demo surface is broken".into())),
            Scenario::Hang => {
                log::info!("Recovery surface requested; it will not appear");
                Ok(())
            }
            Scenario::Recover => {
                let watcher = self.watcher.get().cloned().ok_or(RecoveryError::Unavailable)?;
                let delay = self.delay;
                let message = error.to_string();

                thread::Builder::new()
                    .name("demo-ui".into())
                    .spawn(move || {
                        thread::sleep(delay);
                        watcher.on_view_paused("main");
                        watcher.on_view_created(watcher.recovery_view());
                        watcher.on_view_started(watcher.recovery_view());
                        println!("[recovery] {}", message);
                    })
                    .map_err(|e| RecoveryError::Failed(e.to_string()))?;
                Ok(())
            }
        }
    }
}
