//! crashguard - Fatal-error watchdog demo host
//!
//! Installs the escalation guard as the panic hook, panics on a worker
//! thread, and lets the demo recovery surface either resolve the report or
//! leave it to the fallback handler.

mod cli;
mod demo;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crashguard_app::{
    load_config, load_config_from, logging, panic_hook, save_config, HardExit, LifecycleWatcher,
    PanicReportHandler,
};
use crashguard_core::{
    DeadlineTimer, FailureEscalationGuard, ProcessTerminator, ThreadDeadlineTimer,
    TokioDeadlineTimer,
};

use cli::{Cli, TimerBackend};
use demo::DemoSurface;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    logging::init(&cli.log_level);

    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    cli.apply_to(&mut config);

    if cli.write_config {
        let path = save_config(&config)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    // Keeps the runtime alive for the Tokio timer backend.
    let mut runtime = None;
    let timer: Arc<dyn DeadlineTimer> = match cli.timer {
        TimerBackend::Thread => Arc::new(ThreadDeadlineTimer::new()?),
        TimerBackend::Tokio => {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("crashguard-rt")
                .enable_time()
                .build()?;
            let timer = TokioDeadlineTimer::new(rt.handle().clone());
            runtime = Some(rt);
            Arc::new(timer)
        }
    };

    let surface_delay = Duration::from_millis(cli.surface_delay_ms);
    let surface = Arc::new(DemoSurface::new(cli.scenario, surface_delay));
    let terminator: Arc<dyn ProcessTerminator> = Arc::new(HardExit::Exit);

    let guard = FailureEscalationGuard::builder(timer, Arc::clone(&terminator))
        .recovery_trigger(&surface)
        .original_handler(Arc::new(PanicReportHandler::new(terminator)))
        .config(config.guard.clone())
        .build();

    surface.attach(Arc::new(LifecycleWatcher::new(Arc::clone(&guard))));
    panic_hook::install(Arc::clone(&guard))?;

    log::info!(
        "Guard installed with {:?} grace period, simulating a fatal error ({:?})",
        guard.grace_period(),
        cli.scenario
    );

    let worker = thread::Builder::new()
        .name("worker".into())
        .spawn(|| panic!("simulated fatal error"))?;
    let _ = worker.join();

    let wait = guard.grace_period() + surface_delay + Duration::from_millis(500);
    let started = Instant::now();
    while guard.is_reporting() && started.elapsed() < wait {
        thread::sleep(Duration::from_millis(10));
    }

    let stats = guard.stats();
    if stats.recovered > 0 {
        println!("Recovered from fatal error, process continues: {:?}", stats);
        drop(runtime);
        return Ok(());
    }

    // The fallback handler runs on the timer thread and ends the process.
    thread::sleep(Duration::from_secs(5));
    anyhow::bail!("fallback did not terminate the process: {:?}", stats)
}
