//! Deadline timer backed by a dedicated worker thread
//!
//! The worker is started eagerly by [`ThreadDeadlineTimer::new`] so that no
//! thread has to be spawned while the process is handling a fault.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::schedule::Schedule;
use super::{DeadlineTimer, TimerCallback, TimerDeadline, TimerKey, TimerKeyAllocator};
use crate::error::TimerError;

const WORKER_NAME: &str = "crashguard-timer";

struct TimerState {
    schedule: Schedule<Instant>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<TimerState>,
    wakeup: Condvar,
    keys: TimerKeyAllocator,
}

/// Deadline timer running callbacks on its own thread
pub struct ThreadDeadlineTimer {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadDeadlineTimer {
    /// Start the worker thread
    pub fn new() -> Result<Self, TimerError> {
        let shared = Arc::new(Shared {
            state: Mutex::new(TimerState {
                schedule: Schedule::new(),
                shutdown: false,
            }),
            wakeup: Condvar::new(),
            keys: TimerKeyAllocator::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(WORKER_NAME.into())
            .spawn(move || run_worker(&worker_shared))
            .map_err(|e| TimerError::Spawn(e.to_string()))?;

        log::trace!("Started {} worker", WORKER_NAME);

        Ok(Self {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Number of deadlines still pending
    pub fn pending(&self) -> usize {
        self.shared.state.lock().schedule.len()
    }

    /// Stop the worker; pending callbacks are dropped without running
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.schedule.drain();
        }
        self.shared.wakeup.notify_all();

        if let Some(worker) = self.worker.lock().take() {
            // A callback may drop the last reference to this timer from the
            // worker itself; joining there would deadlock.
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

impl DeadlineTimer for ThreadDeadlineTimer {
    fn arm(
        &self,
        deadline: TimerDeadline,
        callback: TimerCallback,
    ) -> Result<TimerKey, TimerError> {
        let due = Instant::now() + deadline.as_duration();
        let key = self.shared.keys.allocate();
        {
            let mut state = self.shared.state.lock();
            if state.shutdown {
                return Err(TimerError::Closed);
            }
            state.schedule.insert(key, due, callback);
        }
        self.shared.wakeup.notify_one();
        log::trace!("Armed deadline {:?} in {:?}", key, deadline.as_duration());
        Ok(key)
    }

    fn cancel(&self, key: TimerKey) -> bool {
        let cancelled = self.shared.state.lock().schedule.cancel(key);
        if cancelled {
            self.shared.wakeup.notify_one();
            log::trace!("Cancelled deadline {:?}", key);
        }
        cancelled
    }
}

impl Drop for ThreadDeadlineTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(shared: &Shared) {
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            return;
        }

        match state.schedule.next_due() {
            None => {
                shared.wakeup.wait(&mut state);
            }
            Some(due) if due > Instant::now() => {
                shared.wakeup.wait_until(&mut state, due);
            }
            Some(_) => {
                if let Some((key, callback)) = state.schedule.pop_due(Instant::now()) {
                    log::trace!("Deadline {:?} expired", key);
                    MutexGuard::unlocked(&mut state, || run_callback(key, callback));
                }
            }
        }
    }
}

/// Run a callback without letting its panic take the worker down
fn run_callback(key: TimerKey, callback: TimerCallback) {
    if panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
        log::warn!("Callback for deadline {:?} panicked", key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_fires_once_after_deadline() {
        let timer = ThreadDeadlineTimer::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let start = Instant::now();

        timer
            .arm(
                Duration::from_millis(30).into(),
                Box::new(move || tx.send(Instant::now()).unwrap()),
            )
            .unwrap();

        let fired_at = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(fired_at.duration_since(start) >= Duration::from_millis(30));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn test_cancel_prevents_callback() {
        let timer = ThreadDeadlineTimer::new().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);

        let key = timer
            .arm(
                Duration::from_millis(50).into(),
                Box::new(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert!(timer.cancel(key));
        assert!(!timer.cancel(key));
        thread::sleep(Duration::from_millis(150));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_after_fire_returns_false() {
        let timer = ThreadDeadlineTimer::new().unwrap();
        let (tx, rx) = mpsc::channel();

        let key = timer
            .arm(Duration::from_millis(1).into(), Box::new(move || tx.send(()).unwrap()))
            .unwrap();

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!timer.cancel(key));
    }

    #[test]
    fn test_earlier_deadline_fires_first() {
        let timer = ThreadDeadlineTimer::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let tx2 = tx.clone();

        timer
            .arm(Duration::from_millis(80).into(), Box::new(move || tx.send("late").unwrap()))
            .unwrap();
        timer
            .arm(Duration::from_millis(10).into(), Box::new(move || tx2.send("early").unwrap()))
            .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "early");
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "late");
    }

    #[test]
    fn test_worker_survives_panicking_callback() {
        let timer = ThreadDeadlineTimer::new().unwrap();
        let (tx, rx) = mpsc::channel();

        timer
            .arm(Duration::from_millis(1).into(), Box::new(|| panic!("callback failed")))
            .unwrap();
        timer
            .arm(Duration::from_millis(20).into(), Box::new(move || tx.send(()).unwrap()))
            .unwrap();

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(timer.pending(), 0);

        let (tx, rx) = mpsc::channel();
        timer
            .arm(Duration::from_millis(1).into(), Box::new(move || tx.send(()).unwrap()))
            .unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_arm_after_shutdown_fails() {
        let timer = ThreadDeadlineTimer::new().unwrap();
        timer.shutdown();
        let result = timer.arm(Duration::from_millis(1).into(), Box::new(|| {}));
        assert_eq!(result, Err(TimerError::Closed));
    }
}
