//! Deadline timer driven by a virtual clock

use std::time::Duration;

use parking_lot::Mutex;

use super::schedule::Schedule;
use super::{DeadlineTimer, TimerCallback, TimerDeadline, TimerKey, TimerKeyAllocator};
use crate::error::TimerError;

struct ManualState {
    now: Duration,
    schedule: Schedule<Duration>,
}

/// Deadline timer whose clock only moves when told to
///
/// Callbacks run on the thread calling [`advance`](Self::advance) or
/// [`fire_all`](Self::fire_all), after the internal lock is released, so a
/// callback may arm or cancel on the same timer.
pub struct ManualDeadlineTimer {
    state: Mutex<ManualState>,
    keys: TimerKeyAllocator,
}

impl ManualDeadlineTimer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: Duration::ZERO,
                schedule: Schedule::new(),
            }),
            keys: TimerKeyAllocator::new(),
        }
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of deadlines still pending
    pub fn armed_count(&self) -> usize {
        self.state.lock().schedule.len()
    }

    /// Move the clock forward and run everything that became due
    ///
    /// Returns the number of callbacks run.
    pub fn advance(&self, by: Duration) -> usize {
        let now = {
            let mut state = self.state.lock();
            state.now += by;
            state.now
        };

        let mut fired = 0;
        // Claim one entry at a time so a callback that cancels a later
        // deadline is honored.
        loop {
            let next = self.state.lock().schedule.pop_due(now);
            match next {
                Some((_, callback)) => {
                    callback();
                    fired += 1;
                }
                None => return fired,
            }
        }
    }

    /// Run every pending callback regardless of its deadline
    pub fn fire_all(&self) -> usize {
        let due = self.state.lock().schedule.drain();
        let fired = due.len();
        for (_, callback) in due {
            callback();
        }
        fired
    }
}

impl Default for ManualDeadlineTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadlineTimer for ManualDeadlineTimer {
    fn arm(
        &self,
        deadline: TimerDeadline,
        callback: TimerCallback,
    ) -> Result<TimerKey, TimerError> {
        let key = self.keys.allocate();
        let mut state = self.state.lock();
        let due = state.now + deadline.as_duration();
        state.schedule.insert(key, due, callback);
        Ok(key)
    }

    fn cancel(&self, key: TimerKey) -> bool {
        self.state.lock().schedule.cancel(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, TimerCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let callback: TimerCallback = Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[test]
    fn test_advance_fires_due_only() {
        let timer = ManualDeadlineTimer::new();
        let (count, callback) = counter();
        timer.arm(Duration::from_millis(2000).into(), callback).unwrap();

        assert_eq!(timer.advance(Duration::from_millis(1999)), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(timer.advance(Duration::from_millis(1)), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(timer.advance(Duration::from_secs(10)), 0);
        assert_eq!(timer.armed_count(), 0);
    }

    #[test]
    fn test_cancelled_never_fires() {
        let timer = ManualDeadlineTimer::new();
        let (count, callback) = counter();
        let key = timer.arm(Duration::from_millis(10).into(), callback).unwrap();

        assert!(timer.cancel(key));
        assert!(!timer.cancel(key));
        assert_eq!(timer.fire_all(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_deadline_relative_to_virtual_now() {
        let timer = ManualDeadlineTimer::new();
        timer.advance(Duration::from_secs(5));
        let (count, callback) = counter();
        timer.arm(Duration::from_secs(1).into(), callback).unwrap();

        assert_eq!(timer.now(), Duration::from_secs(5));
        assert_eq!(timer.advance(Duration::from_millis(999)), 0);
        assert_eq!(timer.advance(Duration::from_millis(1)), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
