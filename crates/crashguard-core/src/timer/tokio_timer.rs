//! Deadline timer running on an existing Tokio runtime

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::{DeadlineTimer, TimerCallback, TimerDeadline, TimerKey, TimerKeyAllocator};
use crate::error::TimerError;

struct PendingTask {
    claimed: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

type PendingMap = Arc<Mutex<HashMap<TimerKey, PendingTask>>>;

/// Deadline timer spawning one sleep task per armed deadline
///
/// Each deadline carries a claim flag. The firing task and `cancel` race to
/// set it; only the winner acts, so a deadline is either cancelled or fired,
/// never both. Callbacks run on the blocking pool since they may not return
/// promptly (a fallback handler can terminate the process).
pub struct TokioDeadlineTimer {
    handle: Handle,
    keys: TimerKeyAllocator,
    pending: PendingMap,
}

impl TokioDeadlineTimer {
    /// Create a timer that spawns onto `handle`
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            keys: TimerKeyAllocator::new(),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a timer on the runtime the caller is running in
    pub fn current() -> Result<Self, TimerError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| TimerError::Spawn(e.to_string()))
    }

    /// Number of deadlines still pending
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

impl DeadlineTimer for TokioDeadlineTimer {
    fn arm(
        &self,
        deadline: TimerDeadline,
        callback: TimerCallback,
    ) -> Result<TimerKey, TimerError> {
        let key = self.keys.allocate();
        let claimed = Arc::new(AtomicBool::new(false));

        // Hold the map lock across spawn so the task cannot remove its entry
        // before it has been inserted.
        let mut pending = self.pending.lock();

        let task_claimed = Arc::clone(&claimed);
        let task_pending = Arc::clone(&self.pending);
        let duration = deadline.as_duration();
        let task = self.handle.spawn(async move {
            tokio::time::sleep(duration).await;
            if task_claimed.swap(true, Ordering::AcqRel) {
                return;
            }
            task_pending.lock().remove(&key);
            log::trace!("Deadline {:?} expired", key);
            if let Err(e) = tokio::task::spawn_blocking(callback).await {
                log::warn!("Deadline callback for {:?} failed: {}", key, e);
            }
        });

        pending.insert(key, PendingTask { claimed, task });
        Ok(key)
    }

    fn cancel(&self, key: TimerKey) -> bool {
        let Some(entry) = self.pending.lock().remove(&key) else {
            return false;
        };
        if entry.claimed.swap(true, Ordering::AcqRel) {
            return false;
        }
        entry.task.abort();
        log::trace!("Cancelled deadline {:?}", key);
        true
    }
}

impl Drop for TokioDeadlineTimer {
    fn drop(&mut self) {
        for (_, entry) in self.pending.lock().drain() {
            if !entry.claimed.swap(true, Ordering::AcqRel) {
                entry.task.abort();
            }
        }
    }
}
