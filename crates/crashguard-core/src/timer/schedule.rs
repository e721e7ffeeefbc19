//! Deadline table shared by the thread and manual timers

use std::collections::{BTreeMap, HashMap};

use super::{TimerCallback, TimerKey};

/// Pending callbacks ordered by due time
///
/// `T` is the clock's time point (`Instant` for real time, `Duration` for
/// a virtual clock). Removing an entry, either by `cancel` or `pop_due`, is
/// the single claim point: whoever removes it owns the callback.
pub(crate) struct Schedule<T: Ord + Copy> {
    queue: BTreeMap<(T, TimerKey), TimerCallback>,
    index: HashMap<TimerKey, T>,
}

impl<T: Ord + Copy> Schedule<T> {
    pub fn new() -> Self {
        Self {
            queue: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: TimerKey, due: T, callback: TimerCallback) {
        self.index.insert(key, due);
        self.queue.insert((due, key), callback);
    }

    /// Remove an entry, returning `true` if it was still pending
    pub fn cancel(&mut self, key: TimerKey) -> bool {
        match self.index.remove(&key) {
            Some(due) => self.queue.remove(&(due, key)).is_some(),
            None => false,
        }
    }

    /// Earliest due time, if anything is pending
    pub fn next_due(&self) -> Option<T> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    /// Claim the earliest entry if it is due at `now`
    pub fn pop_due(&mut self, now: T) -> Option<(TimerKey, TimerCallback)> {
        let (due, key) = *self.queue.keys().next()?;
        if due > now {
            return None;
        }
        let callback = self.queue.remove(&(due, key))?;
        self.index.remove(&key);
        Some((key, callback))
    }

    /// Claim every pending entry in due order
    pub fn drain(&mut self) -> Vec<(TimerKey, TimerCallback)> {
        self.index.clear();
        std::mem::take(&mut self.queue)
            .into_iter()
            .map(|((_, key), callback)| (key, callback))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerKeyAllocator;

    fn noop() -> TimerCallback {
        Box::new(|| {})
    }

    #[test]
    fn test_pop_due_in_order() {
        let keys = TimerKeyAllocator::new();
        let mut schedule = Schedule::new();
        let late = keys.allocate();
        let early = keys.allocate();
        schedule.insert(late, 20u64, noop());
        schedule.insert(early, 10u64, noop());

        assert_eq!(schedule.next_due(), Some(10));
        assert!(schedule.pop_due(5).is_none());
        assert_eq!(schedule.pop_due(15).map(|(k, _)| k), Some(early));
        assert!(schedule.pop_due(15).is_none());
        assert_eq!(schedule.pop_due(20).map(|(k, _)| k), Some(late));
        assert_eq!(schedule.len(), 0);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let keys = TimerKeyAllocator::new();
        let mut schedule = Schedule::new();
        let key = keys.allocate();
        schedule.insert(key, 1u64, noop());

        assert!(schedule.cancel(key));
        assert!(!schedule.cancel(key));
        assert!(schedule.pop_due(100).is_none());
    }
}
