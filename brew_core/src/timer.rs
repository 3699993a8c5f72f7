use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Opaque ticket returned by [`TimerService::schedule`]. Ids grow
/// monotonically, so handles also encode schedule order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Single-threaded one-shot scheduler keyed on a monotonic session clock.
///
/// Payloads are plain values rather than closures; whoever drains the service
/// decides which machine receives each fired payload. Timers that share a due
/// time fire in the order they were scheduled.
#[derive(Debug, Clone)]
pub struct TimerService<T> {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<(Duration, u64), T>,
    due_by_id: HashMap<u64, Duration>,
}

impl<T> Default for TimerService<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerService<T> {
    pub fn new() -> Self {
        TimerService {
            now: Duration::ZERO,
            next_id: 1,
            pending: BTreeMap::new(),
            due_by_id: HashMap::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, delay: Duration, payload: T) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        let due = self.now.saturating_add(delay);
        self.pending.insert((due, id), payload);
        self.due_by_id.insert(id, due);
        TimerHandle(id)
    }

    /// Cancels the slot's previous timer (if any) and stores the new handle in
    /// its place.
    pub fn reschedule(
        &mut self,
        slot: &mut Option<TimerHandle>,
        delay: Duration,
        payload: T,
    ) -> TimerHandle {
        self.cancel_slot(slot);
        let handle = self.schedule(delay, payload);
        *slot = Some(handle);
        handle
    }

    /// Returns `true` when a pending timer was removed. Cancelling an unknown,
    /// fired, or already-cancelled handle is a no-op.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.due_by_id.remove(&handle.0) {
            Some(due) => self.pending.remove(&(due, handle.0)).is_some(),
            None => false,
        }
    }

    pub fn cancel_slot(&mut self, slot: &mut Option<TimerHandle>) -> bool {
        match slot.take() {
            Some(handle) => self.cancel(handle),
            None => false,
        }
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.due_by_id.contains_key(&handle.0)
    }

    /// Time left before `handle` fires, or `None` once it fired or was
    /// cancelled.
    pub fn remaining(&self, handle: TimerHandle) -> Option<Duration> {
        self.due_by_id
            .get(&handle.0)
            .map(|due| due.saturating_sub(self.now))
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(due, _)| *due)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pops the earliest timer due at or before `deadline`, moving the clock to
    /// its due time. Timers scheduled by the caller while handling the result
    /// are relative to that due time and are visible to the next call.
    pub fn pop_due(&mut self, deadline: Duration) -> Option<(TimerHandle, T)> {
        let key = *self.pending.keys().next()?;
        if key.0 > deadline {
            return None;
        }
        let payload = self.pending.remove(&key)?;
        self.due_by_id.remove(&key.1);
        if key.0 > self.now {
            self.now = key.0;
        }
        Some((TimerHandle(key.1), payload))
    }

    /// Moves the clock forward without firing anything. The clock never runs
    /// backwards.
    pub fn settle(&mut self, deadline: Duration) {
        if deadline > self.now {
            self.now = deadline;
        }
    }

    /// Drains everything due within `dt`. Payloads scheduled after this call
    /// returns are not included, even if they would fall inside the window.
    pub fn advance(&mut self, dt: Duration) -> Vec<(TimerHandle, T)> {
        let deadline = self.now + dt;
        let mut fired = Vec::new();
        while let Some(entry) = self.pop_due(deadline) {
            fired.push(entry);
        }
        self.settle(deadline);
        fired
    }

    /// Drops every pending timer; returns how many were discarded.
    pub fn clear(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        self.due_by_id.clear();
        count
    }
}
