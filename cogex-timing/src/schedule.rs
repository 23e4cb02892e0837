//! Cancelable delayed events on top of a [`Clock`].
//!
//! Events are plain payloads rather than callbacks. Whoever drains the queue
//! decides what a fired payload means, which lets the payload carry the
//! identity of the trial it was armed for.

use std::collections::BTreeMap;

use time::OffsetDateTime;

use crate::timer::Clock;

/// Identifies one scheduled event. Ordered by due time, then by arming order.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle {
    due: u64,
    seq: u64,
}

impl TimerHandle {
    pub fn due(&self) -> u64 {
        self.due
    }
}

#[derive(Debug)]
pub struct Scheduler<C, E> {
    clock: C,
    pending: BTreeMap<TimerHandle, E>,
    next_seq: u64,
}

impl<C: Clock, E> Scheduler<C, E> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            pending: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn wall_time(&self, at_ms: u64) -> OffsetDateTime {
        self.clock.wall_time(at_ms)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn schedule(&mut self, delay_ms: u64, event: E) -> TimerHandle {
        let handle = TimerHandle {
            due: self.clock.now().saturating_add(delay_ms),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.pending.insert(handle, event);
        handle
    }

    /// Returns false if the event already fired or was canceled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.pending.remove(&handle).is_some()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.contains_key(&handle)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn next_due(&self) -> Option<u64> {
        self.pending.keys().next().map(TimerHandle::due)
    }

    /// Removes the earliest event due at or before `deadline` and moves the
    /// clock to its due time.
    pub fn pop_due(&mut self, deadline: u64) -> Option<E> {
        let handle = *self.pending.keys().next()?;
        if handle.due > deadline {
            return None;
        }
        let event = self.pending.remove(&handle)?;
        self.clock.advance_to(handle.due);
        Some(event)
    }

    /// Moves the clock forward. Events due before `at_ms` should be drained first.
    pub fn advance_to(&mut self, at_ms: u64) {
        self.clock.advance_to(at_ms);
    }
}
