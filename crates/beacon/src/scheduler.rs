//! Flush triggers.
//!
//! The scheduler decides, after each enqueue, whether the queue should be
//! flushed right away or an interval timer armed. It also owns the timer
//! handle, so at most one timer is pending per client.

use std::time::Duration;
use tokio::task::JoinHandle;

/// What the client should do after an enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trigger {
    /// Flush now.
    Flush,
    /// Arm a one-shot timer that flushes after the interval.
    ArmTimer(Duration),
    /// Nothing to do; a timer is already pending or none is configured.
    Wait,
}

#[derive(Debug)]
pub(crate) struct FlushScheduler {
    flush_at: usize,
    interval: Option<Duration>,
    flushed_once: bool,
    next_timer_id: u64,
    timer: Option<(u64, JoinHandle<()>)>,
}

impl FlushScheduler {
    pub(crate) fn new(flush_at: usize, interval: Option<Duration>) -> Self {
        Self {
            flush_at,
            interval,
            flushed_once: false,
            next_timer_id: 0,
            timer: None,
        }
    }

    /// Decide what to do now that the queue holds `queue_len` items.
    pub(crate) fn on_enqueue(&mut self, queue_len: usize) -> Trigger {
        if !self.flushed_once {
            self.flushed_once = true;
            return Trigger::Flush;
        }

        if queue_len >= self.flush_at {
            return Trigger::Flush;
        }

        match self.interval {
            Some(interval) if self.timer.is_none() => Trigger::ArmTimer(interval),
            _ => Trigger::Wait,
        }
    }

    /// Arm a timer. `spawn` receives the id the timer must pass to [`Self::fire`].
    ///
    /// No-op if a timer is already pending.
    pub(crate) fn arm(&mut self, spawn: impl FnOnce(u64) -> JoinHandle<()>) {
        if self.timer.is_some() {
            return;
        }
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        self.timer = Some((id, spawn(id)));
    }

    /// Called by the timer task when it wakes up. Returns whether it is
    /// still the pending timer and should flush.
    pub(crate) fn fire(&mut self, id: u64) -> bool {
        let pending = self.timer.as_ref().map(|(pending, _)| *pending);
        if pending != Some(id) {
            return false;
        }
        self.timer = None;
        true
    }

    /// Abort the pending timer, if any.
    pub(crate) fn cancel(&mut self) {
        if let Some((_, handle)) = self.timer.take() {
            handle.abort();
        }
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        self.timer.is_some()
    }
}
