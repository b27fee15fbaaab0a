//! A manually driven [`Scheduler`].
//!
//! [`ManualScheduler`] keeps its own clock, which only moves when
//! [`advance`](ManualScheduler::advance) is called.  Tests use it as a fake
//! clock; the command-line tool uses it to flush pending saves on exit.

use crate::traits::{CancelToken, Scheduler};
use std::cell::{Cell, RefCell};
use std::time::Duration;

struct Pending {
    token: CancelToken,
    due: Duration,
    task: Box<dyn FnOnce()>,
}

/// A single-threaded scheduler with a virtual clock.
#[derive(Default)]
pub struct ManualScheduler {
    now: Cell<Duration>,
    next_token: Cell<u64>,
    pending: RefCell<Vec<Pending>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Number of tasks waiting to run.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Move the clock forward by `by` and run every task that became due, in
    /// due order.  Tasks scheduled while running are eligible in the same
    /// call if their due time has passed.  Returns how many tasks ran.
    pub fn advance(&self, by: Duration) -> usize {
        self.now.set(self.now.get() + by);
        let mut ran = 0;
        while let Some(task) = self.take_next_due(self.now.get()) {
            task();
            ran += 1;
        }
        ran
    }

    /// Run everything still pending regardless of due time, advancing the
    /// clock to the last due time.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while let Some(due) = self.earliest_due() {
            if due > self.now.get() {
                self.now.set(due);
            }
            if let Some(task) = self.take_next_due(due) {
                task();
                ran += 1;
            }
        }
        ran
    }

    fn earliest_due(&self) -> Option<Duration> {
        self.pending.borrow().iter().map(|p| p.due).min()
    }

    /// Remove and return the earliest task due at or before `now`.  The
    /// borrow is released before the task runs so it can schedule more work.
    fn take_next_due(&self, now: Duration) -> Option<Box<dyn FnOnce()>> {
        let mut pending = self.pending.borrow_mut();
        let index = pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= now)
            .min_by_key(|(_, p)| (p.due, p.token.0))
            .map(|(i, _)| i)?;
        Some(pending.remove(index).task)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_after(&self, delay: Duration, task: Box<dyn FnOnce()>) -> CancelToken {
        let token = CancelToken(self.next_token.get());
        self.next_token.set(token.0 + 1);
        self.pending.borrow_mut().push(Pending {
            token,
            due: self.now.get() + delay,
            task,
        });
        token
    }

    fn cancel(&self, token: CancelToken) {
        self.pending.borrow_mut().retain(|p| p.token != token);
    }
}
