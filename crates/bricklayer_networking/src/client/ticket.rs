//! Completion handles for work handed to the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// How the dispatcher finished a piece of work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The server recorded the submission.
    Accepted,
    /// The server refused the submission.
    Conflict,
    /// No usable reply (unreachable, empty or undecodable).
    NetworkFailure,
    /// Never sent: stale against the current World, or shut down first.
    Dropped,
    /// Catch-up finished; carries the number of transactions applied.
    CaughtUp(usize),
}

impl Outcome {
    /// True for outcomes where the server did what was asked.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Accepted | Self::CaughtUp(_))
    }
}

/// One-shot slot the dispatcher fills in.
#[derive(Debug, Default)]
pub(crate) struct Completion {
    outcome: Mutex<Option<Outcome>>,
    condvar: Condvar,
}

impl Completion {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Records the outcome. Later calls are ignored.
    pub(crate) fn complete(&self, outcome: Outcome) {
        let mut slot = self.outcome.lock();
        if slot.is_none() {
            *slot = Some(outcome);
            self.condvar.notify_all();
        }
    }
}

/// Handle returned to the caller for tracking a submission or catch-up.
#[derive(Clone, Debug)]
pub struct Ticket {
    completion: Arc<Completion>,
}

impl Ticket {
    pub(crate) fn new(completion: Arc<Completion>) -> Self {
        Self { completion }
    }

    /// A ticket that is already finished.
    pub(crate) fn ready(outcome: Outcome) -> Self {
        let completion = Completion::new();
        completion.complete(outcome);
        Self { completion }
    }

    /// Blocks until the dispatcher reports an outcome.
    #[must_use]
    pub fn wait(&self) -> Outcome {
        let mut slot = self.completion.outcome.lock();
        loop {
            if let Some(outcome) = *slot {
                return outcome;
            }
            self.completion.condvar.wait(&mut slot);
        }
    }

    /// Waits up to `timeout`. Returns `None` if still pending.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Outcome> {
        let mut slot = self.completion.outcome.lock();
        if slot.is_none() {
            self.completion.condvar.wait_for(&mut slot, timeout);
        }
        *slot
    }

    /// Outcome if already known.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        *self.completion.outcome.lock()
    }

    /// Returns true if already completed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.outcome().is_some()
    }
}
