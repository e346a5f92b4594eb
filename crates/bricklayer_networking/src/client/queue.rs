//! FIFO work queue between callers and the dispatcher.
//!
//! Submissions are served in enqueue order. Catch-up requests are coalesced:
//! every caller waiting for a catch-up is answered by the next single
//! round trip, which runs before the next queued submission.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bricklayer_core::Transaction;
use parking_lot::{Condvar, Mutex};

use super::ticket::{Completion, Outcome};

/// A transaction waiting to be sent.
pub(crate) struct SubmitJob {
    pub(crate) transaction: Transaction,
    pub(crate) completion: Arc<Completion>,
}

/// What the dispatcher should do next.
pub(crate) enum Work {
    Submit(SubmitJob),
    Catchup(Vec<Arc<Completion>>),
}

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<SubmitJob>,
    catchup: Vec<Arc<Completion>>,
    /// The dispatcher holds an item it has not finished yet.
    busy: bool,
}

impl QueueState {
    fn is_idle(&self) -> bool {
        self.jobs.is_empty() && self.catchup.is_empty() && !self.busy
    }
}

/// Mutex + condvar queue. Pushing never blocks on the dispatcher.
#[derive(Default)]
pub(crate) struct WorkQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    idle: Condvar,
}

impl WorkQueue {
    pub(crate) fn push(&self, job: SubmitJob) {
        let mut state = self.state.lock();
        state.jobs.push_back(job);
        self.not_empty.notify_one();
    }

    pub(crate) fn request_catchup(&self, completion: Arc<Completion>) {
        let mut state = self.state.lock();
        state.catchup.push(completion);
        self.not_empty.notify_one();
    }

    /// Takes the next item, waiting up to `timeout` for one to arrive.
    ///
    /// Marks the queue busy until [`finish`](Self::finish) is called.
    pub(crate) fn pop(&self, timeout: Duration) -> Option<Work> {
        let mut state = self.state.lock();
        if state.jobs.is_empty() && state.catchup.is_empty() {
            self.not_empty.wait_for(&mut state, timeout);
        }

        let work = if state.catchup.is_empty() {
            state.jobs.pop_front().map(Work::Submit)
        } else {
            Some(Work::Catchup(std::mem::take(&mut state.catchup)))
        };
        state.busy = work.is_some();
        work
    }

    /// Marks the current item done and wakes idle waiters if nothing is left.
    pub(crate) fn finish(&self) {
        let mut state = self.state.lock();
        state.busy = false;
        if state.is_idle() {
            self.idle.notify_all();
        }
    }

    /// Blocks until the queue is empty and the dispatcher is not busy.
    ///
    /// Returns false if `timeout` elapsed first.
    pub(crate) fn wait_idle(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock();
        while !state.is_idle() {
            match deadline {
                None => self.idle.wait(&mut state),
                Some(deadline) => {
                    if self.idle.wait_until(&mut state, deadline).timed_out() {
                        return state.is_idle();
                    }
                }
            }
        }
        true
    }

    /// Completes every waiting item with [`Outcome::Dropped`].
    pub(crate) fn cancel_all(&self) -> usize {
        let mut state = self.state.lock();
        let jobs = std::mem::take(&mut state.jobs);
        let catchup = std::mem::take(&mut state.catchup);
        let cancelled = jobs.len() + catchup.len();
        for job in jobs {
            job.completion.complete(Outcome::Dropped);
        }
        for completion in catchup {
            completion.complete(Outcome::Dropped);
        }
        if state.is_idle() {
            self.idle.notify_all();
        }
        cancelled
    }

    /// Wakes a dispatcher sleeping in [`pop`](Self::pop).
    pub(crate) fn wake(&self) {
        self.not_empty.notify_all();
    }

    pub(crate) fn len(&self) -> usize {
        let state = self.state.lock();
        state.jobs.len() + usize::from(!state.catchup.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ticket::Ticket;
    use bricklayer_core::Operation;

    fn job(brick_id: u64) -> (SubmitJob, Arc<Completion>) {
        let completion = Completion::new();
        let job = SubmitJob {
            transaction: Transaction::single(Operation::DeleteBrick { brick_id }),
            completion: Arc::clone(&completion),
        };
        (job, completion)
    }

    #[test]
    fn test_fifo_with_catchup_first() {
        let queue = WorkQueue::default();
        queue.push(job(1).0);
        queue.push(job(2).0);
        queue.request_catchup(Completion::new());
        queue.request_catchup(Completion::new());
        assert_eq!(queue.len(), 3);

        let order: Vec<_> = std::iter::from_fn(|| {
            let work = queue.pop(Duration::ZERO)?;
            queue.finish();
            Some(match work {
                Work::Catchup(waiters) => format!("catchup x{}", waiters.len()),
                Work::Submit(job) => job.transaction.serialize(),
            })
        })
        .collect();
        assert_eq!(order, vec!["catchup x2", "DeleteBrick 1\n", "DeleteBrick 2\n"]);
        assert!(queue.wait_idle(Some(Duration::ZERO)));
    }

    #[test]
    fn test_busy_is_not_idle() {
        let queue = WorkQueue::default();
        queue.push(job(1).0);
        let _work = queue.pop(Duration::ZERO);
        assert!(!queue.wait_idle(Some(Duration::from_millis(5))));
        queue.finish();
        assert!(queue.wait_idle(None));
    }

    #[test]
    fn test_cancel_all_drops() {
        let queue = WorkQueue::default();
        let (j, completion) = job(1);
        queue.push(j);
        assert_eq!(queue.cancel_all(), 1);
        assert_eq!(Ticket::new(completion).outcome(), Some(Outcome::Dropped));
    }
}
