//! Background dispatcher: the single consumer of the work queue and the
//! only thread that replays server transactions into the World.

use std::sync::atomic::Ordering;

use bricklayer_core::{RejectReason, Transaction};

use super::queue::{SubmitJob, Work};
use super::ticket::Outcome;
use super::Shared;
use crate::events::WorldEvent;
use crate::protocol::{Request, Response, XaHeader};

/// Dispatcher thread main loop.
///
/// Sleeps on the queue condvar, waking at least every poll interval to
/// observe the shutdown flag.
pub(super) fn run(shared: &Shared) {
    tracing::debug!("Dispatcher started for client {}", shared.client_id);

    while !shared.done.load(Ordering::Acquire) {
        let Some(work) = shared.queue.pop(shared.poll) else {
            continue;
        };

        match work {
            Work::Submit(job) => {
                let outcome = submit(shared, &job);
                job.completion.complete(outcome);
            }
            Work::Catchup(waiters) => {
                let outcome = catch_up(shared);
                for waiter in waiters {
                    waiter.complete(outcome);
                }
            }
        }
        shared.queue.finish();
    }

    let dropped = shared.queue.cancel_all();
    if dropped > 0 {
        tracing::warn!("Dispatcher stopped with {} queued items dropped", dropped);
    }
    tracing::debug!("Dispatcher stopped for client {}", shared.client_id);
}

/// Revalidates, sends and applies the reply for one queued transaction.
fn submit(shared: &Shared, job: &SubmitJob) -> Outcome {
    let transaction = &job.transaction;
    if let Err(reason) = still_valid(shared, transaction) {
        tracing::warn!("Dropping queued transaction ({} ops): {}", transaction.len(), reason);
        return Outcome::Dropped;
    }

    let header = {
        let mut ids = shared.ids.lock();
        let header = XaHeader {
            world_id: shared.world_id,
            xa_id: ids.next_xa_id,
            client_id: shared.client_id,
            req_id: ids.next_req_id,
        };
        ids.next_req_id += 1;
        header
    };

    let message = Request::Submit { header, transaction: transaction.clone() }.encode();
    tracing::debug!("Sending transaction:\n{}", message);

    let Some(response) = round_trip(shared, &message) else {
        return Outcome::NetworkFailure;
    };

    let Some(success) = response.success else {
        tracing::warn!("Reply to request {} has no success line", header.req_id);
        return Outcome::NetworkFailure;
    };
    apply_response(shared, &response);
    if success {
        Outcome::Accepted
    } else {
        tracing::info!("Server refused request {} ({} ops)", header.req_id, transaction.len());
        shared.events.send(&WorldEvent::Conflict);
        Outcome::Conflict
    }
}

/// Requests and applies everything from the next expected id on.
fn catch_up(shared: &Shared) -> Outcome {
    let since = shared.ids.lock().next_xa_id;
    let message = Request::TransactionsSince { world_id: shared.world_id, since }.encode();
    tracing::debug!("Requesting transactions since {}", since);

    let Some(response) = round_trip(shared, &message) else {
        return Outcome::NetworkFailure;
    };

    let applied = apply_response(shared, &response);
    tracing::info!(
        "Catch-up from {}: received {}, applied {}",
        since,
        response.transactions.len(),
        applied
    );
    Outcome::CaughtUp(applied)
}

/// The ops must still be acceptable to the World as it is now, each one
/// against the state its predecessors leave behind.
fn still_valid(shared: &Shared, transaction: &Transaction) -> Result<(), RejectReason> {
    shared.world.write().check(transaction)
}

/// Sends `message`; `None` for anything that is not a decodable reply.
fn round_trip(shared: &Shared, message: &str) -> Option<Response> {
    let body = match shared.link.send(message) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Round trip failed: {}", e);
            return None;
        }
    };
    tracing::debug!("Got response:\n{}", body);

    match Response::decode(&body) {
        Ok(response) => Some(response),
        Err(e) => {
            tracing::warn!("Unusable response: {}", e);
            None
        }
    }
}

/// Replays recorded transactions in receipt order, skipping stale ones.
///
/// Returns how many were applied.
fn apply_response(shared: &Shared, response: &Response) -> usize {
    let mut applied = 0;
    {
        let mut world = shared.world.write();
        for recorded in &response.transactions {
            let xa_id = recorded.xa_id();
            {
                let mut ids = shared.ids.lock();
                if xa_id < ids.next_xa_id {
                    tracing::warn!(
                        "Skipping stale transaction {} (next expected {})",
                        xa_id,
                        ids.next_xa_id
                    );
                    continue;
                }
                ids.next_xa_id = xa_id + 1;
            }

            world.apply_transaction(&recorded.transaction);
            shared.log.lock().push(recorded.transaction.clone());
            shared.events.send(&WorldEvent::TransactionProcessed {
                xa_id,
                ops: recorded.transaction.serialize(),
            });
            applied += 1;
        }
    }

    if applied > 0 {
        tracing::debug!("Executed {} transactions", applied);
        shared.events.send(&WorldEvent::WorldChanged);
    }
    applied
}
