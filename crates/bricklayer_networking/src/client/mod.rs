//! # Transaction Manager
//!
//! Client side of the replication protocol.
//!
//! ## Architecture
//!
//! ```text
//!   caller thread                         dispatcher thread
//!   -------------                         -----------------
//!   execute_op ──> validate ──┬─ offline ─> apply locally + accumulate
//!                             ├─ open xa ─> accumulate
//!                             └─ online ──> [ WorkQueue ] ──> revalidate
//!                                               │              send
//!   catch_up ───────────────────────────────────┘              apply reply
//!                                                              emit events
//! ```
//!
//! ## Locks
//!
//! - `mode` (network flag, open transaction, offline accumulator): callers only
//! - `world`: callers read for validation; the dispatcher writes
//! - `ids` (next xa id, next req id): independent of the queue lock
//!
//! Callers take `mode` before `world`; the dispatcher takes `world` before
//! `ids` and never touches `mode`.
//!
//! World is written by the dispatcher while online and by the caller while
//! offline. Going offline waits for the queue to drain first, so the two
//! writers never overlap.

mod dispatcher;
mod queue;
mod ticket;

pub use ticket::{Outcome, Ticket};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bricklayer_core::{Operation, Transaction, World, WorldId, XaId};
use crossbeam_channel::Receiver;
use parking_lot::{Mutex, RwLock};
use rand::Rng;

use crate::config::ClientConfig;
use crate::error::{ReplicationError, ReplicationResult};
use crate::events::{EventChannel, WorldEvent};
use crate::protocol::{ClientId, ReqId};
use crate::transport::{HttpLink, ServerLink};
use queue::{SubmitJob, WorkQueue};
use ticket::Completion;

/// What `execute_op` did with an op that passed local validation.
#[derive(Clone, Debug)]
pub enum Execution {
    /// Offline: applied to the local World and remembered for [`TransactionManager::sync`].
    AppliedOffline,
    /// Appended to the open transaction.
    Accumulated,
    /// Handed to the dispatcher.
    Queued(Ticket),
}

impl Execution {
    /// The dispatcher ticket, if the op was queued.
    #[must_use]
    pub fn ticket(&self) -> Option<&Ticket> {
        match self {
            Self::Queued(ticket) => Some(ticket),
            Self::AppliedOffline | Self::Accumulated => None,
        }
    }
}

/// Transaction id bookkeeping, shared between callers and the dispatcher.
#[derive(Debug, Default)]
struct IdCounters {
    /// One past the highest xa id applied.
    next_xa_id: XaId,
    next_req_id: ReqId,
}

/// Caller-side mode.
#[derive(Debug, Default)]
struct Mode {
    network_enabled: bool,
    open: Option<Transaction>,
    offline: Transaction,
}

/// State the dispatcher thread shares with the manager.
struct Shared {
    world_id: WorldId,
    client_id: ClientId,
    world: Arc<RwLock<World>>,
    link: Arc<dyn ServerLink>,
    queue: WorkQueue,
    ids: Mutex<IdCounters>,
    log: Mutex<Vec<Transaction>>,
    events: EventChannel,
    done: AtomicBool,
    poll: Duration,
}

/// Batches ops into transactions, ships them to the server and replays
/// what the server records.
pub struct TransactionManager {
    shared: Arc<Shared>,
    mode: Mutex<Mode>,
    dispatcher: Option<JoinHandle<()>>,
}

impl TransactionManager {
    /// Creates a manager with its own World, talking HTTP to the configured server.
    ///
    /// # Errors
    ///
    /// Invalid configuration or HTTP client construction failure.
    pub fn connect(config: &ClientConfig) -> ReplicationResult<Self> {
        let link = HttpLink::new(config.server_url.clone(), config.request_timeout())?;
        Self::new(config, Arc::new(link))
    }

    /// Creates a manager with its own World over an arbitrary link.
    ///
    /// # Errors
    ///
    /// Invalid configuration.
    pub fn new(config: &ClientConfig, link: Arc<dyn ServerLink>) -> ReplicationResult<Self> {
        let world = World::new(config.world_id, config.grid_min, config.grid_max);
        Self::with_world(config, Arc::new(RwLock::new(world)), link)
    }

    /// Creates a manager around an existing World.
    ///
    /// Spawns the dispatcher and, if configured, queues a catch-up.
    ///
    /// # Errors
    ///
    /// Invalid configuration.
    pub fn with_world(
        config: &ClientConfig,
        world: Arc<RwLock<World>>,
        link: Arc<dyn ServerLink>,
    ) -> ReplicationResult<Self> {
        config.validate()?;

        let client_id = config
            .client_id
            .unwrap_or_else(|| u64::from(rand::thread_rng().gen::<u32>() >> 1));
        let world_id = world.read().id();

        let shared = Arc::new(Shared {
            world_id,
            client_id,
            world,
            link,
            queue: WorkQueue::default(),
            ids: Mutex::new(IdCounters::default()),
            log: Mutex::new(Vec::new()),
            events: EventChannel::new(),
            done: AtomicBool::new(false),
            poll: config.poll_interval(),
        });

        let worker = Arc::clone(&shared);
        let dispatcher = thread::Builder::new()
            .name(format!("bricklayer-dispatcher-{client_id}"))
            .spawn(move || dispatcher::run(&worker))
            .map_err(|e| ReplicationError::Config(format!("failed to spawn dispatcher: {e}")))?;

        let manager = Self {
            shared,
            mode: Mutex::new(Mode { network_enabled: config.network_enabled, ..Mode::default() }),
            dispatcher: Some(dispatcher),
        };
        tracing::info!(
            "Transaction manager started: world {}, client {}, network {}",
            world_id,
            client_id,
            if config.network_enabled { "on" } else { "off" }
        );

        if config.network_enabled && config.catchup_on_start {
            manager.catch_up()?;
        }
        Ok(manager)
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Validates `op` locally, then applies it offline, accumulates it into the
    /// open transaction, or queues it as a one-op transaction.
    ///
    /// # Errors
    ///
    /// [`ReplicationError::Rejected`] if the local World refuses it (nothing
    /// changes), or [`ReplicationError::ShutDown`].
    pub fn execute_op(&self, op: Operation) -> ReplicationResult<Execution> {
        self.ensure_running()?;
        let mut mode = self.mode.lock();

        if !mode.network_enabled {
            self.apply_offline(&mut mode, op)?;
            return Ok(Execution::AppliedOffline);
        }

        self.shared.world.read().validate(&op)?;
        if let Some(open) = mode.open.as_mut() {
            open.push(op);
            return Ok(Execution::Accumulated);
        }
        Ok(Execution::Queued(self.enqueue(Transaction::single(op))))
    }

    /// Starts batching ops into one transaction.
    ///
    /// # Errors
    ///
    /// [`ReplicationError::TransactionAlreadyOpen`].
    pub fn open_transaction(&self) -> ReplicationResult<()> {
        let mut mode = self.mode.lock();
        if mode.open.is_some() {
            return Err(ReplicationError::TransactionAlreadyOpen);
        }
        mode.open = Some(Transaction::new());
        Ok(())
    }

    /// Ends the batch and submits it as one transaction.
    ///
    /// If the network was disabled while the batch was open, its ops are
    /// validated and applied locally instead, like any offline op.
    ///
    /// # Errors
    ///
    /// No open transaction, an empty batch, or shutdown.
    pub fn close_transaction(&self) -> ReplicationResult<Execution> {
        self.ensure_running()?;
        let mut mode = self.mode.lock();
        let transaction = mode.open.take().ok_or(ReplicationError::NoOpenTransaction)?;
        if transaction.is_empty() {
            return Err(ReplicationError::EmptyTransaction);
        }

        if !mode.network_enabled {
            let mut rejected = 0;
            for op in transaction.ops() {
                if self.apply_offline(&mut mode, *op).is_err() {
                    rejected += 1;
                }
            }
            if rejected > 0 {
                tracing::warn!("{} batched ops no longer valid offline", rejected);
            }
            return Ok(Execution::AppliedOffline);
        }
        Ok(Execution::Queued(self.enqueue(transaction)))
    }

    /// Discards the open transaction, if any. Returns how many ops were dropped.
    pub fn abort_transaction(&self) -> usize {
        self.mode.lock().open.take().map_or(0, |xa| xa.len())
    }

    /// Submits the offline accumulator and clears it.
    ///
    /// Returns `None` if there is nothing to send or the network is disabled.
    ///
    /// # Errors
    ///
    /// [`ReplicationError::ShutDown`]; the accumulator is kept.
    pub fn sync(&self) -> ReplicationResult<Option<Ticket>> {
        self.ensure_running()?;
        let mut mode = self.mode.lock();
        Ok(self.sync_locked(&mut mode))
    }

    /// Requests every transaction from the next expected id on.
    ///
    /// Offline, the returned ticket is already [`Outcome::Dropped`].
    ///
    /// # Errors
    ///
    /// [`ReplicationError::ShutDown`].
    pub fn catch_up(&self) -> ReplicationResult<Ticket> {
        self.ensure_running()?;
        if !self.is_network_enabled() {
            tracing::debug!("Catch-up skipped: network disabled");
            return Ok(Ticket::ready(Outcome::Dropped));
        }
        let completion = Completion::new();
        self.shared.queue.request_catchup(Arc::clone(&completion));
        Ok(Ticket::new(completion))
    }

    /// Switches between networked and offline operation.
    ///
    /// Going offline waits for queued work to finish, then snapshots the World.
    /// Coming back restores that snapshot (the last server-confirmed state)
    /// and submits everything done offline as one transaction.
    ///
    /// # Errors
    ///
    /// [`ReplicationError::ShutDown`]. Nothing changes: the mode, the World
    /// and the offline accumulator stay as they were.
    pub fn set_network_enabled(&self, enabled: bool) -> ReplicationResult<Option<Ticket>> {
        self.ensure_running()?;
        let mut mode = self.mode.lock();
        if mode.network_enabled == enabled {
            return Ok(None);
        }

        if enabled {
            self.shared.world.write().restore();
            mode.network_enabled = true;
            tracing::info!("Network enabled; {} offline ops to sync", mode.offline.len());
            Ok(self.sync_locked(&mut mode))
        } else {
            mode.network_enabled = false;
            self.shared.queue.wait_idle(None);
            self.shared.world.write().snapshot();
            tracing::info!("Network disabled");
            Ok(None)
        }
    }

    /// Blocks until every queued item has been processed.
    pub fn flush(&self) {
        self.shared.queue.wait_idle(None);
    }

    /// Like [`flush`](Self::flush) with a limit. Returns false on timeout.
    #[must_use]
    pub fn flush_timeout(&self, timeout: Duration) -> bool {
        self.shared.queue.wait_idle(Some(timeout))
    }

    /// Stops the dispatcher. Queued work completes as [`Outcome::Dropped`].
    pub fn shutdown(&mut self) {
        self.shared.done.store(true, Ordering::Release);
        self.shared.queue.wake();
        if let Some(handle) = self.dispatcher.take() {
            if handle.join().is_err() {
                tracing::error!("Dispatcher thread panicked");
            }
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// The World this manager replicates into.
    #[must_use]
    pub fn world(&self) -> &Arc<RwLock<World>> {
        &self.shared.world
    }

    /// Subscribes to world events.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<WorldEvent> {
        self.shared.events.subscribe()
    }

    /// Server transactions applied so far, in order.
    #[must_use]
    pub fn log(&self) -> Vec<Transaction> {
        self.shared.log.lock().clone()
    }

    /// Highest xa id applied, if any.
    #[must_use]
    pub fn last_xa_id(&self) -> Option<XaId> {
        self.shared.ids.lock().next_xa_id.checked_sub(1)
    }

    /// Next xa id this client expects.
    #[must_use]
    pub fn next_xa_id(&self) -> XaId {
        self.shared.ids.lock().next_xa_id
    }

    /// At-most-once client token.
    #[must_use]
    pub fn client_id(&self) -> ClientId {
        self.shared.client_id
    }

    /// True while online.
    #[must_use]
    pub fn is_network_enabled(&self) -> bool {
        self.mode.lock().network_enabled
    }

    /// True between `open_transaction` and `close_transaction`.
    #[must_use]
    pub fn is_transaction_open(&self) -> bool {
        self.mode.lock().open.is_some()
    }

    /// Ops applied offline and not yet synced.
    #[must_use]
    pub fn pending_offline(&self) -> usize {
        self.mode.lock().offline.len()
    }

    /// Items waiting for the dispatcher.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn ensure_running(&self) -> ReplicationResult<()> {
        if self.shared.done.load(Ordering::Acquire) {
            Err(ReplicationError::ShutDown)
        } else {
            Ok(())
        }
    }

    /// Hands `transaction` to the dispatcher. After shutdown nothing reads
    /// the queue, so the ticket resolves at once as dropped.
    fn enqueue(&self, transaction: Transaction) -> Ticket {
        if self.shared.done.load(Ordering::Acquire) {
            tracing::warn!("Not queueing {} ops: dispatcher stopped", transaction.len());
            return Ticket::ready(Outcome::Dropped);
        }
        let completion = Completion::new();
        tracing::debug!("Queueing transaction with {} ops", transaction.len());
        self.shared.queue.push(SubmitJob { transaction, completion: Arc::clone(&completion) });
        Ticket::new(completion)
    }

    /// Validates and applies under one write lock, then records the op.
    fn apply_offline(&self, mode: &mut Mode, op: Operation) -> ReplicationResult<()> {
        {
            let mut world = self.shared.world.write();
            world.validate(&op)?;
            world.apply(&op);
        }
        mode.offline.push(op);
        self.shared.events.send(&WorldEvent::WorldChanged);
        Ok(())
    }

    fn sync_locked(&self, mode: &mut Mode) -> Option<Ticket> {
        if !mode.network_enabled || mode.offline.is_empty() {
            return None;
        }
        let transaction = mode.offline.take();
        tracing::info!("Syncing {} offline ops", transaction.len());
        Some(self.enqueue(transaction))
    }
}

impl Drop for TransactionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
