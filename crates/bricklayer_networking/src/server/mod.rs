//! # Local Authority
//!
//! An in-process, single-authority server speaking the wire protocol.
//!
//! ## Contract
//!
//! - Transaction ids are consecutive per world, starting at 0.
//! - A submission is validated against the server's own World replica and
//!   recorded only if every op applies. All or nothing.
//! - Every reply to a submission carries the outcome plus every recorded
//!   transaction with id >= the submission's proposed id, so the submitter
//!   receives its own echo and anything it missed.
//! - `TransactionsSince` answers with the recorded log from the given id.
//! - `client_id`/`req_id` are recorded and echoed, never deduplicated.
//!
//! State lives in memory only; dropping the server forgets everything.

use std::collections::HashMap;

use bricklayer_core::{Transaction, World, WorldId, XaId};
use bricklayer_shared::Vec3i;
use parking_lot::Mutex;

use crate::error::TransportError;
use crate::protocol::{RecordedTransaction, Request, Response, XaHeader};
use crate::transport::ServerLink;

/// Server configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Grid minimum of every world replica.
    pub grid_min: Vec3i,
    /// Grid maximum of every world replica.
    pub grid_max: Vec3i,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grid_min: bricklayer_shared::constants::DEFAULT_GRID_MIN,
            grid_max: bricklayer_shared::constants::DEFAULT_GRID_MAX,
        }
    }
}

/// Submission counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Submissions received.
    pub submitted: u64,
    /// Submissions recorded.
    pub accepted: u64,
    /// Submissions refused.
    pub rejected: u64,
    /// Catch-up requests served.
    pub catchups: u64,
    /// Messages that failed to decode.
    pub malformed: u64,
}

/// One world's authoritative replica and log.
struct Namespace {
    world: World,
    log: Vec<RecordedTransaction>,
}

impl Namespace {
    fn since(&self, since: XaId) -> Vec<RecordedTransaction> {
        let start = usize::try_from(since).unwrap_or(usize::MAX).min(self.log.len());
        self.log[start..].to_vec()
    }
}

struct ServerState {
    namespaces: HashMap<WorldId, Namespace>,
    stats: ServerStats,
}

/// In-process authority.
pub struct LocalServer {
    config: ServerConfig,
    state: Mutex<ServerState>,
}

impl LocalServer {
    /// Creates an empty server.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ServerState { namespaces: HashMap::new(), stats: ServerStats::default() }),
        }
    }

    /// Handles one wire message and returns the wire reply.
    ///
    /// Undecodable messages get an empty reply, which clients treat as a
    /// network failure.
    pub fn handle(&self, message: &str) -> String {
        let request = match Request::decode(message) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Server: dropping malformed request: {}", e);
                self.state.lock().stats.malformed += 1;
                return String::new();
            }
        };

        let response = match request {
            Request::Submit { header, transaction } => self.submit(header, transaction),
            Request::TransactionsSince { world_id, since } => self.transactions_since(world_id, since),
        };
        response.encode()
    }

    fn submit(&self, header: XaHeader, transaction: Transaction) -> Response {
        let mut state = self.state.lock();
        state.stats.submitted += 1;

        let config = self.config;
        let ns = state.namespaces.entry(header.world_id).or_insert_with(|| Namespace {
            world: World::new(header.world_id, config.grid_min, config.grid_max),
            log: Vec::new(),
        });

        let outcome = if transaction.is_empty() {
            Err("empty transaction".to_string())
        } else {
            ns.world.commit(&transaction).map_err(|reason| reason.to_string())
        };

        let success = match outcome {
            Ok(()) => {
                let xa_id = ns.log.len() as XaId;
                ns.log.push(RecordedTransaction::new(XaHeader { xa_id, ..header }, transaction));
                tracing::debug!(
                    "Server: recorded transaction {} from client {} req {}",
                    xa_id,
                    header.client_id,
                    header.req_id
                );
                true
            }
            Err(reason) => {
                tracing::debug!(
                    "Server: refused submission from client {} req {}: {}",
                    header.client_id,
                    header.req_id,
                    reason
                );
                false
            }
        };

        let transactions = ns.since(header.xa_id);
        if success {
            state.stats.accepted += 1;
        } else {
            state.stats.rejected += 1;
        }
        Response { success: Some(success), transactions, skipped: 0 }
    }

    fn transactions_since(&self, world_id: WorldId, since: XaId) -> Response {
        let mut state = self.state.lock();
        state.stats.catchups += 1;
        let transactions = state.namespaces.get(&world_id).map(|ns| ns.since(since)).unwrap_or_default();
        Response { success: Some(true), transactions, skipped: 0 }
    }

    /// Number of recorded transactions in `world_id`.
    #[must_use]
    pub fn log_len(&self, world_id: WorldId) -> usize {
        self.state.lock().namespaces.get(&world_id).map_or(0, |ns| ns.log.len())
    }

    /// Brick count of the authoritative replica.
    #[must_use]
    pub fn brick_count(&self, world_id: WorldId) -> usize {
        self.state.lock().namespaces.get(&world_id).map_or(0, |ns| ns.world.len())
    }

    /// Counters since creation.
    #[must_use]
    pub fn stats(&self) -> ServerStats {
        self.state.lock().stats
    }
}

impl Default for LocalServer {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

impl ServerLink for LocalServer {
    fn send(&self, message: &str) -> Result<String, TransportError> {
        Ok(self.handle(message))
    }
}
