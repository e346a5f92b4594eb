//! # Universe
//!
//! The embedding application's handle on a replicated World.
//!
//! Every mutation goes through the [`TransactionManager`]: it is validated
//! against the local World, then either applied locally (offline) or sent
//! to the authority and applied when the authority's echo comes back.
//! Reads go straight to the shared World.
//!
//! Bulk edits (selection color/move, clearing the universe, mesh import)
//! are one transaction each. Bulk edits are checked against the World as a
//! whole before anything is submitted, so a refused bulk edit changes nothing.

use std::sync::Arc;

use bricklayer_core::{Brick, BrickId, Operation, Orientation, Palette, World, WorldId};
use bricklayer_networking::{
    Execution, ReplicationError, ServerLink, Ticket, TransactionManager, WorldEvent,
};
use bricklayer_shared::{Vec3d, Vec3f, Vec3i};
use bricklayer_voxel::{ImportReport, TriangleMesh, Voxelizer};
use crossbeam_channel::Receiver;
use parking_lot::RwLock;

use crate::config::UniverseConfig;
use crate::error::BricklayerResult;

/// A replicated brick world plus the tools that edit it.
pub struct Universe {
    manager: TransactionManager,
    voxelizer: Voxelizer,
    import_units: u32,
}

impl Universe {
    /// Builds a universe talking HTTP to the configured authority.
    ///
    /// # Errors
    ///
    /// Invalid configuration or HTTP client construction failure.
    pub fn connect(config: &UniverseConfig) -> BricklayerResult<Self> {
        let manager = TransactionManager::connect(&config.client)?;
        Ok(Self::from_parts(config, manager))
    }

    /// Builds a universe over an arbitrary link.
    ///
    /// # Errors
    ///
    /// Invalid configuration.
    pub fn new(config: &UniverseConfig, link: Arc<dyn ServerLink>) -> BricklayerResult<Self> {
        let manager = TransactionManager::new(&config.client, link)?;
        Ok(Self::from_parts(config, manager))
    }

    fn from_parts(config: &UniverseConfig, manager: TransactionManager) -> Self {
        Self {
            manager,
            voxelizer: Voxelizer::new(config.voxelizer.clone()),
            import_units: config.import_units(),
        }
    }

    // =========================================================================
    // ACCESS
    // =========================================================================

    /// Namespace id on the wire.
    #[must_use]
    pub fn id(&self) -> WorldId {
        self.manager.world().read().id()
    }

    /// The shared World.
    #[must_use]
    pub fn world(&self) -> &Arc<RwLock<World>> {
        self.manager.world()
    }

    /// The replication engine.
    #[must_use]
    pub fn transaction_manager(&self) -> &TransactionManager {
        &self.manager
    }

    /// Subscribes to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<WorldEvent> {
        self.manager.subscribe()
    }

    /// Copy of brick `id`.
    #[must_use]
    pub fn brick(&self, id: BrickId) -> Option<Brick> {
        self.world().read().brick(id).copied()
    }

    /// Brick occupying grid cell `cell`.
    #[must_use]
    pub fn brick_at(&self, cell: Vec3i) -> Option<Brick> {
        self.world().read().brick_at(cell).copied()
    }

    /// Brick whose box contains `point`, for picking.
    #[must_use]
    pub fn brick_containing(&self, point: Vec3d) -> Option<Brick> {
        self.world().read().brick_containing(point).copied()
    }

    /// Every brick, ordered by id.
    #[must_use]
    pub fn bricks(&self) -> Vec<Brick> {
        self.world().read().bricks().copied().collect()
    }

    /// Number of bricks.
    #[must_use]
    pub fn brick_count(&self) -> usize {
        self.world().read().len()
    }

    /// Returns true if the local World would accept `op` right now.
    #[must_use]
    pub fn is_valid(&self, op: &Operation) -> bool {
        self.world().read().validate(op).is_ok()
    }

    // =========================================================================
    // SINGLE OPS
    // =========================================================================

    /// Parses one op line and executes it.
    ///
    /// # Errors
    ///
    /// Unparseable text, or anything [`execute`](Self::execute) reports.
    pub fn process_op(&self, text: &str) -> BricklayerResult<Execution> {
        let op: Operation = text.parse()?;
        self.execute(op)
    }

    /// Executes one op.
    ///
    /// # Errors
    ///
    /// Local rejection (nothing changes) or a shut-down manager.
    pub fn execute(&self, op: Operation) -> BricklayerResult<Execution> {
        Ok(self.manager.execute_op(op)?)
    }

    /// Places a new brick.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn create_brick(
        &self,
        position: Vec3i,
        size: Vec3i,
        orientation: Orientation,
        color: Vec3f,
    ) -> BricklayerResult<Execution> {
        self.execute(Operation::CreateBrick { position, size, orientation, color })
    }

    /// Moves brick `id`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn set_position(&self, id: BrickId, position: Vec3i) -> BricklayerResult<Execution> {
        self.execute(Operation::ModifyBrickPosition { brick_id: id, position })
    }

    /// Resizes brick `id`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn set_size(&self, id: BrickId, size: Vec3i) -> BricklayerResult<Execution> {
        self.execute(Operation::ModifyBrickSize { brick_id: id, size })
    }

    /// Turns brick `id`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn set_orientation(&self, id: BrickId, orientation: Orientation) -> BricklayerResult<Execution> {
        self.execute(Operation::ModifyBrickOrientation { brick_id: id, orientation })
    }

    /// Recolors brick `id`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn set_color(&self, id: BrickId, color: Vec3f) -> BricklayerResult<Execution> {
        self.execute(Operation::ModifyBrickColor { brick_id: id, color })
    }

    /// Deletes brick `id`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn destroy_brick(&self, id: BrickId) -> BricklayerResult<Execution> {
        self.execute(Operation::DeleteBrick { brick_id: id })
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    /// Adds `id` to the selection. False if there is no such brick.
    pub fn select(&self, id: BrickId) -> bool {
        self.world().write().select(id)
    }

    /// Removes `id` from the selection.
    pub fn deselect(&self, id: BrickId) -> bool {
        self.world().write().deselect(id)
    }

    /// Empties the selection.
    pub fn clear_selection(&self) {
        self.world().write().clear_selection();
    }

    /// Selected brick ids, ascending.
    #[must_use]
    pub fn selection(&self) -> Vec<BrickId> {
        self.world().read().selection()
    }

    /// Recolors every selected brick in one transaction.
    ///
    /// Returns `None` if nothing is selected.
    ///
    /// # Errors
    ///
    /// See [`execute_batch`](Self::execute_batch).
    pub fn modify_color_for_selected(&self, color: Palette) -> BricklayerResult<Option<Execution>> {
        let ops = self
            .selection()
            .into_iter()
            .map(|brick_id| Operation::ModifyBrickColor { brick_id, color: color.rgb() })
            .collect();
        self.execute_batch(ops)
    }

    /// Moves every selected brick by `delta` in one transaction.
    ///
    /// Each brick must fit its destination with the others still in place.
    ///
    /// # Errors
    ///
    /// See [`execute_batch`](Self::execute_batch).
    pub fn modify_position_for_selected(&self, delta: Vec3i) -> BricklayerResult<Option<Execution>> {
        let ops = {
            let world = self.world().read();
            world
                .selection()
                .into_iter()
                .filter_map(|id| world.brick(id))
                .map(|brick| Operation::ModifyBrickPosition {
                    brick_id: brick.id(),
                    position: brick.position + delta,
                })
                .collect()
        };
        self.execute_batch(ops)
    }

    /// Deletes every brick in one transaction.
    ///
    /// Returns `None` if the universe is already empty.
    ///
    /// # Errors
    ///
    /// See [`execute_batch`](Self::execute_batch).
    pub fn new_universe(&self) -> BricklayerResult<Option<Execution>> {
        let ops = self
            .world()
            .read()
            .bricks()
            .map(|brick| Operation::DeleteBrick { brick_id: brick.id() })
            .collect();
        self.execute_batch(ops)
    }

    /// Executes `ops` as one transaction. `None` for an empty batch.
    ///
    /// Every op is checked against the current World first; if any is
    /// refused, nothing is executed.
    ///
    /// # Errors
    ///
    /// The first refusal, an already open transaction, or a shut-down manager.
    pub fn execute_batch(&self, ops: Vec<Operation>) -> BricklayerResult<Option<Execution>> {
        if ops.is_empty() {
            return Ok(None);
        }
        {
            let world = self.world().read();
            for op in &ops {
                world.validate(op).map_err(ReplicationError::from)?;
            }
        }

        self.manager.open_transaction()?;
        let mut accumulated = 0;
        for op in ops {
            match self.manager.execute_op(op) {
                Ok(Execution::AppliedOffline) => {}
                Ok(_) => accumulated += 1,
                Err(e) => {
                    self.manager.abort_transaction();
                    return Err(e.into());
                }
            }
        }

        // Offline: every op was applied as it was executed.
        if accumulated == 0 {
            self.manager.abort_transaction();
            return Ok(Some(Execution::AppliedOffline));
        }
        Ok(Some(self.manager.close_transaction()?))
    }

    // =========================================================================
    // REPLICATION
    // =========================================================================

    /// Switches between networked and offline editing.
    ///
    /// Coming back online returns the ticket of the offline sync, if any.
    ///
    /// # Errors
    ///
    /// Shut-down manager.
    pub fn set_network_enabled(&self, enabled: bool) -> BricklayerResult<Option<Ticket>> {
        Ok(self.manager.set_network_enabled(enabled)?)
    }

    /// True while online.
    #[must_use]
    pub fn is_network_enabled(&self) -> bool {
        self.manager.is_network_enabled()
    }

    /// Requests everything the authority recorded since the last applied
    /// transaction.
    ///
    /// # Errors
    ///
    /// Shut-down manager.
    pub fn catch_up(&self) -> BricklayerResult<Ticket> {
        Ok(self.manager.catch_up()?)
    }

    /// Blocks until the dispatcher has nothing left to do.
    pub fn flush(&self) {
        self.manager.flush();
    }

    // =========================================================================
    // IMPORT
    // =========================================================================

    /// Voxelizes `mesh` at the configured resolution and places the result
    /// with its minimum corner at `origin`, as one transaction.
    ///
    /// # Errors
    ///
    /// Invalid mesh, or the transaction could not be opened.
    pub fn import_mesh(&self, mesh: &TriangleMesh, origin: Vec3i) -> BricklayerResult<ImportReport> {
        self.voxelize(mesh, self.import_units, origin)
    }

    /// Voxelizes `mesh` with `max_units` voxels along its longest axis.
    ///
    /// # Errors
    ///
    /// Invalid mesh, or the transaction could not be opened.
    pub fn voxelize(&self, mesh: &TriangleMesh, max_units: u32, origin: Vec3i) -> BricklayerResult<ImportReport> {
        let voxels = self.voxelizer.voxelize(mesh, max_units)?;
        if !voxels.is_watertight() {
            tracing::warn!(
                "Mesh is not closed: {} columns ran away",
                voxels.runaway_columns().len()
            );
        }
        Ok(self.voxelizer.populate(&voxels, &self.manager, origin)?)
    }
}
