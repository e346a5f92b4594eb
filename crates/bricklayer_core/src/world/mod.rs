//! # World
//!
//! The brick registry plus the dense grid that indexes it.
//!
//! ## Invariants
//!
//! - A non-empty grid cell holds the id of exactly one live brick, and that
//!   brick's footprint covers exactly the cells holding its id.
//! - Cells outside `grid_min..=grid_max` are never written.
//! - Brick ids come from a counter owned by the World; replicas that apply the
//!   same transactions in the same order hand out the same ids.
//!
//! ## Two-phase mutation
//!
//! [`World::validate`] checks an operation without touching anything.
//! [`World::apply`] writes unconditionally and trusts that validation already
//! happened (on this replica or on the server). [`World::commit`] does both
//! for a whole transaction, rolling back if any op is refused.
//!
//! ## Limitations
//!
//! [`World::brick_containing`] scans every brick. The grid answers cell
//! queries in O(1) ([`World::brick_at`]); the scan exists for points that do
//! not land on cell centers, such as picking rays.

mod grid;
mod snapshot;

pub use grid::Grid;
pub use snapshot::Snapshot;

use std::collections::{BTreeMap, BTreeSet};

use bricklayer_shared::{Vec3d, Vec3i};

use crate::brick::{Brick, BrickId, EMPTY_CELL};
use crate::error::RejectReason;
use crate::oplog::{Operation, Transaction};

/// Namespace id of a world on the wire.
pub type WorldId = u64;

/// What [`World::commit`] needs to put a brick back the way it was.
enum Undo {
    Created(BrickId),
    Replaced(Brick),
    Deleted(Brick),
}

/// Spatial grid + brick registry + selection.
#[derive(Debug)]
pub struct World {
    id: WorldId,
    grid: Grid,
    bricks: BTreeMap<BrickId, Brick>,
    next_brick_id: BrickId,
    selection: BTreeSet<BrickId>,
    snapshot: Option<Snapshot>,
}

impl World {
    /// Creates an empty world covering `grid_min..=grid_max`.
    #[must_use]
    pub fn new(id: WorldId, grid_min: Vec3i, grid_max: Vec3i) -> Self {
        Self {
            id,
            grid: Grid::new(grid_min, grid_max),
            bricks: BTreeMap::new(),
            next_brick_id: 1,
            selection: BTreeSet::new(),
            snapshot: None,
        }
    }

    /// Namespace id used when talking to the server.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> WorldId {
        self.id
    }

    /// Lowest grid cell.
    #[inline]
    #[must_use]
    pub const fn grid_min(&self) -> Vec3i {
        self.grid.min()
    }

    /// Highest grid cell (inclusive).
    #[inline]
    #[must_use]
    pub const fn grid_max(&self) -> Vec3i {
        self.grid.max()
    }

    /// Read access to the raw grid.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Id the next created brick will receive.
    #[must_use]
    pub const fn next_brick_id(&self) -> BrickId {
        self.next_brick_id
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Looks up a brick by id.
    #[must_use]
    pub fn brick(&self, id: BrickId) -> Option<&Brick> {
        self.bricks.get(&id)
    }

    /// True if `id` is a live brick.
    #[must_use]
    pub fn contains(&self, id: BrickId) -> bool {
        self.bricks.contains_key(&id)
    }

    /// Brick occupying `cell`. O(1).
    #[must_use]
    pub fn brick_at(&self, cell: Vec3i) -> Option<&Brick> {
        match self.grid.get(cell) {
            EMPTY_CELL => None,
            id => self.bricks.get(&id),
        }
    }

    /// First brick whose closed box contains `point`. O(n) in brick count.
    #[must_use]
    pub fn brick_containing(&self, point: Vec3d) -> Option<&Brick> {
        self.bricks.values().find(|brick| {
            let lo = brick.position.as_vec3d();
            let hi = brick.max_corner().as_vec3d();
            (0..3).all(|axis| point[axis] >= lo[axis] && point[axis] <= hi[axis])
        })
    }

    /// Live bricks in id order.
    pub fn bricks(&self) -> impl Iterator<Item = &Brick> {
        self.bricks.values()
    }

    /// Number of live bricks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bricks.len()
    }

    /// True if no bricks are placed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bricks.is_empty()
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// True if every footprint cell is empty or held by `exclude`.
    #[must_use]
    pub fn is_available(&self, position: Vec3i, size: Vec3i, exclude: Option<BrickId>) -> bool {
        self.grid.first_conflict(position, size, exclude).is_none()
    }

    /// Checks an operation against current contents without mutating.
    ///
    /// # Errors
    ///
    /// Returns the first reason the World would refuse the op.
    pub fn validate(&self, op: &Operation) -> Result<(), RejectReason> {
        let (position, size, exclude) = match *op {
            Operation::CreateBrick { position, size, .. } => (position, size, None),
            Operation::ModifyBrickPosition { brick_id, position } => {
                let brick = self.existing(brick_id)?;
                (position, brick.size, Some(brick_id))
            }
            Operation::ModifyBrickSize { brick_id, size } => {
                let brick = self.existing(brick_id)?;
                (brick.position, size, Some(brick_id))
            }
            Operation::ModifyBrickOrientation { brick_id, .. }
            | Operation::ModifyBrickColor { brick_id, .. }
            | Operation::DeleteBrick { brick_id } => {
                self.existing(brick_id)?;
                return Ok(());
            }
        };

        if !size.is_positive() {
            return Err(RejectReason::InvalidSize(size));
        }
        self.check_bounds(position, size)?;
        match self.grid.first_conflict(position, size, exclude) {
            None => Ok(()),
            Some((cell, occupant)) => Err(RejectReason::Collision { cell, occupant }),
        }
    }

    fn existing(&self, id: BrickId) -> Result<&Brick, RejectReason> {
        self.bricks.get(&id).ok_or(RejectReason::UnknownBrick(id))
    }

    /// `position` must be at least `grid_min` and `position + size` at most
    /// `grid_max` on every axis.
    fn check_bounds(&self, position: Vec3i, size: Vec3i) -> Result<(), RejectReason> {
        let (min, max) = (self.grid.min(), self.grid.max());
        for axis in 0..3 {
            let end = position[axis].checked_add(size[axis]);
            if position[axis] < min[axis] || end.map_or(true, |end| end > max[axis]) {
                return Err(RejectReason::OutOfBounds { position, size, axis });
            }
        }
        Ok(())
    }

    // =========================================================================
    // MUTATION
    // =========================================================================

    /// Applies an operation without validating it.
    ///
    /// Returns the id of the brick created or touched, or `None` if the op
    /// referenced a brick that does not exist (logged and ignored).
    pub fn apply(&mut self, op: &Operation) -> Option<BrickId> {
        self.apply_recorded(op).map(|(id, _)| id)
    }

    /// Validates then applies a single operation.
    ///
    /// # Errors
    ///
    /// Returns the rejection; the World is unchanged in that case.
    pub fn try_apply(&mut self, op: &Operation) -> Result<BrickId, RejectReason> {
        self.validate(op)?;
        self.apply(op).ok_or_else(|| RejectReason::UnknownBrick(op.brick_id().unwrap_or(0)))
    }

    /// Applies every op of `xa` in order, validating each against the state
    /// left by its predecessors. All or nothing.
    ///
    /// # Errors
    ///
    /// Returns the first rejection after rolling back the ops already applied.
    pub fn commit(&mut self, xa: &Transaction) -> Result<(), RejectReason> {
        self.commit_recorded(xa).map(drop)
    }

    /// Validates every op of `xa` in order, each against the state left by
    /// its predecessors, then puts everything back. Later ops may refer to
    /// bricks created earlier in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns the first rejection. The World is unchanged either way.
    pub fn check(&mut self, xa: &Transaction) -> Result<(), RejectReason> {
        let next_brick_id = self.next_brick_id;
        let selection = self.selection.clone();
        let undo = self.commit_recorded(xa)?;
        self.rollback(undo, next_brick_id);
        self.selection = selection;
        Ok(())
    }

    fn commit_recorded(&mut self, xa: &Transaction) -> Result<Vec<Undo>, RejectReason> {
        let next_brick_id = self.next_brick_id;
        let mut undo = Vec::with_capacity(xa.len());

        for op in xa {
            let applied = self
                .validate(op)
                .and_then(|()| {
                    self.apply_recorded(op)
                        .ok_or_else(|| RejectReason::UnknownBrick(op.brick_id().unwrap_or(0)))
                });
            match applied {
                Ok((_, step)) => undo.push(step),
                Err(reason) => {
                    self.rollback(undo, next_brick_id);
                    return Err(reason);
                }
            }
        }
        Ok(undo)
    }

    fn rollback(&mut self, undo: Vec<Undo>, next_brick_id: BrickId) {
        for step in undo.into_iter().rev() {
            self.revert(step);
        }
        self.next_brick_id = next_brick_id;
    }

    /// Applies every op of `xa` without validation.
    pub fn apply_transaction(&mut self, xa: &Transaction) {
        for op in xa {
            self.apply(op);
        }
    }

    fn apply_recorded(&mut self, op: &Operation) -> Option<(BrickId, Undo)> {
        match *op {
            Operation::CreateBrick { position, size, orientation, color } => {
                let id = self.next_brick_id;
                self.next_brick_id += 1;
                self.record(Brick::new(id, position, size, orientation, color));
                tracing::debug!("Created brick id {} at {}", id, position);
                Some((id, Undo::Created(id)))
            }
            Operation::DeleteBrick { brick_id } => {
                let brick = self.erase(brick_id)?;
                tracing::debug!("Destroyed brick id {}", brick_id);
                Some((brick_id, Undo::Deleted(brick)))
            }
            Operation::ModifyBrickPosition { brick_id, position } => {
                self.modify(brick_id, |b| b.position = position)
            }
            Operation::ModifyBrickSize { brick_id, size } => self.modify(brick_id, |b| b.size = size),
            Operation::ModifyBrickOrientation { brick_id, orientation } => {
                self.modify(brick_id, |b| b.orientation = orientation)
            }
            Operation::ModifyBrickColor { brick_id, color } => {
                self.modify(brick_id, |b| b.color = color)
            }
        }
    }

    fn modify(&mut self, id: BrickId, change: impl FnOnce(&mut Brick)) -> Option<(BrickId, Undo)> {
        let Some(brick) = self.bricks.get_mut(&id) else {
            tracing::warn!("Ignoring op on unknown brick id {}", id);
            return None;
        };
        let before = *brick;
        change(brick);
        let after = *brick;
        if before.position != after.position || before.size != after.size {
            self.grid.fill(before.position, before.size, EMPTY_CELL);
            self.grid.fill(after.position, after.size, id);
        }
        Some((id, Undo::Replaced(before)))
    }

    fn record(&mut self, brick: Brick) {
        self.grid.fill(brick.position, brick.size, brick.id());
        self.bricks.insert(brick.id(), brick);
    }

    fn erase(&mut self, id: BrickId) -> Option<Brick> {
        let Some(brick) = self.bricks.remove(&id) else {
            tracing::warn!("Ignoring delete of unknown brick id {}", id);
            return None;
        };
        self.grid.fill(brick.position, brick.size, EMPTY_CELL);
        self.selection.remove(&id);
        Some(brick)
    }

    fn revert(&mut self, step: Undo) {
        match step {
            Undo::Created(id) => {
                self.erase(id);
            }
            Undo::Deleted(brick) => self.record(brick),
            Undo::Replaced(before) => {
                if let Some(current) = self.bricks.get(&before.id()).copied() {
                    self.grid.fill(current.position, current.size, EMPTY_CELL);
                }
                self.record(before);
            }
        }
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    /// Adds a live brick to the selection. Returns false for unknown ids.
    pub fn select(&mut self, id: BrickId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.selection.insert(id);
        true
    }

    /// Removes a brick from the selection.
    pub fn deselect(&mut self, id: BrickId) -> bool {
        self.selection.remove(&id)
    }

    /// Empties the selection.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// True if `id` is selected.
    #[must_use]
    pub fn is_selected(&self, id: BrickId) -> bool {
        self.selection.contains(&id)
    }

    /// Selected ids in ascending order.
    #[must_use]
    pub fn selection(&self) -> Vec<BrickId> {
        self.selection.iter().copied().collect()
    }

    // =========================================================================
    // SNAPSHOT / RESTORE
    // =========================================================================

    /// Captures grid, registry and id counter, replacing any earlier snapshot.
    pub fn snapshot(&mut self) {
        self.snapshot = Some(Snapshot {
            grid: self.grid.clone(),
            bricks: self.bricks.clone(),
            next_brick_id: self.next_brick_id,
        });
        tracing::debug!("Snapshot taken: {} bricks", self.bricks.len());
    }

    /// Rolls back to the last snapshot and consumes it. Clears the selection.
    ///
    /// Returns false (and changes nothing) if no snapshot is held.
    pub fn restore(&mut self) -> bool {
        let Some(snapshot) = self.snapshot.take() else {
            return false;
        };
        self.grid = snapshot.grid;
        self.bricks = snapshot.bricks;
        self.next_brick_id = snapshot.next_brick_id;
        self.selection.clear();
        tracing::debug!("Restored snapshot: {} bricks", self.bricks.len());
        true
    }

    /// True while a snapshot is held.
    #[must_use]
    pub const fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brick::{Orientation, Palette};

    fn world() -> World {
        World::new(0, Vec3i::new(-31, -31, 0), Vec3i::new(32, 32, 63))
    }

    fn create(position: Vec3i, size: Vec3i) -> Operation {
        Operation::CreateBrick {
            position,
            size,
            orientation: Orientation::East,
            color: Palette::Red.rgb(),
        }
    }

    #[test]
    fn test_ids_are_sequential_from_one() {
        let mut w = world();
        assert_eq!(w.try_apply(&create(Vec3i::ZERO, Vec3i::ONE)), Ok(1));
        assert_eq!(w.try_apply(&create(Vec3i::new(5, 0, 0), Vec3i::ONE)), Ok(2));
        w.apply(&Operation::DeleteBrick { brick_id: 1 });
        assert_eq!(w.try_apply(&create(Vec3i::ZERO, Vec3i::ONE)), Ok(3));
    }

    #[test]
    fn test_validate_rejections() {
        let mut w = world();
        w.apply(&create(Vec3i::ZERO, Vec3i::new(2, 2, 1)));

        assert_eq!(
            w.validate(&create(Vec3i::ZERO, Vec3i::new(0, 1, 1))),
            Err(RejectReason::InvalidSize(Vec3i::new(0, 1, 1)))
        );
        assert!(matches!(
            w.validate(&create(Vec3i::new(-32, 0, 0), Vec3i::ONE)),
            Err(RejectReason::OutOfBounds { axis: 0, .. })
        ));
        assert_eq!(
            w.validate(&Operation::DeleteBrick { brick_id: 42 }),
            Err(RejectReason::UnknownBrick(42))
        );
        assert_eq!(
            w.validate(&create(Vec3i::new(1, 1, 0), Vec3i::ONE)),
            Err(RejectReason::Collision { cell: Vec3i::new(1, 1, 0), occupant: 1 })
        );
    }

    #[test]
    fn test_resize_excludes_self() {
        let mut w = world();
        w.apply(&create(Vec3i::ZERO, Vec3i::new(2, 2, 1)));
        let grow = Operation::ModifyBrickSize { brick_id: 1, size: Vec3i::new(3, 2, 1) };
        assert_eq!(w.try_apply(&grow), Ok(1));
        assert_eq!(w.grid().occupied(), 6);

        let shrink = Operation::ModifyBrickSize { brick_id: 1, size: Vec3i::ONE };
        w.try_apply(&shrink).unwrap();
        assert_eq!(w.grid().occupied(), 1);
        assert!(w.brick_at(Vec3i::new(2, 1, 0)).is_none());
    }

    #[test]
    fn test_commit_rolls_back() {
        let mut w = world();
        w.apply(&create(Vec3i::new(10, 10, 0), Vec3i::ONE));

        let xa = Transaction::from_ops(vec![
            create(Vec3i::ZERO, Vec3i::ONE),
            Operation::ModifyBrickPosition { brick_id: 1, position: Vec3i::new(0, 0, 5) },
            Operation::DeleteBrick { brick_id: 2 },
            create(Vec3i::new(0, 0, 5), Vec3i::ONE),
        ]);
        assert!(matches!(w.commit(&xa), Err(RejectReason::Collision { .. })));

        assert_eq!(w.len(), 1);
        assert_eq!(w.next_brick_id(), 2);
        assert_eq!(w.brick_at(Vec3i::new(10, 10, 0)).map(Brick::id), Some(1));
        assert_eq!(w.grid().occupied(), 1);
    }

    #[test]
    fn test_check_sees_earlier_ops_and_changes_nothing() {
        let mut w = world();
        w.apply(&create(Vec3i::new(10, 10, 0), Vec3i::ONE));
        w.select(1);
        let before: Vec<Brick> = w.bricks().copied().collect();

        // Brick 2 only exists once the first op has run.
        let xa = Transaction::from_ops(vec![
            create(Vec3i::ZERO, Vec3i::new(2, 2, 1)),
            Operation::ModifyBrickColor { brick_id: 2, color: Palette::Blue.rgb() },
            Operation::ModifyBrickPosition { brick_id: 2, position: Vec3i::new(0, 0, 3) },
            Operation::DeleteBrick { brick_id: 1 },
        ]);
        assert_eq!(xa.ops().iter().map(|op| w.validate(op)).filter(Result::is_err).count(), 2);
        assert_eq!(w.check(&xa), Ok(()));

        assert_eq!(w.bricks().copied().collect::<Vec<_>>(), before);
        assert_eq!(w.next_brick_id(), 2);
        assert_eq!(w.grid().occupied(), 1);
        assert_eq!(w.selection(), vec![1]);

        let bad = Transaction::from_ops(vec![
            create(Vec3i::ZERO, Vec3i::ONE),
            create(Vec3i::ZERO, Vec3i::ONE),
        ]);
        assert!(matches!(w.check(&bad), Err(RejectReason::Collision { .. })));
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn test_overflowing_extent_is_out_of_bounds() {
        let mut w = world();
        let huge: Operation = "CreateBrick 10 0 0 2147483647 1 1 1 1 0 0".parse().unwrap();
        assert!(matches!(w.validate(&huge), Err(RejectReason::OutOfBounds { axis: 0, .. })));

        w.apply(&create(Vec3i::ZERO, Vec3i::ONE));
        let far = Operation::ModifyBrickPosition { brick_id: 1, position: Vec3i::new(0, i32::MAX, 0) };
        assert!(matches!(w.validate(&far), Err(RejectReason::OutOfBounds { axis: 1, .. })));
        let wide = Operation::ModifyBrickSize { brick_id: 1, size: Vec3i::new(1, 1, i32::MAX) };
        assert!(matches!(w.validate(&wide), Err(RejectReason::OutOfBounds { axis: 2, .. })));

        // Unvalidated replay only ever touches cells inside the grid.
        assert!(!w.is_available(Vec3i::new(-40, -40, 0), Vec3i::splat(i32::MAX), None));
        w.apply(&huge);
        assert_eq!(w.grid().occupied(), 1 + 23);
    }

    #[test]
    fn test_selection_follows_deletes() {
        let mut w = world();
        w.apply(&create(Vec3i::ZERO, Vec3i::ONE));
        assert!(w.select(1));
        assert!(!w.select(7));
        w.apply(&Operation::DeleteBrick { brick_id: 1 });
        assert!(w.selection().is_empty());
    }

    #[test]
    fn test_snapshot_restore() {
        let mut w = world();
        w.apply(&create(Vec3i::ZERO, Vec3i::ONE));
        w.snapshot();
        w.apply(&create(Vec3i::new(3, 0, 0), Vec3i::ONE));
        w.apply(&Operation::DeleteBrick { brick_id: 1 });
        w.select(2);

        assert!(w.restore());
        assert_eq!(w.len(), 1);
        assert!(w.contains(1));
        assert_eq!(w.next_brick_id(), 2);
        assert!(w.selection().is_empty());
        assert!(!w.has_snapshot());
        assert!(!w.restore());
    }

    #[test]
    fn test_brick_containing_scans_closed_boxes() {
        let mut w = world();
        w.apply(&create(Vec3i::new(2, 2, 0), Vec3i::new(2, 2, 1)));
        assert_eq!(w.brick_containing(Vec3d::new(4.0, 3.5, 1.0)).map(Brick::id), Some(1));
        assert!(w.brick_containing(Vec3d::new(4.5, 3.0, 0.5)).is_none());
    }
}
