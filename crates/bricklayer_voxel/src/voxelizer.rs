//! # Ray-Parity Voxelizer
//!
//! Turns a closed triangle mesh into a solid set of voxels, then into one
//! `CreateBrick` per voxel.
//!
//! ## Pipeline
//!
//! ```text
//! bbox ──> cell counts ──> bin triangles ──> sweep +x rays ──> inside set
//!          (longest axis     (bbox range,      (parity per        │
//!           = max units,      then SAT)         column)           v
//!           x/y halved)                                     CreateBrick ops
//! ```
//!
//! Each voxel is 2x2x1 grid cells once placed, so the x and y cell counts
//! are halved to keep the mesh's proportions in brick space.
//!
//! One ray per (y, z) column starts at the low x face of each voxel and
//! spans exactly one voxel, so hit depths inside the voxel fall in `[0, 1)`.
//! Crossings before the voxel center toggle parity before the voxel is
//! classified; crossings after it toggle parity for the next one.

use bricklayer_core::{Operation, Palette};
use bricklayer_networking::{Execution, ReplicationError, TransactionManager};
use bricklayer_shared::constants::STANDARD_BRICK_SIZE;
use bricklayer_shared::{BBox3d, Ray3d, Vec3d, Vec3i};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::VoxelizerConfig;
use crate::error::{VoxelError, VoxelResult};
use crate::mesh::TriangleMesh;

/// Largest accepted voxel count along a mesh's longest axis.
pub const MAX_RESOLUTION: u32 = 256;

/// Empty voxels on each side of the mesh, so every column starts and ends
/// outside.
const PADDING: i32 = 1;

// =============================================================================
// VOXELIZATION RESULT
// =============================================================================

/// Solid voxel set produced from one mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct Voxelization {
    dims: Vec3i,
    voxel_size: Vec3d,
    origin: Vec3d,
    inside: Vec<bool>,
    runaway: Vec<(i32, i32)>,
}

impl Voxelization {
    /// Voxel grid dimensions, including one voxel of padding on each side.
    #[must_use]
    pub const fn dims(&self) -> Vec3i {
        self.dims
    }

    /// Extent of one voxel in mesh units.
    #[must_use]
    pub const fn voxel_size(&self) -> Vec3d {
        self.voxel_size
    }

    /// Mesh-space position of voxel (0, 0, 0)'s minimum corner, one voxel
    /// below the mesh's bounding box on every axis.
    #[must_use]
    pub const fn origin(&self) -> Vec3d {
        self.origin
    }

    /// Returns true if voxel `v` is inside the mesh. Out of range is outside.
    #[must_use]
    pub fn is_inside(&self, v: Vec3i) -> bool {
        index(self.dims, v).is_some_and(|i| self.inside[i])
    }

    /// Inside voxels, x outermost, z innermost.
    pub fn inside_voxels(&self) -> impl Iterator<Item = Vec3i> + '_ {
        let dims = self.dims;
        self.inside.iter().enumerate().filter(|&(_, &inside)| inside).map(move |(i, _)| {
            let i = i as i32;
            Vec3i::new(i / (dims.y * dims.z), (i / dims.z) % dims.y, i % dims.z)
        })
    }

    /// Number of inside voxels.
    #[must_use]
    pub fn inside_count(&self) -> usize {
        self.inside.iter().filter(|&&inside| inside).count()
    }

    /// (y, z) columns whose ray was still inside after the last voxel.
    #[must_use]
    pub fn runaway_columns(&self) -> &[(i32, i32)] {
        &self.runaway
    }

    /// True if no column ran away.
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        self.runaway.is_empty()
    }
}

#[inline]
fn index(dims: Vec3i, v: Vec3i) -> Option<usize> {
    let in_range = (0..dims.x).contains(&v.x) && (0..dims.y).contains(&v.y) && (0..dims.z).contains(&v.z);
    in_range.then(|| ((v.x * dims.y + v.y) * dims.z + v.z) as usize)
}

/// What [`Voxelizer::populate`] did with the bricks.
#[derive(Clone, Debug, Default)]
pub struct ImportReport {
    /// Ops accepted into the import transaction.
    pub accumulated: usize,
    /// Ops applied straight to the local World because the client is offline.
    pub applied_offline: usize,
    /// Ops the local World refused (out of bounds or colliding).
    pub rejected: usize,
    /// How the transaction was handed off. `None` when nothing was accepted.
    pub execution: Option<Execution>,
}

// =============================================================================
// VOXELIZER
// =============================================================================

/// Mesh to brick converter.
#[derive(Clone, Debug, Default)]
pub struct Voxelizer {
    config: VoxelizerConfig,
}

impl Voxelizer {
    /// Creates a voxelizer.
    #[must_use]
    pub fn new(config: VoxelizerConfig) -> Self {
        Self { config }
    }

    /// Settings in use.
    #[must_use]
    pub fn config(&self) -> &VoxelizerConfig {
        &self.config
    }

    /// Computes the solid voxel set of `mesh` with `max_units` voxels along
    /// its longest axis (before the x/y halving).
    ///
    /// # Errors
    ///
    /// Empty mesh, a resolution of zero or above [`MAX_RESOLUTION`], or a
    /// mesh flat along some axis.
    pub fn voxelize(&self, mesh: &TriangleMesh, max_units: u32) -> VoxelResult<Voxelization> {
        if mesh.is_empty() {
            return Err(VoxelError::EmptyMesh);
        }
        if max_units == 0 || max_units > MAX_RESOLUTION {
            return Err(VoxelError::InvalidResolution(max_units));
        }

        let bbox = mesh.bbox();
        let size = bbox.size();
        for axis in 0..3 {
            if size[axis] <= 0.0 {
                return Err(VoxelError::DegenerateBounds { axis, extent: size[axis] });
            }
        }

        let cells = cell_counts(size, max_units);
        let voxel_size = Vec3d::new(
            size.x / f64::from(cells.x),
            size.y / f64::from(cells.y),
            size.z / f64::from(cells.z),
        );
        let dims = cells + Vec3i::splat(2 * PADDING);
        let origin = bbox.min() - voxel_size * f64::from(PADDING);

        tracing::info!("Mesh bbox: {}", bbox);
        tracing::info!("Grid size: {}x{}x{}", dims.x, dims.y, dims.z);
        tracing::info!("Voxel size: {}", voxel_size);

        let degenerate = mesh.degenerate_triangles();
        if !degenerate.is_empty() {
            tracing::warn!("Mesh has {} degenerate triangles", degenerate.len());
        }

        let grid = VoxelGrid { dims, voxel_size, origin };
        let bins = grid.bin(mesh);
        let (inside, runaway) = grid.sweep(mesh, &bins, self.config.epsilon);

        let voxelization = Voxelization { dims, voxel_size, origin, inside, runaway };
        tracing::info!(
            "Voxelized {} triangles into {} solid voxels",
            mesh.triangle_count(),
            voxelization.inside_count()
        );
        Ok(voxelization)
    }

    /// One `CreateBrick` per inside voxel. The voxel at the mesh's minimum
    /// corner lands on `placement_origin`; the others follow at
    /// `(2x, 2y, z)` steps.
    #[must_use]
    pub fn operations(&self, voxelization: &Voxelization, placement_origin: Vec3i) -> Vec<Operation> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        voxelization
            .inside_voxels()
            .map(|v| {
                let v = v - Vec3i::splat(PADDING);
                let color = self.config.palette.choose(&mut rng).copied().unwrap_or(Palette::Red);
                Operation::CreateBrick {
                    position: placement_origin + Vec3i::new(2 * v.x, 2 * v.y, v.z),
                    size: STANDARD_BRICK_SIZE,
                    orientation: self.config.orientation,
                    color: color.rgb(),
                }
            })
            .collect()
    }

    /// Submits the bricks of `voxelization` as one transaction.
    ///
    /// Bricks the local World refuses are counted and skipped; the rest go
    /// out together.
    ///
    /// # Errors
    ///
    /// A transaction is already open, or the manager has shut down.
    pub fn populate(
        &self,
        voxelization: &Voxelization,
        manager: &TransactionManager,
        placement_origin: Vec3i,
    ) -> VoxelResult<ImportReport> {
        let ops = self.operations(voxelization, placement_origin);
        let mut report = ImportReport::default();

        manager.open_transaction()?;
        for op in ops {
            match manager.execute_op(op) {
                Ok(Execution::AppliedOffline) => report.applied_offline += 1,
                Ok(_) => report.accumulated += 1,
                Err(ReplicationError::Rejected(reason)) => {
                    tracing::debug!("Skipping voxel brick: {}", reason);
                    report.rejected += 1;
                }
                Err(e) => {
                    manager.abort_transaction();
                    return Err(e.into());
                }
            }
        }

        if report.accumulated == 0 {
            manager.abort_transaction();
            if report.applied_offline > 0 {
                report.execution = Some(Execution::AppliedOffline);
            }
        } else {
            report.execution = Some(manager.close_transaction()?);
        }

        if report.rejected > 0 {
            tracing::warn!("{} voxel bricks did not fit the World", report.rejected);
        }
        tracing::info!(
            "Import: {} bricks batched, {} applied offline, {} rejected",
            report.accumulated,
            report.applied_offline,
            report.rejected
        );
        Ok(report)
    }

    /// [`voxelize`](Self::voxelize) then [`populate`](Self::populate).
    ///
    /// # Errors
    ///
    /// Anything either step reports.
    pub fn import(
        &self,
        mesh: &TriangleMesh,
        max_units: u32,
        manager: &TransactionManager,
        placement_origin: Vec3i,
    ) -> VoxelResult<ImportReport> {
        let voxelization = self.voxelize(mesh, max_units)?;
        self.populate(&voxelization, manager, placement_origin)
    }
}

/// Voxels per axis: `max_units` on the longest axis, the others in
/// proportion, then x and y halved. Never below one.
fn cell_counts(size: Vec3d, max_units: u32) -> Vec3i {
    let longest = size.x.max(size.y).max(size.z);
    let scaled = |extent: f64| ((extent / longest * f64::from(max_units)) as i32).max(1);
    Vec3i::new(
        (scaled(size.x) / 2).max(1),
        (scaled(size.y) / 2).max(1),
        scaled(size.z),
    )
}

// =============================================================================
// GRID WALK
// =============================================================================

struct VoxelGrid {
    dims: Vec3i,
    voxel_size: Vec3d,
    origin: Vec3d,
}

impl VoxelGrid {
    fn voxel_box(&self, v: Vec3i) -> BBox3d {
        let min = self.origin
            + Vec3d::new(
                f64::from(v.x) * self.voxel_size.x,
                f64::from(v.y) * self.voxel_size.y,
                f64::from(v.z) * self.voxel_size.z,
            );
        BBox3d::new(min, min + self.voxel_size)
    }

    /// Voxel coordinate containing `p` along `axis`, clamped into the grid.
    fn cell_of(&self, p: Vec3d, axis: usize) -> i32 {
        let t = ((p[axis] - self.origin[axis]) / self.voxel_size[axis]).floor() as i32;
        t.clamp(0, self.dims[axis] - 1)
    }

    /// Triangle indices per voxel: every voxel in the triangle's bbox range
    /// that the triangle actually touches.
    fn bin(&self, mesh: &TriangleMesh) -> Vec<Vec<u32>> {
        let cells = (self.dims.x * self.dims.y * self.dims.z) as usize;
        let mut bins = vec![Vec::new(); cells];

        for t in 0..mesh.triangle_count() {
            let tri = mesh.triangle(t);
            let tri_box = BBox3d::from_points(tri);
            let lo = tri_box.min();
            let hi = tri_box.max();

            for x in self.cell_of(lo, 0)..=self.cell_of(hi, 0) {
                for y in self.cell_of(lo, 1)..=self.cell_of(hi, 1) {
                    for z in self.cell_of(lo, 2)..=self.cell_of(hi, 2) {
                        let v = Vec3i::new(x, y, z);
                        if !self.voxel_box(v).intersects_triangle(tri) {
                            continue;
                        }
                        if let Some(i) = index(self.dims, v) {
                            bins[i].push(t as u32);
                        }
                    }
                }
            }
        }
        bins
    }

    /// Parity sweep along +x for every (y, z) column.
    fn sweep(&self, mesh: &TriangleMesh, bins: &[Vec<u32>], epsilon: f64) -> (Vec<bool>, Vec<(i32, i32)>) {
        let mut inside_set = vec![false; bins.len()];
        let mut runaway = Vec::new();
        // Column a triangle was last counted in, so a triangle binned into
        // several voxels of one column crosses it once.
        let mut counted_in = vec![usize::MAX; mesh.triangle_count()];
        let direction = Vec3d::new(self.voxel_size.x, 0.0, 0.0);
        let mut depths = Vec::new();

        for y in 0..self.dims.y {
            for z in 0..self.dims.z {
                let column = (y * self.dims.z + z) as usize;
                let center = self.voxel_box(Vec3i::new(0, y, z)).center();
                let mut inside = false;

                for x in 0..self.dims.x {
                    let v = Vec3i::new(x, y, z);
                    let Some(i) = index(self.dims, v) else { continue };
                    if bins[i].is_empty() {
                        inside_set[i] = inside;
                        continue;
                    }

                    let origin = Vec3d::new(self.voxel_box(v).min().x, center.y, center.z);
                    let ray = Ray3d::new(origin, direction);

                    depths.clear();
                    for &t in &bins[i] {
                        let t = t as usize;
                        if counted_in[t] == column {
                            continue;
                        }
                        match ray.triangle_intersection(mesh.triangle(t), epsilon) {
                            Some(depth) if (0.0..1.0).contains(&depth) => {
                                counted_in[t] = column;
                                depths.push(depth);
                            }
                            _ => {}
                        }
                    }

                    // Triangles meeting at an edge or vertex are one crossing.
                    depths.sort_by(f64::total_cmp);
                    depths.dedup_by(|a, b| (*a - *b).abs() <= epsilon);

                    let before = depths.iter().filter(|&&d| d < 0.5).count();
                    let after = depths.len() - before;
                    if before % 2 == 1 {
                        inside = !inside;
                    }
                    inside_set[i] = inside;
                    if after % 2 == 1 {
                        inside = !inside;
                    }
                }

                if inside {
                    tracing::warn!("Runaway voxels for (y, z): {}, {}", y, z);
                    runaway.push((y, z));
                }
            }
        }
        (inside_set, runaway)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(edge: f64) -> TriangleMesh {
        TriangleMesh::cuboid(Vec3d::ZERO, Vec3d::splat(edge))
    }

    #[test]
    fn test_cell_counts_keep_proportions() {
        assert_eq!(cell_counts(Vec3d::splat(10.0), 10), Vec3i::new(5, 5, 10));
        assert_eq!(cell_counts(Vec3d::new(20.0, 10.0, 5.0), 16), Vec3i::new(8, 4, 4));
        // Thin axes still get one voxel.
        assert_eq!(cell_counts(Vec3d::new(1.0, 100.0, 1.0), 10), Vec3i::new(1, 5, 1));
    }

    #[test]
    fn test_cube_fills_exactly_its_interior() {
        let v = Voxelizer::default().voxelize(&cube(10.0), 10).unwrap();
        assert_eq!(v.dims(), Vec3i::new(7, 7, 12));
        assert_eq!(v.voxel_size(), Vec3d::new(2.0, 2.0, 1.0));
        assert!(v.is_watertight());
        assert_eq!(v.inside_count(), 5 * 5 * 10);

        assert_eq!(v.origin(), Vec3d::new(-2.0, -2.0, -1.0));

        let inner = |c: i32, n: i32| (1..=n).contains(&c);
        for voxel in v.inside_voxels() {
            assert!(inner(voxel.x, 5) && inner(voxel.y, 5) && inner(voxel.z, 10), "{voxel} outside the cube");
        }
        assert!(v.is_inside(Vec3i::ONE));
        assert!(v.is_inside(Vec3i::new(5, 5, 10)));
        // Padding on both sides.
        assert!(!v.is_inside(Vec3i::ZERO));
        assert!(!v.is_inside(Vec3i::new(0, 3, 3)));
        assert!(!v.is_inside(Vec3i::new(3, 3, 0)));
        assert!(!v.is_inside(Vec3i::new(6, 3, 3)));
        assert!(!v.is_inside(Vec3i::new(3, 3, 11)));
        assert!(!v.is_inside(Vec3i::new(-1, 0, 0)));
    }

    #[test]
    fn test_ray_through_shared_edge_counts_once() {
        // Column (1, 1) passes exactly along the face diagonals of this box.
        let mesh = TriangleMesh::cuboid(Vec3d::ZERO, Vec3d::new(4.0, 4.0, 2.0));
        let v = Voxelizer::default().voxelize(&mesh, 4).unwrap();
        assert!(v.is_watertight());
        assert_eq!(v.inside_count(), 8);
        assert!(v.is_inside(Vec3i::ONE));
    }

    #[test]
    fn test_open_mesh_reports_runaway_columns() {
        let closed = cube(10.0);
        // Drop the +x face: the triangles whose corners all have x = max.
        let triangles = closed
            .triangles()
            .iter()
            .copied()
            .filter(|t| !t.iter().all(|&i| i & 1 == 1))
            .collect();
        let open = TriangleMesh::new(closed.vertices().to_vec(), triangles).unwrap();

        let v = Voxelizer::default().voxelize(&open, 10).unwrap();
        assert!(!v.is_watertight());
        assert_eq!(v.runaway_columns().len(), 5 * 10);
    }

    #[test]
    fn test_rejects_bad_input() {
        let voxelizer = Voxelizer::default();
        assert!(matches!(voxelizer.voxelize(&TriangleMesh::default(), 10), Err(VoxelError::EmptyMesh)));
        assert!(matches!(voxelizer.voxelize(&cube(1.0), 0), Err(VoxelError::InvalidResolution(0))));
        let rod = TriangleMesh::cuboid(Vec3d::ZERO, Vec3d::new(256.0, 1.0, 1.0));
        let at_cap = voxelizer.voxelize(&rod, MAX_RESOLUTION).unwrap();
        assert_eq!(at_cap.dims(), Vec3i::new(130, 3, 3));
        for units in [MAX_RESOLUTION + 1, u32::MAX] {
            assert!(matches!(
                voxelizer.voxelize(&cube(1.0), units),
                Err(VoxelError::InvalidResolution(u)) if u == units
            ));
        }

        let flat = TriangleMesh::new(
            vec![Vec3d::ZERO, Vec3d::X, Vec3d::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 2]],
        )
        .unwrap();
        assert!(matches!(voxelizer.voxelize(&flat, 10), Err(VoxelError::DegenerateBounds { axis: 2, .. })));
    }

    #[test]
    fn test_operations_are_placed_and_seeded() {
        let voxelizer = Voxelizer::new(VoxelizerConfig { seed: 7, ..VoxelizerConfig::default() });
        let v = voxelizer.voxelize(&cube(10.0), 10).unwrap();
        let origin = Vec3i::new(-10, -10, 0);
        let ops = voxelizer.operations(&v, origin);
        assert_eq!(ops.len(), 250);

        match ops[0] {
            Operation::CreateBrick { position, size, .. } => {
                assert_eq!(position, origin);
                assert_eq!(size, Vec3i::new(2, 2, 1));
            }
            other => panic!("unexpected op {other:?}"),
        }
        match ops[249] {
            Operation::CreateBrick { position, .. } => assert_eq!(position, Vec3i::new(-2, -2, 9)),
            other => panic!("unexpected op {other:?}"),
        }

        assert_eq!(ops, voxelizer.operations(&v, origin));
    }
}
