//! # Triangle Mesh
//!
//! The value type a mesh reader hands to the voxelizer: a vertex list and a
//! list of index triples. Reading and writing mesh files happens elsewhere.

use bricklayer_shared::{BBox3d, Vec3d};

use crate::error::{VoxelError, VoxelResult};

/// Indexed triangle mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangleMesh {
    vertices: Vec<Vec3d>,
    triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Builds a mesh, checking every index.
    ///
    /// # Errors
    ///
    /// [`VoxelError::IndexOutOfRange`] for a triangle pointing past the vertex list.
    pub fn new(vertices: Vec<Vec3d>, triangles: Vec<[u32; 3]>) -> VoxelResult<Self> {
        let mesh = Self { vertices, triangles };
        mesh.check_indices()?;
        Ok(mesh)
    }

    /// Builds a mesh from flat `xyz xyz ...` and `abc abc ...` buffers, the
    /// layout most mesh readers produce.
    ///
    /// # Errors
    ///
    /// Ragged buffers or out-of-range indices.
    pub fn from_flat(positions: &[f64], indices: &[u32]) -> VoxelResult<Self> {
        if positions.len() % 3 != 0 {
            return Err(VoxelError::RaggedBuffer(positions.len()));
        }
        if indices.len() % 3 != 0 {
            return Err(VoxelError::RaggedBuffer(indices.len()));
        }
        let vertices: &[Vec3d] = bytemuck::cast_slice(positions);
        let triangles: &[[u32; 3]] = bytemuck::cast_slice(indices);
        Self::new(vertices.to_vec(), triangles.to_vec())
    }

    /// Axis-aligned box `[min, max]` as a closed mesh wound outward, two
    /// triangles per face.
    #[must_use]
    pub fn cuboid(min: Vec3d, max: Vec3d) -> Self {
        let vertices = (0..8)
            .map(|i| {
                Vec3d::new(
                    if i & 1 == 0 { min.x } else { max.x },
                    if i & 2 == 0 { min.y } else { max.y },
                    if i & 4 == 0 { min.z } else { max.z },
                )
            })
            .collect();
        let triangles = vec![
            // -x, +x
            [0, 4, 6], [0, 6, 2],
            [1, 3, 7], [1, 7, 5],
            // -y, +y
            [0, 1, 5], [0, 5, 4],
            [2, 6, 7], [2, 7, 3],
            // -z, +z
            [0, 2, 3], [0, 3, 1],
            [4, 5, 7], [4, 7, 6],
        ];
        Self { vertices, triangles }
    }

    /// Vertex positions.
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[Vec3d] {
        &self.vertices
    }

    /// Index triples into [`vertices`](Self::vertices).
    #[inline]
    #[must_use]
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// True if there is nothing to voxelize.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Corner positions of triangle `index`.
    ///
    /// Indices were checked on construction.
    #[must_use]
    pub fn triangle(&self, index: usize) -> [Vec3d; 3] {
        let [a, b, c] = self.triangles[index];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Bounds of every vertex referenced by a triangle.
    #[must_use]
    pub fn bbox(&self) -> BBox3d {
        BBox3d::from_points((0..self.triangles.len()).flat_map(|t| self.triangle(t)))
    }

    /// Triangles with a repeated index or two coincident corners.
    ///
    /// Diagnostic only; a degenerate triangle never produces a ray hit.
    #[must_use]
    pub fn degenerate_triangles(&self) -> Vec<usize> {
        (0..self.triangles.len())
            .filter(|&t| {
                let [a, b, c] = self.triangles[t];
                let [p, q, r] = self.triangle(t);
                a == b || b == c || a == c || p == q || q == r || p == r
            })
            .collect()
    }

    fn check_indices(&self) -> VoxelResult<()> {
        let vertex_count = self.vertices.len();
        for (triangle, corners) in self.triangles.iter().enumerate() {
            if let Some(&index) = corners.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(VoxelError::IndexOutOfRange { triangle, index, vertex_count });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_is_closed() {
        let mesh = TriangleMesh::cuboid(Vec3d::ZERO, Vec3d::splat(10.0));
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.bbox().size(), Vec3d::splat(10.0));
        assert!(mesh.degenerate_triangles().is_empty());

        // Every edge is shared by exactly two triangles.
        let mut edges = std::collections::HashMap::new();
        for [a, b, c] in mesh.triangles() {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                *edges.entry((u.min(v), u.max(v))).or_insert(0) += 1;
            }
        }
        assert!(edges.values().all(|&n| n == 2));
    }

    #[test]
    fn test_from_flat() {
        let mesh = TriangleMesh::from_flat(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            &[0, 1, 2],
        )
        .unwrap();
        assert_eq!(mesh.triangle(0)[1], Vec3d::new(1.0, 0.0, 0.0));

        assert!(matches!(
            TriangleMesh::from_flat(&[0.0, 1.0], &[]),
            Err(VoxelError::RaggedBuffer(2))
        ));
    }

    #[test]
    fn test_index_out_of_range() {
        let err = TriangleMesh::new(vec![Vec3d::ZERO; 3], vec![[0, 1, 3]]).unwrap_err();
        assert!(matches!(err, VoxelError::IndexOutOfRange { triangle: 0, index: 3, vertex_count: 3 }));
    }

    #[test]
    fn test_degenerate_triangles_reported() {
        let mesh = TriangleMesh::new(
            vec![Vec3d::ZERO, Vec3d::X, Vec3d::X, Vec3d::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 3], [0, 1, 1], [0, 1, 2]],
        )
        .unwrap();
        assert_eq!(mesh.degenerate_triangles(), vec![1, 2]);
    }
}
