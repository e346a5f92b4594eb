//! Voxelization benchmarks.
//!
//! Run with: cargo bench --package bricklayer_voxel

use bricklayer_shared::{Vec3d, Vec3i};
use bricklayer_voxel::{TriangleMesh, Voxelizer};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_voxelize_cube(c: &mut Criterion) {
    let mesh = TriangleMesh::cuboid(Vec3d::ZERO, Vec3d::splat(10.0));
    let voxelizer = Voxelizer::default();

    let mut group = c.benchmark_group("voxelize_cube");
    for units in [8u32, 16, 32, 62] {
        group.bench_with_input(BenchmarkId::from_parameter(units), &units, |b, &units| {
            b.iter(|| voxelizer.voxelize(black_box(&mesh), units));
        });
    }
    group.finish();
}

fn bench_emit_operations(c: &mut Criterion) {
    let mesh = TriangleMesh::cuboid(Vec3d::ZERO, Vec3d::new(20.0, 10.0, 5.0));
    let voxelizer = Voxelizer::default();
    let Ok(voxels) = voxelizer.voxelize(&mesh, 62) else {
        return;
    };

    c.bench_function("emit_operations", |b| {
        b.iter(|| voxelizer.operations(black_box(&voxels), Vec3i::new(-31, -31, 0)));
    });
}

criterion_group!(benches, bench_voxelize_cube, bench_emit_operations);
criterion_main!(benches);
