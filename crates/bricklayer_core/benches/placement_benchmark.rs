//! Placement validation and application benchmarks.
//!
//! Run with: cargo bench --package bricklayer_core

use bricklayer_core::{Operation, Orientation, Palette, World};
use bricklayer_shared::Vec3i;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn filled_world() -> World {
    let mut world = World::new(0, Vec3i::new(-31, -31, 0), Vec3i::new(32, 32, 63));
    for z in 0..8 {
        for y in (-30..30).step_by(2) {
            for x in (-30..30).step_by(2) {
                world.apply(&Operation::CreateBrick {
                    position: Vec3i::new(x, y, z),
                    size: Vec3i::new(2, 2, 1),
                    orientation: Orientation::East,
                    color: Palette::Red.rgb(),
                });
            }
        }
    }
    world
}

fn bench_validate(c: &mut Criterion) {
    let world = filled_world();
    let free = Operation::CreateBrick {
        position: Vec3i::new(0, 0, 20),
        size: Vec3i::new(4, 4, 4),
        orientation: Orientation::North,
        color: Palette::Blue.rgb(),
    };
    let blocked = Operation::ModifyBrickPosition { brick_id: 1, position: Vec3i::new(4, 4, 4) };

    let mut group = c.benchmark_group("validate");
    group.throughput(Throughput::Elements(1));
    group.bench_function("create_free_4x4x4", |b| b.iter(|| world.validate(black_box(&free))));
    group.bench_function("move_blocked", |b| b.iter(|| world.validate(black_box(&blocked))));
    group.finish();
}

fn bench_apply(c: &mut Criterion) {
    c.bench_function("create_then_delete", |b| {
        let mut world = filled_world();
        b.iter(|| {
            let id = world.apply(&Operation::CreateBrick {
                position: Vec3i::new(0, 0, 30),
                size: Vec3i::new(2, 2, 1),
                orientation: Orientation::East,
                color: Palette::Green.rgb(),
            });
            if let Some(brick_id) = id {
                world.apply(&Operation::DeleteBrick { brick_id });
            }
        });
    });

    c.bench_function("snapshot_restore", |b| {
        let mut world = filled_world();
        b.iter(|| {
            world.snapshot();
            black_box(world.restore());
        });
    });
}

criterion_group!(benches, bench_validate, bench_apply);
criterion_main!(benches);
