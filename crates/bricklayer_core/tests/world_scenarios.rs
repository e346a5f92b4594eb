//! World placement scenarios and grid invariants.

use bricklayer_core::{
    Brick, Operation, Orientation, Palette, RejectReason, Transaction, World, EMPTY_CELL,
};
use bricklayer_shared::{Vec3f, Vec3i};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn default_world() -> World {
    World::new(0, Vec3i::new(-31, -31, 0), Vec3i::new(32, 32, 63))
}

fn create(position: Vec3i, size: Vec3i, orientation: Orientation, color: Palette) -> Operation {
    Operation::CreateBrick { position, size, orientation, color: color.rgb() }
}

/// Every occupied cell must belong to a live brick that covers it, and every
/// brick must own all of its cells.
fn assert_grid_consistent(world: &World) {
    let grid = world.grid();
    let min = grid.min();
    let dims = grid.dims();
    let mut owned = 0usize;
    for z in 0..dims.z {
        for y in 0..dims.y {
            for x in 0..dims.x {
                let cell = min + Vec3i::new(x, y, z);
                let id = grid.get(cell);
                if id == EMPTY_CELL {
                    continue;
                }
                owned += 1;
                let brick = world.brick(id).expect("grid references a dead brick");
                assert!(brick.covers(cell), "brick {id} does not cover {cell}");
            }
        }
    }
    let expected: i64 = world.bricks().map(|b| b.size.volume()).sum();
    assert_eq!(owned as i64, expected);
}

#[test]
fn test_scenario_a_create_fills_footprint() {
    let mut world = default_world();
    let op = create(Vec3i::ZERO, Vec3i::new(2, 2, 1), Orientation::East, Palette::Red);
    let id = world.try_apply(&op).unwrap();

    for cell in [
        Vec3i::new(0, 0, 0),
        Vec3i::new(1, 0, 0),
        Vec3i::new(0, 1, 0),
        Vec3i::new(1, 1, 0),
    ] {
        assert_eq!(world.grid().get(cell), id);
    }
    assert_eq!(world.grid().occupied(), 4);
    assert_grid_consistent(&world);
}

#[test]
fn test_scenario_b_overlap_is_rejected() {
    let mut world = default_world();
    let first = world
        .try_apply(&create(Vec3i::ZERO, Vec3i::new(2, 2, 1), Orientation::East, Palette::Red))
        .unwrap();

    let overlap = create(Vec3i::new(1, 1, 0), Vec3i::ONE, Orientation::North, Palette::Blue);
    assert_eq!(
        world.validate(&overlap),
        Err(RejectReason::Collision { cell: Vec3i::new(1, 1, 0), occupant: first })
    );
    assert_eq!(world.len(), 1);
}

#[test]
fn test_scenario_c_move_vacates_and_occupies() {
    let mut world = default_world();
    let id = world
        .try_apply(&create(Vec3i::ZERO, Vec3i::new(2, 2, 1), Orientation::East, Palette::Red))
        .unwrap();

    let up = Operation::ModifyBrickPosition { brick_id: id, position: Vec3i::new(0, 0, 1) };
    world.try_apply(&up).unwrap();

    for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        assert_eq!(world.grid().get(Vec3i::new(x, y, 0)), EMPTY_CELL);
        assert_eq!(world.grid().get(Vec3i::new(x, y, 1)), id);
    }
    assert_grid_consistent(&world);
}

#[test]
fn test_scenario_c_move_onto_other_brick_fails() {
    let mut world = default_world();
    let id = world
        .try_apply(&create(Vec3i::ZERO, Vec3i::new(2, 2, 1), Orientation::East, Palette::Red))
        .unwrap();
    world
        .try_apply(&create(Vec3i::new(1, 1, 1), Vec3i::ONE, Orientation::North, Palette::Green))
        .unwrap();

    let up = Operation::ModifyBrickPosition { brick_id: id, position: Vec3i::new(0, 0, 1) };
    assert!(matches!(world.try_apply(&up), Err(RejectReason::Collision { .. })));
    assert_eq!(world.brick(id).map(|b| b.position), Some(Vec3i::ZERO));
}

#[test]
fn test_move_may_overlap_own_footprint() {
    let mut world = default_world();
    let id = world
        .try_apply(&create(Vec3i::ZERO, Vec3i::new(2, 2, 1), Orientation::East, Palette::Red))
        .unwrap();
    let slide = Operation::ModifyBrickPosition { brick_id: id, position: Vec3i::new(1, 0, 0) };
    world.try_apply(&slide).unwrap();
    assert_eq!(world.grid().get(Vec3i::ZERO), EMPTY_CELL);
    assert_eq!(world.grid().get(Vec3i::new(2, 1, 0)), id);
    assert_grid_consistent(&world);
}

#[test]
fn test_boundary_fill_to_max_succeeds() {
    let min = Vec3i::new(-31, -31, 0);
    let max = Vec3i::new(32, 32, 63);
    let mut world = World::new(0, min, max);

    let whole = create(min, max - min, Orientation::North, Palette::White);
    assert_eq!(world.validate(&whole), Ok(()));
    world.apply(&whole);
    assert_eq!(world.grid().occupied() as i64, (max - min).volume());
}

#[test]
fn test_boundary_overflow_fails_on_every_axis() {
    let world = default_world();
    for axis in 0..3 {
        let mut position = Vec3i::ZERO;
        let mut size = Vec3i::ONE;
        position[axis] = world.grid_max()[axis] - 1;
        size[axis] = 2;
        let op = create(position, size, Orientation::North, Palette::Red);
        assert!(
            matches!(world.validate(&op), Err(RejectReason::OutOfBounds { axis: a, .. }) if a == axis),
            "axis {axis}"
        );
    }
    let below = create(Vec3i::new(0, 0, -1), Vec3i::ONE, Orientation::North, Palette::Red);
    assert!(world.validate(&below).is_err());
}

#[test]
fn test_no_double_occupancy_under_random_ops() {
    let mut rng = StdRng::seed_from_u64(0x2545_F491_4F6C_DD1D);
    let mut next = move |bound: i32| -> i32 { rng.gen_range(0..bound) };

    let mut world = World::new(0, Vec3i::ZERO, Vec3i::new(12, 12, 6));
    let mut accepted = 0;
    for _ in 0..2_000 {
        let live: Vec<_> = world.bricks().map(Brick::id).collect();
        let choice = if live.is_empty() { 0 } else { next(3) };
        let op = match choice {
            0 => create(
                Vec3i::new(next(12), next(12), next(6)),
                Vec3i::new(1 + next(3), 1 + next(3), 1 + next(2)),
                Orientation::ALL[next(4) as usize],
                Palette::ALL[next(5) as usize],
            ),
            1 => Operation::ModifyBrickPosition {
                brick_id: live[next(live.len() as i32) as usize],
                position: Vec3i::new(next(12), next(12), next(6)),
            },
            _ => Operation::DeleteBrick { brick_id: live[next(live.len() as i32) as usize] },
        };
        if world.try_apply(&op).is_ok() {
            accepted += 1;
        }
        assert_grid_consistent(&world);
    }
    assert!(accepted > 100);
}

#[test]
fn test_replicas_assign_identical_ids() {
    let xa = Transaction::from_ops(vec![
        create(Vec3i::new(-4, 0, 0), Vec3i::new(2, 2, 1), Orientation::East, Palette::Red),
        create(Vec3i::new(4, 0, 0), Vec3i::new(2, 2, 1), Orientation::West, Palette::Blue),
        Operation::DeleteBrick { brick_id: 1 },
        create(Vec3i::new(-4, 0, 0), Vec3i::new(1, 1, 1), Orientation::South, Palette::Green),
    ]);

    let mut a = default_world();
    let mut b = default_world();
    a.commit(&xa).unwrap();
    b.apply_transaction(&xa);

    let ids_a: Vec<_> = a.bricks().map(Brick::id).collect();
    let ids_b: Vec<_> = b.bricks().map(Brick::id).collect();
    assert_eq!(ids_a, vec![2, 3]);
    assert_eq!(ids_a, ids_b);
}

#[test]
fn test_op_lines_round_trip_with_negative_positions() {
    let ops = [
        Operation::CreateBrick {
            position: Vec3i::new(-31, -17, 0),
            size: Vec3i::new(2, 2, 1),
            orientation: Orientation::South,
            color: Vec3f::new(0.333_333_34, 0.5, 1.0),
        },
        Operation::ModifyBrickPosition { brick_id: 3, position: Vec3i::new(-2, -3, 4) },
        Operation::ModifyBrickSize { brick_id: 3, size: Vec3i::new(1, 8, 2) },
        Operation::ModifyBrickOrientation { brick_id: 3, orientation: Orientation::West },
        Operation::ModifyBrickColor { brick_id: 3, color: Vec3f::new(0.1, 0.2, 0.3) },
        Operation::DeleteBrick { brick_id: 3 },
    ];
    let xa: Transaction = ops.into_iter().collect();
    let back = Transaction::deserialize(&xa.serialize()).unwrap();
    assert_eq!(back.ops(), &ops);
}
