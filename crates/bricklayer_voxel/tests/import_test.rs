//! Mesh imports through a TransactionManager against an in-process authority.

use std::sync::Arc;
use std::time::Duration;

use bricklayer_networking::{ClientConfig, Execution, LocalServer, Outcome, TransactionManager};
use bricklayer_shared::{Vec3d, Vec3i};
use bricklayer_voxel::{TriangleMesh, Voxelizer};

fn manager(server: &Arc<LocalServer>) -> TransactionManager {
    let config = ClientConfig {
        catchup_on_start: false,
        client_id: Some(1),
        dispatcher_poll_ms: 5,
        ..ClientConfig::default()
    };
    TransactionManager::new(&config, server.clone()).unwrap()
}

fn cube() -> TriangleMesh {
    TriangleMesh::cuboid(Vec3d::ZERO, Vec3d::splat(10.0))
}

#[test]
fn test_cube_import_is_one_transaction() {
    let server = Arc::new(LocalServer::default());
    let client = manager(&server);
    let origin = Vec3i::new(-10, -10, 0);

    let report = Voxelizer::default().import(&cube(), 10, &client, origin).unwrap();
    assert_eq!(report.accumulated, 250);
    assert_eq!(report.rejected, 0);

    let ticket = report.execution.as_ref().and_then(Execution::ticket).unwrap();
    assert_eq!(ticket.wait_timeout(Duration::from_secs(5)), Some(Outcome::Accepted));
    client.flush();

    assert_eq!(server.log_len(0), 1);
    assert_eq!(server.brick_count(0), 250);

    let world = client.world().read();
    assert_eq!(world.len(), 250);
    // Footprint is exactly the 10x10x10 block of cells at the origin.
    assert!(world.brick_at(origin).is_some());
    assert!(world.brick_at(Vec3i::new(-1, -1, 9)).is_some());
    assert!(world.brick_at(Vec3i::new(0, -10, 0)).is_none());
    assert!(world.brick_at(Vec3i::new(-10, -10, 10)).is_none());
}

#[test]
fn test_import_skips_bricks_that_do_not_fit() {
    let server = Arc::new(LocalServer::default());
    let client = manager(&server);

    // x from 26 to 36 overruns the grid maximum of 32.
    let report = Voxelizer::default().import(&cube(), 10, &client, Vec3i::new(26, 0, 0)).unwrap();
    assert_eq!(report.accumulated, 3 * 5 * 10);
    assert_eq!(report.rejected, 2 * 5 * 10);
    assert!(!client.is_transaction_open());
}

#[test]
fn test_offline_import_applies_locally() {
    let server = Arc::new(LocalServer::default());
    let client = manager(&server);
    client.set_network_enabled(false).unwrap();

    let report = Voxelizer::default().import(&cube(), 10, &client, Vec3i::ZERO).unwrap();
    assert_eq!(report.applied_offline, 250);
    assert!(matches!(report.execution, Some(Execution::AppliedOffline)));
    assert_eq!(client.world().read().len(), 250);
    assert_eq!(client.pending_offline(), 250);
    assert_eq!(server.log_len(0), 0);
}
