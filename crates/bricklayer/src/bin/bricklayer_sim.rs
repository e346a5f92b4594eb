//! # BRICKLAYER Simulation
//!
//! Two clients and an in-process authority, walked through the whole
//! replication story: create, catch-up, conflict, offline edits,
//! reconciliation and a mesh import.
//!
//! ```bash
//! cargo run --bin bricklayer_sim -- --units 16
//! RUST_LOG=debug cargo run --bin bricklayer_sim   # full wire traffic
//! ```

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bricklayer::core::{Orientation, Palette};
use bricklayer::networking::{events::drain, LocalServer, Outcome, ServerConfig, Ticket};
use bricklayer::shared::{Vec3d, Vec3i};
use bricklayer::voxel::TriangleMesh;
use bricklayer::{Universe, UniverseConfig};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "bricklayer_sim")]
#[command(about = "Replication walkthrough against an in-process authority", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Voxels along the imported cube's longest axis
    #[arg(long)]
    units: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => UniverseConfig::load(path).with_context(|| format!("loading {path}"))?,
        None => UniverseConfig::default(),
    };
    config.client.catchup_on_start = false;
    if let Some(units) = args.units {
        config.import_units = Some(units);
    }

    println!("═══════════════════════════════════════════════════════════════════");
    println!("                  BRICKLAYER SIMULATION v{}", env!("CARGO_PKG_VERSION"));
    println!("═══════════════════════════════════════════════════════════════════");

    let server = Arc::new(LocalServer::new(ServerConfig {
        grid_min: config.client.grid_min,
        grid_max: config.client.grid_max,
    }));
    let alice = client(&config, 1, &server)?;
    let bob = client(&config, 2, &server)?;
    let bob_events = bob.subscribe();

    // =========================================================================
    // STEP 1: Alice builds, Bob catches up
    // =========================================================================
    println!("\n[1] Alice places a brick, Bob catches up");
    let created = alice.create_brick(
        Vec3i::ZERO,
        Vec3i::new(2, 2, 1),
        Orientation::East,
        Palette::Red.rgb(),
    )?;
    expect(created.ticket(), Outcome::Accepted)?;
    expect(Some(&bob.catch_up()?), Outcome::CaughtUp(1))?;
    println!("    alice: {} bricks, bob: {} bricks", alice.brick_count(), bob.brick_count());

    // =========================================================================
    // STEP 2: Conflict
    // =========================================================================
    println!("\n[2] Both clients race for the same cells");
    alice.process_op("CreateBrick 4 4 0 2 2 1 1 0 1 0")?;
    alice.flush();
    let racing = bob.process_op("CreateBrick 5 5 0 2 2 1 0 0 0 1")?;
    expect(racing.ticket(), Outcome::Conflict)?;
    bob.flush();
    println!("    bob events: {:?}", drain(&bob_events));

    // =========================================================================
    // STEP 3: Offline edits and reconciliation
    // =========================================================================
    println!("\n[3] Bob edits offline, then reconnects");
    bob.set_network_enabled(false)?;
    bob.create_brick(Vec3i::new(-6, -6, 0), Vec3i::new(2, 2, 1), Orientation::North, Palette::Blue.rgb())?;
    if let Some(id) = bob.brick_at(Vec3i::ZERO).map(|b| b.id()) {
        bob.select(id);
        bob.modify_position_for_selected(Vec3i::new(0, 0, 1))?;
    }
    println!("    bob offline: {} bricks", bob.brick_count());
    if let Some(sync) = bob.set_network_enabled(true)? {
        expect(Some(&sync), Outcome::Accepted)?;
    }
    bob.flush();
    let _ = alice.catch_up()?.wait();
    println!("    alice: {} bricks, bob: {} bricks", alice.brick_count(), bob.brick_count());

    // =========================================================================
    // STEP 4: Mesh import
    // =========================================================================
    println!("\n[4] Alice imports a cube");
    let cube = TriangleMesh::cuboid(Vec3d::ZERO, Vec3d::splat(10.0));
    let report = alice.import_mesh(&cube, Vec3i::new(-30, -30, 10))?;
    expect(report.execution.as_ref().and_then(|e| e.ticket()), Outcome::Accepted)?;
    println!(
        "    {} bricks batched, {} rejected",
        report.accumulated, report.rejected
    );
    let _ = bob.catch_up()?.wait();

    // =========================================================================
    // RESULTS
    // =========================================================================
    let stats = server.stats();
    println!("\n═══════════════════════════════════════════════════════════════════");
    println!("  Server log:     {} transactions", server.log_len(alice.id()));
    println!("  Server bricks:  {}", server.brick_count(alice.id()));
    println!("  Accepted:       {}", stats.accepted);
    println!("  Rejected:       {}", stats.rejected);
    println!("  Alice bricks:   {}", alice.brick_count());
    println!("  Bob bricks:     {}", bob.brick_count());
    println!("═══════════════════════════════════════════════════════════════════");

    if alice.bricks() != bob.bricks() {
        bail!("replicas diverged");
    }
    println!("  Replicas agree.");
    Ok(())
}

fn client(config: &UniverseConfig, client_id: u64, server: &Arc<LocalServer>) -> Result<Universe> {
    let mut config = config.clone();
    config.client.client_id = Some(client_id);
    Universe::new(&config, server.clone()).with_context(|| format!("starting client {client_id}"))
}

fn expect(ticket: Option<&Ticket>, wanted: Outcome) -> Result<()> {
    let Some(ticket) = ticket else {
        bail!("expected a queued op");
    };
    let outcome = ticket.wait();
    if outcome != wanted {
        bail!("expected {wanted:?}, got {outcome:?}");
    }
    Ok(())
}
