//! Serve the bridge and print the current character's gear.
//!
//! Demonstrates:
//! - Starting the WebSocket server (TLS when a cert pair is present)
//! - Waiting for the DIM tab to connect
//! - Current-character and account-wide queries
//! - Reading pushed data from the cache
//!
//! Usage:
//!   cargo run --example 001_serve
//!   cargo run --example 001_serve -- --no-wait
//!   cargo run --example 001_serve -- --debug
//!   cargo run --example 001_serve -- --tls

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::{Context, bail};
use common::Args;
use dim_inventory_bridge::{Bridge, BridgeConfig, ItemKind};

// ============================================================================
// Constants
// ============================================================================

const CONNECT_WAIT: Duration = Duration::from_secs(60);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== 001: Serve ===\n");

    // ========================================================================
    // Start Server
    // ========================================================================

    let config = BridgeConfig::builder()
        .require_tls(args.require_tls)
        .build()
        .context("invalid configuration")?;

    println!("[1] Starting bridge...");
    println!("    Cert: {}", config.cert_path.display());

    let bridge = Bridge::new(config);
    let server = bridge.serve().await.context("failed to start server")?;

    println!("    ✓ Listening on {}\n", server.ws_url());

    // ========================================================================
    // Wait for Client
    // ========================================================================

    println!("[2] Waiting for the DIM tab to connect...");
    if !common::wait_for_client(&bridge, CONNECT_WAIT).await {
        server.shutdown().await;
        bail!("no inventory client connected within {CONNECT_WAIT:?}");
    }
    println!("    ✓ Connected\n");

    // ========================================================================
    // Queries
    // ========================================================================

    println!("[3] Current character...");
    let character = bridge.current_character().await?;
    println!("    ✓ {} ({})\n", character.name, character.id);

    println!("[4] Gear on {}...", character.name);
    let weapons = bridge.weapons_for_current_character().await?;
    let armor = bridge.armor_for_current_character().await?;
    println!("    ✓ {} weapons, {} armor", weapons.len(), armor.len());
    for item in weapons.iter().take(5) {
        println!("      {}", serde_json::to_string(item)?);
    }
    println!();

    println!("[5] Account-wide...");
    let all_weapons = bridge.weapons_all().await?;
    let all_armor = bridge.armor_all().await?;
    println!("    ✓ {} weapons, {} armor\n", all_weapons.len(), all_armor.len());

    println!("[6] Cache...");
    for kind in [ItemKind::Weapon, ItemKind::Armor] {
        if let Some(freshness) = bridge.cache().freshness(kind) {
            println!(
                "    {}: from {} {:?} ago",
                kind.as_str(),
                freshness.source,
                freshness.age()
            );
        }
    }
    println!();

    common::wait_for_exit(args.no_wait).await;
    server.shutdown().await;

    println!("\n=== Done ===");
    Ok(())
}
