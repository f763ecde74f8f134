//! Transfer items between the vault and the current character.
//!
//! Demonstrates:
//! - Looking items up by id
//! - Transferring to the vault and back
//! - Reading the classified outcome
//!
//! Usage:
//!   cargo run --example 002_transfer -- <item-id> [<item-id> ...]
//!   cargo run --example 002_transfer -- --debug 6917530125735572654

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::{Context, bail};
use common::Args;
use dim_inventory_bridge::{Bridge, BridgeConfig, ItemId};

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
    println!("=== 002: Transfer ===\n");

    let ids: Vec<ItemId> = args.rest.iter().map(|id| ItemId::from(id.as_str())).collect();
    if ids.is_empty() {
        bail!("usage: 002_transfer <item-id> [<item-id> ...]");
    }

    let bridge = Bridge::new(BridgeConfig::default());
    let server = bridge.serve().await.context("failed to start server")?;
    println!("[1] Listening on port {}", server.port());

    if !common::wait_for_client(&bridge, CONNECT_WAIT).await {
        server.shutdown().await;
        bail!("no inventory client connected within {CONNECT_WAIT:?}");
    }
    println!("    ✓ Connected\n");

    // ========================================================================
    // Lookup
    // ========================================================================

    println!("[2] Looking up {} item(s)...", ids.len());
    let items = bridge.items_by_ids(ids.iter().cloned()).await?;
    for item in &items {
        println!(
            "    {} {} ({})",
            item.id.as_ref().map_or("?", ItemId::as_str),
            item.name.as_deref().unwrap_or("?"),
            item.owner.as_deref().unwrap_or("?")
        );
    }
    println!();

    // ========================================================================
    // Round Trip
    // ========================================================================

    println!("[3] Moving to vault...");
    let outcome = bridge.transfer_to_vault(ids.iter().cloned()).await?;
    println!("    {outcome}\n");

    println!("[4] Moving back to current character...");
    let outcome = bridge.transfer_to_current_character(ids).await?;
    println!("    {outcome}\n");

    outcome.into_result().context("transfer back did not complete")?;

    common::wait_for_exit(args.no_wait).await;
    server.shutdown().await;

    println!("=== Done ===");
    Ok(())
}
