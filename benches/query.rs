//! Query benchmark suite.
//!
//! Benchmarks the pure inventory queries over synthetic snapshots:
//! - Item counts: 500, 2000, 8000 (a full DIM account is ~1-3k)
//! - Operations: snapshot decode, owner filter + projection, id selection
//!
//! Run with: cargo bench --bench query
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Value, json};

use dim_inventory_bridge::protocol::InventorySnapshot;
use dim_inventory_bridge::query;
use dim_inventory_bridge::{ItemId, ItemKind};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const ITEM_COUNTS: &[usize] = &[500, 2000, 8000];

const OWNERS: &[&str] = &["Human Warlock", "Awoken Hunter", "Exo Titan", "Vault"];

// ============================================================================
// Fixtures
// ============================================================================

/// Builds a `pong` body with `count` weapons and `count` armor pieces.
fn synthetic_pong(count: usize) -> Value {
    let weapons: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "id": 6_917_530_000_000_000_000_u64 + i as u64,
                "name": format!("Weapon {i}"),
                "owner": OWNERS[i % OWNERS.len()],
                "gearTier": "Legendary",
                "type": "Auto Rifle",
                "element": "Arc",
                "perks": ["Rampage", "Outlaw"],
            })
        })
        .collect();

    let armor: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "id": format!("{}", 6_917_540_000_000_000_000_u64 + i as u64),
                "name": format!("Armor {i}"),
                "owner": OWNERS[i % OWNERS.len()],
                "gearTier": "Exotic",
                "type": "Helmet",
                "stats": {"Mobility": 10, "Resilience": 20, "Recovery": i % 30},
            })
        })
        .collect();

    json!({
        "type": "pong",
        "weapons": {"data": weapons},
        "armor": armor,
        "stores": [
            {"id": "1", "name": "Human Warlock", "isVault": false, "lastPlayed": 300},
            {"id": "2", "name": "Awoken Hunter", "isVault": false, "lastPlayed": 200},
            {"id": "3", "name": "Exo Titan", "isVault": false, "lastPlayed": 100},
            {"id": "vault", "name": "Vault", "isVault": true},
        ],
    })
}

fn synthetic_snapshot(count: usize) -> InventorySnapshot {
    serde_json::from_value(synthetic_pong(count)).expect("synthetic snapshot decodes")
}

// ============================================================================
// Benchmark: Snapshot Decode
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for &count in ITEM_COUNTS {
        let text = synthetic_pong(count).to_string();
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("pong", count), &text, |b, text| {
            b.iter(|| {
                let snapshot: InventorySnapshot = serde_json::from_str(black_box(text)).unwrap();
                snapshot
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Current Character Views
// ============================================================================

fn bench_current_character(c: &mut Criterion) {
    let mut group = c.benchmark_group("current_character");

    for &count in ITEM_COUNTS {
        let snapshot = synthetic_snapshot(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("weapons", count), &snapshot, |b, snapshot| {
            b.iter(|| {
                let character = query::most_recent_character(&snapshot.stores).unwrap();
                let owned = query::select_by_owner(&snapshot.weapons, &character.name);
                query::project(owned, ItemKind::Weapon)
            });
        });

        group.bench_with_input(BenchmarkId::new("armor", count), &snapshot, |b, snapshot| {
            b.iter(|| {
                let character = query::most_recent_character(&snapshot.stores).unwrap();
                let owned = query::select_by_owner(&snapshot.armor, &character.name);
                query::project(owned, ItemKind::Armor)
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Id Selection
// ============================================================================

fn bench_select_by_ids(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_by_ids");

    for &count in ITEM_COUNTS {
        let snapshot = synthetic_snapshot(count);
        let ids: Vec<ItemId> = (0..count)
            .step_by(7)
            .map(|i| ItemId::from(6_917_530_000_000_000_000_u64 + i as u64))
            .collect();

        group.bench_with_input(BenchmarkId::new("weapons", count), &ids, |b, ids| {
            b.iter(|| query::select_by_ids(&snapshot.weapons, ids.iter().cloned()).len());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_current_character, bench_select_by_ids);
criterion_main!(benches);
