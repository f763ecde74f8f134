//! Latest known inventory, from either delivery path.
//!
//! The client pushes `weapons`/`armor` lists unprompted, and every `pong`
//! carries a full snapshot. Both land here under one policy: the most recent
//! write wins, per list. Each list remembers where it came from and when.
//!
//! | Write | Source | Lists replaced |
//! |-------|--------|----------------|
//! | `weapons` push | [`SnapshotSource::Push`] | weapons |
//! | `armor` push | [`SnapshotSource::Push`] | armor |
//! | `pong` | [`SnapshotSource::Pull`] | weapons, armor, stores (when present) |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::trace;

use crate::protocol::{InventorySnapshot, Item, ItemKind, Store};

// ============================================================================
// SnapshotSource
// ============================================================================

/// How a cached list arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotSource {
    /// Unsolicited `weapons`/`armor` push.
    Push,
    /// `pong` answering a `ping`.
    Pull,
}

impl fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => f.write_str("push"),
            Self::Pull => f.write_str("pull"),
        }
    }
}

// ============================================================================
// Freshness
// ============================================================================

/// Provenance of one cached list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Freshness {
    /// Delivery path of the last write.
    pub source: SnapshotSource,
    /// When the last write was applied.
    pub received_at: Instant,
}

impl Freshness {
    fn now(source: SnapshotSource) -> Self {
        Self {
            source,
            received_at: Instant::now(),
        }
    }

    /// Time since the last write.
    #[inline]
    #[must_use]
    pub fn age(&self) -> Duration {
        self.received_at.elapsed()
    }
}

// ============================================================================
// SnapshotCache
// ============================================================================

#[derive(Debug)]
struct Entry<T> {
    data: Vec<T>,
    freshness: Option<Freshness>,
}

// Hand-written so `T` needs no `Default`.
impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            freshness: None,
        }
    }
}

impl<T> Entry<T> {
    fn replace(&mut self, data: Vec<T>, source: SnapshotSource) {
        self.data = data;
        self.freshness = Some(Freshness::now(source));
    }
}

#[derive(Debug, Default)]
struct Lists {
    weapons: Entry<Item>,
    armor: Entry<Item>,
    stores: Entry<Store>,
}

impl Lists {
    fn items_mut(&mut self, kind: ItemKind) -> &mut Entry<Item> {
        match kind {
            ItemKind::Weapon => &mut self.weapons,
            ItemKind::Armor => &mut self.armor,
        }
    }
}

/// Shared cache of the latest inventory lists.
///
/// Readers get clones; the lock is never held across an await.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    lists: RwLock<Lists>,
}

impl SnapshotCache {
    /// Creates an empty cache.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces one item list.
    pub fn replace_items(&self, kind: ItemKind, items: Vec<Item>, source: SnapshotSource) {
        trace!(kind = kind.as_str(), count = items.len(), %source, "Cache write");
        self.lists.write().items_mut(kind).replace(items, source);
    }

    /// Records a full snapshot from a `pong`.
    ///
    /// Stores are replaced only when the snapshot carries any, since most
    /// clients omit them.
    pub fn record_snapshot(&self, snapshot: &InventorySnapshot) {
        let mut lists = self.lists.write();
        lists
            .weapons
            .replace(snapshot.weapons.clone(), SnapshotSource::Pull);
        lists
            .armor
            .replace(snapshot.armor.clone(), SnapshotSource::Pull);
        if !snapshot.stores.is_empty() {
            lists
                .stores
                .replace(snapshot.stores.clone(), SnapshotSource::Pull);
        }

        trace!(
            weapons = snapshot.weapons.len(),
            armor = snapshot.armor.len(),
            stores = snapshot.stores.len(),
            "Cache write from pong"
        );
    }

    /// Latest weapons list.
    #[must_use]
    pub fn weapons(&self) -> Vec<Item> {
        self.lists.read().weapons.data.clone()
    }

    /// Latest armor list.
    #[must_use]
    pub fn armor(&self) -> Vec<Item> {
        self.lists.read().armor.data.clone()
    }

    /// Latest store list.
    #[must_use]
    pub fn stores(&self) -> Vec<Store> {
        self.lists.read().stores.data.clone()
    }

    /// Everything cached, as one snapshot.
    #[must_use]
    pub fn snapshot(&self) -> InventorySnapshot {
        let lists = self.lists.read();
        InventorySnapshot {
            weapons: lists.weapons.data.clone(),
            armor: lists.armor.data.clone(),
            stores: lists.stores.data.clone(),
        }
    }

    /// Provenance of one item list, `None` if never written.
    #[must_use]
    pub fn freshness(&self, kind: ItemKind) -> Option<Freshness> {
        let lists = self.lists.read();
        match kind {
            ItemKind::Weapon => lists.weapons.freshness,
            ItemKind::Armor => lists.armor.freshness,
        }
    }

    /// Provenance of the store list, `None` if never written.
    #[must_use]
    pub fn stores_freshness(&self) -> Option<Freshness> {
        self.lists.read().stores.freshness
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::identifiers::{ItemId, StoreId};

    fn item(id: &str) -> Item {
        Item {
            id: Some(ItemId::from(id)),
            ..Item::default()
        }
    }

    fn store(id: &str) -> Store {
        Store {
            id: StoreId::from(id),
            name: id.to_string(),
            class_name: None,
            is_vault: false,
            last_played: None,
            power_level: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn test_empty_cache() {
        let cache = SnapshotCache::new();
        assert!(cache.weapons().is_empty());
        assert!(cache.stores().is_empty());
        assert_eq!(cache.snapshot(), InventorySnapshot::default());
        assert!(cache.freshness(ItemKind::Weapon).is_none());
        assert!(cache.stores_freshness().is_none());
    }

    #[test]
    fn test_push_replaces_one_list() {
        let cache = SnapshotCache::new();
        cache.replace_items(ItemKind::Weapon, vec![item("1"), item("2")], SnapshotSource::Push);
        cache.replace_items(ItemKind::Weapon, vec![item("3")], SnapshotSource::Push);

        assert_eq!(cache.weapons(), vec![item("3")]);
        assert!(cache.armor().is_empty());
        assert_eq!(
            cache.freshness(ItemKind::Weapon).map(|f| f.source),
            Some(SnapshotSource::Push)
        );
        assert!(cache.freshness(ItemKind::Armor).is_none());
    }

    #[test]
    fn test_pull_overwrites_push() {
        let cache = SnapshotCache::new();
        cache.replace_items(ItemKind::Armor, vec![item("a")], SnapshotSource::Push);

        cache.record_snapshot(&InventorySnapshot {
            weapons: vec![item("w")],
            armor: vec![item("b"), item("c")],
            stores: vec![store("hunter")],
        });

        assert_eq!(cache.armor().len(), 2);
        assert_eq!(cache.weapons(), vec![item("w")]);
        assert_eq!(cache.stores().len(), 1);
        assert_eq!(
            cache.freshness(ItemKind::Armor).map(|f| f.source),
            Some(SnapshotSource::Pull)
        );
    }

    #[test]
    fn test_pull_without_stores_keeps_previous_stores() {
        let cache = SnapshotCache::new();
        cache.record_snapshot(&InventorySnapshot {
            stores: vec![store("titan")],
            ..InventorySnapshot::default()
        });
        cache.record_snapshot(&InventorySnapshot {
            weapons: vec![item("1")],
            ..InventorySnapshot::default()
        });

        assert_eq!(cache.stores(), vec![store("titan")]);
        assert_eq!(cache.weapons().len(), 1);
    }

    #[test]
    fn test_push_after_pull_wins() {
        let cache = SnapshotCache::new();
        cache.record_snapshot(&InventorySnapshot {
            weapons: vec![item("old")],
            ..InventorySnapshot::default()
        });
        cache.replace_items(ItemKind::Weapon, vec![item("new")], SnapshotSource::Push);

        let freshness = cache.freshness(ItemKind::Weapon).unwrap();
        assert_eq!(cache.weapons(), vec![item("new")]);
        assert_eq!(freshness.source, SnapshotSource::Push);
        assert!(freshness.age() < Duration::from_secs(5));
    }
}
