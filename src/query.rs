//! Pure filter, projection and selection over a snapshot.
//!
//! Nothing here performs I/O; every function is a deterministic view over
//! slices borrowed from an [`InventorySnapshot`](crate::InventorySnapshot).
//!
//! | Function | Result |
//! |----------|--------|
//! | [`select_by_owner`] | items held by one store, in source order |
//! | [`project`] | reduced per-item summaries |
//! | [`select_by_ids`] | items whose normalized id is requested |
//! | [`most_recent_character`] | last-played non-vault store |

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashSet;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};
use crate::identifiers::ItemId;
use crate::protocol::{Item, ItemKind, Store};

// ============================================================================
// Constants
// ============================================================================

/// Stat the client reports as the armor total.
const TOTAL_STAT: &str = "Total";

// ============================================================================
// Summaries
// ============================================================================

/// Reduced view of a weapon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeaponSummary {
    /// Instance id.
    pub id: Option<ItemId>,
    /// Display name.
    pub name: Option<String>,
    /// Name of the holding store.
    pub owner: Option<String>,
    /// Gear tier as sent.
    pub gear_tier: Option<Value>,
    /// Weapon type name.
    #[serde(rename = "type")]
    pub item_type: Option<Value>,
    /// Damage element.
    pub element: Option<Value>,
}

/// Reduced view of an armor piece.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmorSummary {
    /// Instance id.
    pub id: Option<ItemId>,
    /// Display name.
    pub name: Option<String>,
    /// Name of the holding store.
    pub owner: Option<String>,
    /// Gear tier as sent.
    pub gear_tier: Option<Value>,
    /// Armor slot name.
    #[serde(rename = "type")]
    pub item_type: Option<Value>,
    /// Explicit `Total` stat, or the sum of numeric stats.
    pub stat_total: Option<Value>,
}

/// Either summary, serialized without a tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemSummary {
    Weapon(WeaponSummary),
    Armor(ArmorSummary),
}

impl ItemSummary {
    /// Returns the summarized item's id.
    #[must_use]
    pub fn id(&self) -> Option<&ItemId> {
        match self {
            Self::Weapon(w) => w.id.as_ref(),
            Self::Armor(a) => a.id.as_ref(),
        }
    }
}

// ============================================================================
// Selection
// ============================================================================

/// Items whose `owner` equals `owner` exactly (case-sensitive).
///
/// No match yields an empty vector.
#[must_use]
pub fn select_by_owner<'a>(items: &'a [Item], owner: &str) -> Vec<&'a Item> {
    items
        .iter()
        .filter(|item| item.owner.as_deref() == Some(owner))
        .collect()
}

/// Items whose id is among `ids`, in source order.
///
/// Ids are compared as normalized text, so `42` and `"42"` select the same
/// item. Repeated requested ids do not repeat output; repeated source
/// entries do. Items without an id never match.
#[must_use]
pub fn select_by_ids<'a, I>(items: &'a [Item], ids: I) -> Vec<&'a Item>
where
    I: IntoIterator<Item = ItemId>,
{
    let wanted: FxHashSet<ItemId> = ids.into_iter().collect();

    items
        .iter()
        .filter(|item| item.id.as_ref().is_some_and(|id| wanted.contains(id)))
        .collect()
}

/// The non-vault store with the greatest `lastPlayed`.
///
/// Ties keep the first store in iteration order. Stores without a
/// timestamp lose to any store that has one.
///
/// # Errors
///
/// Returns [`Error::NoCharacterFound`] if every store is the vault.
pub fn most_recent_character(stores: &[Store]) -> Result<&Store> {
    stores
        .iter()
        .filter(|store| !store.is_vault)
        .fold(None, |best: Option<&Store>, store| match best {
            Some(best) if best.last_played >= store.last_played => Some(best),
            _ => Some(store),
        })
        .ok_or(Error::NoCharacterFound)
}

// ============================================================================
// Projection
// ============================================================================

/// Reduces each item to the fields relevant for its kind.
///
/// Kept fields are copied unchanged.
#[must_use]
pub fn project<'a, I>(items: I, kind: ItemKind) -> Vec<ItemSummary>
where
    I: IntoIterator<Item = &'a Item>,
{
    items
        .into_iter()
        .map(|item| match kind {
            ItemKind::Weapon => ItemSummary::Weapon(WeaponSummary {
                id: item.id.clone(),
                name: item.name.clone(),
                owner: item.owner.clone(),
                gear_tier: item.gear_tier.clone(),
                item_type: item.item_type.clone(),
                element: item.element.clone(),
            }),
            ItemKind::Armor => ItemSummary::Armor(ArmorSummary {
                id: item.id.clone(),
                name: item.name.clone(),
                owner: item.owner.clone(),
                gear_tier: item.gear_tier.clone(),
                item_type: item.item_type.clone(),
                stat_total: stat_total(&item.stats),
            }),
        })
        .collect()
}

/// The `Total` stat when present, otherwise the sum of numeric stats.
///
/// Returns `None` when there is nothing numeric to add up.
#[must_use]
pub fn stat_total(stats: &Map<String, Value>) -> Option<Value> {
    if let Some(total) = stats.get(TOTAL_STAT) {
        return Some(total.clone());
    }

    let numbers: Vec<&Number> = stats.values().filter_map(Value::as_number).collect();
    if numbers.is_empty() {
        return None;
    }

    let integral: Option<i64> = numbers
        .iter()
        .try_fold(0i64, |acc, n| n.as_i64().and_then(|v| acc.checked_add(v)));

    match integral {
        Some(sum) => Some(Value::from(sum)),
        None => {
            let sum: f64 = numbers.iter().filter_map(|n| n.as_f64()).sum();
            Number::from_f64(sum).map(Value::Number)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    use crate::identifiers::StoreId;
    use crate::protocol::Timestamp;

    fn item(id: &str, owner: &str) -> Item {
        Item {
            id: Some(ItemId::from(id)),
            name: Some(format!("item {id}")),
            owner: Some(owner.to_owned()),
            ..Default::default()
        }
    }

    fn store(id: &str, is_vault: bool, last_played: i64) -> Store {
        Store {
            id: StoreId::from(id),
            name: id.to_owned(),
            class_name: None,
            is_vault,
            last_played: Timestamp::from_millis(last_played),
            power_level: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_select_by_owner_preserves_order() {
        let items = vec![
            item("1", "Human Warlock"),
            item("2", "Titan"),
            item("3", "Human Warlock"),
        ];

        let selected = select_by_owner(&items, "Human Warlock");
        let ids: Vec<_> = selected.iter().map(|i| i.id.clone().unwrap()).collect();
        assert_eq!(ids, vec![ItemId::from("1"), ItemId::from("3")]);
    }

    #[test]
    fn test_select_by_owner_is_case_sensitive() {
        let items = vec![item("1", "Human Warlock")];
        assert!(select_by_owner(&items, "human warlock").is_empty());
        assert!(select_by_owner(&[], "Titan").is_empty());
    }

    #[test]
    fn test_select_by_ids_mixed_forms() {
        let items = vec![item("10", "A"), item("20", "A"), item("30", "B")];
        let ids = [json!(30), json!("10"), json!("10")]
            .iter()
            .filter_map(ItemId::from_value)
            .collect::<Vec<_>>();

        let selected = select_by_ids(&items, ids);
        let ids: Vec<_> = selected.iter().map(|i| i.id.clone().unwrap()).collect();
        assert_eq!(ids, vec![ItemId::from("10"), ItemId::from("30")]);
    }

    #[test]
    fn test_select_by_ids_keeps_source_duplicates() {
        let items = vec![item("7", "A"), item("7", "B")];
        assert_eq!(select_by_ids(&items, [ItemId::from("7")]).len(), 2);
    }

    #[test]
    fn test_select_by_ids_skips_items_without_id() {
        let items = vec![Item::default(), item("1", "A")];
        assert_eq!(select_by_ids(&items, [ItemId::from("1")]).len(), 1);
    }

    #[test]
    fn test_most_recent_character() {
        let stores = vec![
            store("A", false, 100),
            store("B", false, 200),
            store("V", true, 999),
        ];
        assert_eq!(most_recent_character(&stores).unwrap().id, StoreId::from("B"));
    }

    #[test]
    fn test_most_recent_character_tie_keeps_first() {
        let stores = vec![store("A", false, 500), store("B", false, 500)];
        assert_eq!(most_recent_character(&stores).unwrap().id, StoreId::from("A"));
    }

    #[test]
    fn test_most_recent_character_only_vault() {
        let stores = vec![store("V", true, 999)];
        assert!(matches!(
            most_recent_character(&stores),
            Err(Error::NoCharacterFound)
        ));
        assert!(most_recent_character(&[]).is_err());
    }

    #[test]
    fn test_project_weapon_fields() {
        let mut weapon = item("6917530125735572654", "Titan");
        weapon.gear_tier = Some(json!(5));
        weapon.item_type = Some(json!("Auto Rifle"));
        weapon.element = Some(json!("Solar"));
        weapon.stats.insert("Range".into(), json!(60));
        weapon.extra.insert("perks".into(), json!(["Rampage"]));

        let summaries = project([&weapon], ItemKind::Weapon);
        let ItemSummary::Weapon(summary) = &summaries[0] else {
            panic!("expected weapon summary");
        };

        assert_eq!(summary.id, weapon.id);
        assert_eq!(summary.name, weapon.name);
        assert_eq!(summary.owner, weapon.owner);
        assert_eq!(summary.element, Some(json!("Solar")));

        let value = serde_json::to_value(&summaries[0]).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "6917530125735572654",
                "name": "item 6917530125735572654",
                "owner": "Titan",
                "gear_tier": 5,
                "type": "Auto Rifle",
                "element": "Solar"
            })
        );
    }

    #[test]
    fn test_project_armor_stat_total() {
        let mut helmet = item("1", "Titan");
        helmet.stats.insert("Mobility".into(), json!(10));
        helmet.stats.insert("Total".into(), json!(64));

        let summaries = project(&[helmet.clone()], ItemKind::Armor);
        let ItemSummary::Armor(summary) = &summaries[0] else {
            panic!("expected armor summary");
        };
        assert_eq!(summary.stat_total, Some(json!(64)));
        assert_eq!(summaries[0].id(), helmet.id.as_ref());
    }

    #[test]
    fn test_stat_total_sums_without_total() {
        let mut stats = Map::new();
        stats.insert("Mobility".into(), json!(10));
        stats.insert("Resilience".into(), json!(22));
        stats.insert("Note".into(), json!("masterworked"));
        assert_eq!(stat_total(&stats), Some(json!(32)));

        stats.insert("Recovery".into(), json!(1.5));
        assert_eq!(stat_total(&stats), Some(json!(33.5)));

        assert_eq!(stat_total(&Map::new()), None);
    }

    proptest! {
        #[test]
        fn prop_select_by_ids_matches_normalized_set(
            source in prop::collection::vec(0u64..20, 0..30),
            requested in prop::collection::vec((0u64..20, any::<bool>()), 0..15),
        ) {
            let items: Vec<Item> = source.iter().map(|n| item(&n.to_string(), "A")).collect();
            let ids: Vec<ItemId> = requested
                .iter()
                .filter_map(|(n, as_text)| {
                    let value = if *as_text { json!(n.to_string()) } else { json!(n) };
                    ItemId::from_value(&value)
                })
                .collect();
            let wanted: FxHashSet<String> =
                requested.iter().map(|(n, _)| n.to_string()).collect();

            let selected = select_by_ids(&items, ids);
            let expected: Vec<&Item> = items
                .iter()
                .filter(|i| wanted.contains(i.id.as_ref().unwrap().as_str()))
                .collect();

            prop_assert_eq!(selected, expected);
        }
    }
}
