//! Inventory data types delivered by the client.
//!
//! Items and stores are decoded leniently: unknown fields are preserved in
//! `extra`, list fields accept both `[...]` and the wrapped `{"data": [...]}`
//! form, and timestamps accept epoch milliseconds or RFC 3339 text.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

use crate::identifiers::{ItemId, StoreId};

// ============================================================================
// ItemKind
// ============================================================================

/// Which list an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Weapons (primary stat is Attack).
    Weapon,
    /// Armor pieces.
    Armor,
}

impl ItemKind {
    /// Returns the wire name of the list (`weapons` / `armor`).
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Weapon => "weapons",
            Self::Armor => "armor",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Item
// ============================================================================

/// A single weapon or armor instance.
///
/// # Format
///
/// ```json
/// {
///   "id": "6917530125735572654",
///   "name": "Fatebringer",
///   "owner": "Human Warlock",
///   "gearTier": 5,
///   "type": "Hand Cannon",
///   "element": "Kinetic",
///   "stats": { "Impact": 84, "Range": 51 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Instance id. Items without one never match id selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Name of the store holding the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Gear tier, passed through as sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gear_tier: Option<Value>,

    /// Item type name (`Hand Cannon`, `Helmet`, ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<Value>,

    /// Damage element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<Value>,

    /// Stat name to value.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub stats: Map<String, Value>,

    /// Every other field the client sent (`tier`, `power`, `perks`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Timestamp
// ============================================================================

/// Point in time a character was last played.
///
/// Decodes from epoch milliseconds or an RFC 3339 string and serializes
/// back as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[must_use]
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// Interprets a JSON value as a timestamp.
    ///
    /// Returns `None` for anything that is not a number or RFC 3339 text.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .and_then(Self::from_millis),
            Value::String(s) => match s.parse::<i64>() {
                Ok(millis) => Self::from_millis(millis),
                Err(_) => DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| Self(dt.with_timezone(&Utc))),
            },
            _ => None,
        }
    }

    /// Milliseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// Unparseable timestamps decode as `None` instead of failing the store.
fn lenient_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Timestamp>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?
        .as_ref()
        .and_then(Timestamp::from_value))
}

// ============================================================================
// Store
// ============================================================================

/// A character or the vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    /// Character id, or `vault`.
    pub id: StoreId,

    /// Display name; matches [`Item::owner`].
    #[serde(default)]
    pub name: String,

    /// Class name (`Warlock`, `Titan`, `Hunter`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    /// Whether this store is the shared vault.
    #[serde(default)]
    pub is_vault: bool,

    /// When the character was last played.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_played: Option<Timestamp>,

    /// Character power level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_level: Option<Value>,

    /// Every other field the client sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// InventorySnapshot
// ============================================================================

/// Point-in-time capture of weapons, armor and stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    /// Weapons in client order.
    #[serde(default, deserialize_with = "listing")]
    pub weapons: Vec<Item>,

    /// Armor in client order.
    #[serde(default, deserialize_with = "listing")]
    pub armor: Vec<Item>,

    /// Characters and vault, when the client sends them.
    #[serde(default, deserialize_with = "listing")]
    pub stores: Vec<Store>,
}

impl InventorySnapshot {
    /// Returns the list for `kind`.
    #[inline]
    #[must_use]
    pub fn items(&self, kind: ItemKind) -> &[Item] {
        match kind {
            ItemKind::Weapon => &self.weapons,
            ItemKind::Armor => &self.armor,
        }
    }
}

/// The two list shapes the client uses.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(default = "Vec::new")]
        data: Vec<T>,
    },
}

/// Decodes `[...]`, `{"data": [...]}` or `null` into a vector.
///
/// Entries that do not decode are skipped with a warning, so one bad record
/// does not hide the rest of the list.
pub(crate) fn listing<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let entries = match Option::<Listing<Value>>::deserialize(d)? {
        Some(Listing::Bare(entries) | Listing::Wrapped { data: entries }) => entries,
        None => return Ok(Vec::new()),
    };

    Ok(entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed list entry");
                None
            }
        })
        .collect())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_item_keeps_unknown_fields() {
        let item: Item = serde_json::from_value(json!({
            "id": 6917530125735572654u64,
            "name": "Fatebringer",
            "owner": "Human Warlock",
            "type": "Hand Cannon",
            "power": 2010,
            "perks": ["Explosive Payload"]
        }))
        .unwrap();

        assert_eq!(item.id, Some(ItemId::from("6917530125735572654")));
        assert_eq!(item.extra.get("power"), Some(&json!(2010)));
        assert_eq!(item.extra.get("perks"), Some(&json!(["Explosive Payload"])));
        assert!(item.stats.is_empty());
    }

    #[test]
    fn test_item_serializes_camel_case() {
        let item = Item {
            id: Some(ItemId::from("1")),
            gear_tier: Some(json!(4)),
            item_type: Some(json!("Helmet")),
            ..Default::default()
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value, json!({"id": "1", "gearTier": 4, "type": "Helmet"}));
    }

    #[test]
    fn test_snapshot_accepts_both_list_shapes() {
        let snapshot: InventorySnapshot = serde_json::from_value(json!({
            "type": "pong",
            "weapons": [{"id": "1"}],
            "armor": {"data": [{"id": "2"}, {"id": "3"}]}
        }))
        .unwrap();

        assert_eq!(snapshot.weapons.len(), 1);
        assert_eq!(snapshot.armor.len(), 2);
        assert!(snapshot.stores.is_empty());
        assert_eq!(snapshot.items(ItemKind::Armor)[1].id, Some(ItemId::from("3")));
    }

    #[test]
    fn test_snapshot_null_lists() {
        let snapshot: InventorySnapshot =
            serde_json::from_value(json!({"weapons": null, "stores": {"data": []}})).unwrap();
        assert!(snapshot.weapons.is_empty());
        assert!(snapshot.armor.is_empty());
    }

    #[test]
    fn test_snapshot_skips_malformed_entries() {
        let snapshot: InventorySnapshot = serde_json::from_value(json!({
            "weapons": [{"id": "1"}, {"id": true}, {"id": {"nested": 1}}, {"id": 2}],
            "armor": {"data": [7, {"id": "3"}]},
            "stores": [
                {"name": "A", "isVault": false, "lastPlayed": 1},
                {"id": "B", "name": "B", "isVault": false}
            ]
        }))
        .unwrap();

        let weapon_ids: Vec<_> = snapshot.weapons.iter().map(|i| i.id.clone()).collect();
        assert_eq!(weapon_ids, vec![Some(ItemId::from("1")), Some(ItemId::from("2"))]);
        assert_eq!(snapshot.armor.len(), 1);
        assert_eq!(snapshot.stores.len(), 1);
        assert_eq!(snapshot.stores[0].id, StoreId::from("B"));
    }

    #[test]
    fn test_snapshot_rejects_non_list_shape() {
        let result = serde_json::from_value::<InventorySnapshot>(json!({"weapons": "oops"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_store_timestamp_forms() {
        let numeric: Store =
            serde_json::from_value(json!({"id": "A", "lastPlayed": 200})).unwrap();
        let text: Store = serde_json::from_value(json!({
            "id": "B",
            "lastPlayed": "2024-05-01T12:00:00.000Z"
        }))
        .unwrap();
        let garbage: Store =
            serde_json::from_value(json!({"id": "C", "lastPlayed": "yesterday"})).unwrap();

        assert_eq!(numeric.last_played.map(|t| t.as_millis()), Some(200));
        assert!(text.last_played > numeric.last_played);
        assert_eq!(garbage.last_played, None);
    }

    #[test]
    fn test_store_vault_flag() {
        let vault: Store =
            serde_json::from_value(json!({"id": "vault", "name": "Vault", "isVault": true}))
                .unwrap();
        assert!(vault.is_vault);
        assert!(vault.id.is_vault());
    }

    #[test]
    fn test_timestamp_serializes_rfc3339() {
        let ts = Timestamp::from_millis(0).unwrap();
        assert_eq!(
            serde_json::to_value(ts).unwrap(),
            json!("1970-01-01T00:00:00.000Z")
        );
    }
}
