//! Item transfer request and result types.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::identifiers::{ItemId, StoreId};

// ============================================================================
// TransferTarget
// ============================================================================

/// Destination of an item move.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransferTarget {
    /// The shared vault.
    Vault,
    /// A character, by store id.
    Character(StoreId),
}

impl TransferTarget {
    /// Returns the `targetStoreId` sent on the wire.
    #[must_use]
    pub fn store_id(&self) -> StoreId {
        match self {
            Self::Vault => StoreId::vault(),
            Self::Character(id) => id.clone(),
        }
    }
}

impl From<StoreId> for TransferTarget {
    fn from(id: StoreId) -> Self {
        if id.is_vault() {
            Self::Vault
        } else {
            Self::Character(id)
        }
    }
}

impl fmt::Display for TransferTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vault => f.write_str("vault"),
            Self::Character(id) => write!(f, "character {id}"),
        }
    }
}

// ============================================================================
// TransferRequest
// ============================================================================

/// Set of items to move and where to move them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Distinct item ids, in first-seen order.
    pub item_ids: Vec<ItemId>,
    /// Destination store.
    pub target: TransferTarget,
}

impl TransferRequest {
    /// Creates a request, dropping repeated ids.
    #[must_use]
    pub fn new(item_ids: impl IntoIterator<Item = ItemId>, target: TransferTarget) -> Self {
        let mut seen = FxHashSet::default();
        let item_ids = item_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        Self { item_ids, target }
    }
}

// ============================================================================
// TransferResult
// ============================================================================

/// Outcome of one item in a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTransferResult {
    /// The item's instance id.
    #[serde(rename = "instanceId", default)]
    pub item_id: Option<ItemId>,

    /// Whether this item moved.
    #[serde(default)]
    pub success: bool,

    /// Remote error text for this item.
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
}

/// Body of a `transfer_items_response`.
///
/// # Format
///
/// ```json
/// {
///   "type": "transfer_items_response",
///   "success": true,
///   "results": [
///     { "instanceId": "6917530125735572654", "success": true },
///     { "instanceId": "6917530126853337644", "success": false, "error": "Item is locked" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    /// Top-level outcome reported by the client.
    #[serde(default)]
    pub success: bool,

    /// Per-item outcomes.
    #[serde(default)]
    pub results: Vec<ItemTransferResult>,

    /// Top-level error text when `success` is false.
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
}

impl TransferResult {
    /// Number of items that moved.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    /// Per-item failures, in result order.
    pub fn failures(&self) -> impl Iterator<Item = &ItemTransferResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

/// Error fields are usually strings; anything else is kept as its JSON text.
fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

// ============================================================================
// Tests
// ============================================================================
