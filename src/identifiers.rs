//! Type-safe identifier wrappers.
//!
//! Item and store ids arrive from the inventory client either as JSON strings
//! or as JSON numbers (64-bit instance ids routinely exceed `i53`). Both
//! forms are normalized to their decimal text on construction, so ids are
//! always compared as text.
//!
//! | Type | Wraps | Source |
//! |------|-------|--------|
//! | [`ItemId`] | normalized text | item `id` / `instanceId` |
//! | [`StoreId`] | normalized text | store `id`, `"vault"` |
//! | [`ConnectionId`] | `u64` | process-local counter |
//! | [`RequestId`] | UUID v4 | outbound `requestId` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// Normalized Text Ids
// ============================================================================

/// Visitor accepting a string or any JSON number as normalized id text.
struct IdTextVisitor;

impl Visitor<'_> for IdTextVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or numeric id")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_owned())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
        Ok(normalize_float(v))
    }
}

/// Integral floats render without a fractional part (`7.0` → `"7"`).
fn normalize_float(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

macro_rules! text_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Normalizes a JSON value into an id.
            ///
            /// Returns `None` for values that are neither strings nor numbers.
            #[must_use]
            pub fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::String(s) => Some(Self(s.clone())),
                    Value::Number(n) => Some(Self(match (n.as_u64(), n.as_i64(), n.as_f64()) {
                        (Some(u), _, _) => u.to_string(),
                        (None, Some(i), _) => i.to_string(),
                        (None, None, Some(f)) => normalize_float(f),
                        _ => n.to_string(),
                    })),
                    _ => None,
                }
            }

            /// Returns the normalized text form.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<u64> for $name {
            fn from(n: u64) -> Self {
                Self(n.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(IdTextVisitor).map(Self)
            }
        }
    };
}

text_id! {
    /// Item instance id, compared as normalized text.
    ItemId
}

text_id! {
    /// Store id: a character id or the vault.
    StoreId
}

impl StoreId {
    /// The vault's store id as understood by the inventory client.
    pub const VAULT: &'static str = "vault";

    /// Returns the vault store id.
    #[inline]
    #[must_use]
    pub fn vault() -> Self {
        Self(Self::VAULT.to_owned())
    }

    /// Returns `true` if this id names the vault.
    #[inline]
    #[must_use]
    pub fn is_vault(&self) -> bool {
        self.0 == Self::VAULT
    }
}

// ============================================================================
// ConnectionId
// ============================================================================

/// Global counter for connection ids.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-local identity of one accepted client connection.
///
/// Used by the registry to tell a live connection from a superseded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next connection id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ============================================================================
// RequestId
// ============================================================================

/// Identifier carried in outbound requests as `requestId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a new random request id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an echoed `requestId` value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
