//! Inbound and outbound message types.
//!
//! Every frame is a JSON object with a `type` discriminator. Inbound text is
//! decoded once, here, into [`InboundMessage`]; the dispatcher then matches
//! on it exhaustively.
//!
//! | `type` | Direction | Variant |
//! |--------|-----------|---------|
//! | `hello` | client → bridge | [`InboundMessage::Hello`] |
//! | `weapons` | client → bridge | [`InboundMessage::Weapons`] |
//! | `armor` | client → bridge | [`InboundMessage::Armor`] |
//! | `pong` | client → bridge | [`InboundMessage::Pong`] |
//! | `transfer_items_response` | client → bridge | [`InboundMessage::TransferItemsResponse`] |
//! | `ping` | bridge → client | [`OutboundMessage::Ping`] |
//! | `transfer_items` | bridge → client | [`OutboundMessage::TransferItems`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::{ItemId, RequestId, StoreId};

use super::inventory::{InventorySnapshot, Item};
use super::transfer::{TransferRequest, TransferResult};

// ============================================================================
// RequestKind
// ============================================================================

/// Kind of correlated round trip.
///
/// At most one request of each kind is awaiting a response at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// `ping` answered by `pong` with a full snapshot.
    Pong,
    /// `transfer_items` answered by `transfer_items_response`.
    TransferItems,
}

impl RequestKind {
    /// Returns the kind name used in logs and errors.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pong => "pong",
            Self::TransferItems => "transfer_items",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Reply
// ============================================================================

/// Decoded body of a correlated response.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Full snapshot from a `pong`.
    Inventory(InventorySnapshot),
    /// Result of a `transfer_items`.
    Transfer(TransferResult),
}

/// A correlated response plus its optional echoed request id.
///
/// `body` is `Err` with the decode failure when the frame was routable but its
/// payload was malformed. The dispatcher logs and drops such frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    /// `requestId` echoed by clients that support it.
    pub request_id: Option<RequestId>,
    /// Decoded payload, or the decode error text.
    pub body: std::result::Result<T, String>,
}

// ============================================================================
// InboundMessage
// ============================================================================

/// A message from the inventory client.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Handshake acknowledgment.
    Hello,
    /// Unsolicited weapons push.
    Weapons(Vec<Item>),
    /// Unsolicited armor push.
    Armor(Vec<Item>),
    /// Full snapshot answering a `ping`.
    Pong(Envelope<InventorySnapshot>),
    /// Outcome of a `transfer_items`.
    TransferItemsResponse(Envelope<TransferResult>),
    /// Well-formed object with an unrecognized `type`.
    Unknown(String),
}

impl InboundMessage {
    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the text is not a JSON object, has no
    /// string `type`, or a push payload is malformed. Correlated responses
    /// never fail here; their decode errors travel in [`Envelope::body`].
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::protocol(format!("not JSON: {e}")))?;

        let Value::Object(mut object) = value else {
            return Err(Error::protocol("frame is not a JSON object"));
        };

        let kind = match object.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            Some(_) => return Err(Error::protocol("`type` is not a string")),
            None => return Err(Error::protocol("missing `type`")),
        };

        match kind.as_str() {
            "hello" => Ok(Self::Hello),
            "weapons" => Ok(Self::Weapons(decode_push(&mut object, &kind)?)),
            "armor" => Ok(Self::Armor(decode_push(&mut object, &kind)?)),
            "pong" => Ok(Self::Pong(envelope(object))),
            "transfer_items_response" => Ok(Self::TransferItemsResponse(envelope(object))),
            _ => Ok(Self::Unknown(kind)),
        }
    }

    /// Returns the wire `type` of this message.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Hello => "hello",
            Self::Weapons(_) => "weapons",
            Self::Armor(_) => "armor",
            Self::Pong(_) => "pong",
            Self::TransferItemsResponse(_) => "transfer_items_response",
            Self::Unknown(kind) => kind,
        }
    }
}

/// Decodes the `data` list of a `weapons`/`armor` push.
fn decode_push(object: &mut Map<String, Value>, kind: &str) -> Result<Vec<Item>> {
    let data = object
        .remove("data")
        .ok_or_else(|| Error::protocol(format!("`{kind}` push without `data`")))?;

    serde_json::from_value(data)
        .map_err(|e| Error::protocol(format!("malformed `{kind}` data: {e}")))
}

/// Wraps a correlated response body with its echoed request id.
fn envelope<T>(object: Map<String, Value>) -> Envelope<T>
where
    T: serde::de::DeserializeOwned,
{
    let request_id = object
        .get("requestId")
        .and_then(Value::as_str)
        .and_then(RequestId::parse);

    let body = serde_json::from_value(Value::Object(object)).map_err(|e| e.to_string());

    Envelope { request_id, body }
}

// ============================================================================
// OutboundMessage
// ============================================================================

/// A message to the inventory client.
///
/// `requestId` is an extension of the client protocol; clients that do
/// not echo it are still served through kind-keyed correlation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Ask for a full snapshot.
    Ping {
        /// Correlation id.
        #[serde(rename = "requestId")]
        request_id: RequestId,
    },
    /// Move items to a store.
    TransferItems {
        /// Correlation id.
        #[serde(rename = "requestId")]
        request_id: RequestId,
        /// Items to move.
        #[serde(rename = "instanceIds")]
        instance_ids: Vec<ItemId>,
        /// Character id or `vault`.
        #[serde(rename = "targetStoreId")]
        target_store_id: StoreId,
    },
}

impl OutboundMessage {
    /// Creates a `ping`.
    #[inline]
    #[must_use]
    pub fn ping(request_id: RequestId) -> Self {
        Self::Ping { request_id }
    }

    /// Creates a `transfer_items` from a request.
    #[must_use]
    pub fn transfer_items(request_id: RequestId, request: &TransferRequest) -> Self {
        Self::TransferItems {
            request_id,
            instance_ids: request.item_ids.clone(),
            target_store_id: request.target.store_id(),
        }
    }

    /// Serializes to frame text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
