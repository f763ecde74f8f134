//! WebSocket protocol message types.
//!
//! This module defines the message format for communication between the
//! bridge and the inventory client running inside the browser.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | `hello` | Client → Bridge | Handshake acknowledgment |
//! | `weapons` / `armor` | Client → Bridge | Unsolicited list push |
//! | `ping` / `pong` | Bridge ↔ Client | Full snapshot round trip |
//! | `transfer_items` / `transfer_items_response` | Bridge ↔ Client | Item moves |
//!
//! One JSON object per text frame, discriminated by `type`.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `inventory` | Items, stores and snapshots |
//! | `message` | Inbound/outbound message enums |
//! | `transfer` | Transfer request and result |

// ============================================================================
// Submodules
// ============================================================================

/// Items, stores and snapshots.
pub mod inventory;

/// Inbound and outbound message types.
pub mod message;

/// Transfer request and result types.
pub mod transfer;

// ============================================================================
// Re-exports
// ============================================================================

pub use inventory::{InventorySnapshot, Item, ItemKind, Store, Timestamp};
pub use message::{Envelope, InboundMessage, OutboundMessage, Reply, RequestKind};
pub use transfer::{ItemTransferResult, TransferRequest, TransferResult, TransferTarget};
