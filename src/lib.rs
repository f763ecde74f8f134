//! DIM inventory bridge - tool calls in, inventory client over WebSocket.
//!
//! This library connects a tool-calling front end to a browser-resident
//! Destiny Item Manager (DIM) client. The browser tab connects to a local
//! WebSocket server; the bridge asks it for inventory snapshots and item
//! transfers and derives the views the tools return.
//!
//! # Architecture
//!
//! The bridge follows a server-client model:
//!
//! - **Bridge (Rust)**: Accepts the client, sends requests, answers tool calls
//! - **Inventory client (browser)**: Pushes inventory, answers requests
//!
//! Key design principles:
//!
//! - One current connection; a reconnecting client replaces the old one
//! - At most one pending request per kind (`pong`, `transfer_items`)
//! - Inbound frames are decoded once into a closed message type
//! - Queries are pure functions over a fetched snapshot
//!
//! # Quick Start
//!
//! ```no_run
//! use dim_inventory_bridge::{Bridge, BridgeConfig, ItemId, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let bridge = Bridge::new(BridgeConfig::default());
//!     let server = bridge.serve().await?;
//!
//!     // Wait for the DIM tab to connect, then:
//!     let character = bridge.current_character().await?;
//!     let weapons = bridge.weapons_for_current_character().await?;
//!     println!("{}: {} weapons", character.name, weapons.len());
//!
//!     let outcome = bridge.transfer_to_vault([ItemId::from("6917530125735572654")]).await?;
//!     println!("{outcome}");
//!
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | [`Bridge`], correlator, cache, transfers |
//! | [`config`] | [`BridgeConfig`] and its builder |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Item, store, connection and request ids |
//! | [`protocol`] | WebSocket message types |
//! | [`query`] | Pure inventory queries |
//! | [`transport`] | WebSocket server and connections |

// ============================================================================
// Modules
// ============================================================================

/// Bridge coordinator, request correlation, caching and transfers.
///
/// Use [`Bridge::new`] and [`Bridge::serve`] to start.
pub mod bridge;

/// Bridge configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Item and store ids are normalized to text however the client sends them.
pub mod identifiers;

/// WebSocket protocol message types.
pub mod protocol;

/// Pure inventory queries over a snapshot.
pub mod query;

/// WebSocket transport layer.
///
/// Internal module handling the server, TLS and the current connection.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{Bridge, SnapshotSource, TransferOutcome};

// Configuration
pub use config::{BridgeConfig, BridgeConfigBuilder};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConnectionId, ItemId, RequestId, StoreId};

// Protocol types
pub use protocol::{
    InventorySnapshot, Item, ItemKind, Store, Timestamp, TransferRequest, TransferResult,
    TransferTarget,
};

// Query types
pub use query::{ArmorSummary, ItemSummary, WeaponSummary};

// Transport types
pub use transport::ServerHandle;
