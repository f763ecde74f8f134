//! WebSocket transport layer.
//!
//! This module handles communication between the bridge and the inventory
//! client (a browser tab) over one persistent WebSocket.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐                        ┌──────────────────────┐
//! │  Bridge (Rust)       │                        │  Inventory client    │
//! │                      │   WebSocket (wss/ws)   │  (browser tab)       │
//! │  BridgeServer        │◄──────────────────────►│                      │
//! │  → Connection        │     localhost:9130     │  WebSocket client    │
//! │  → Registry          │                        │                      │
//! └──────────────────────┘                        └──────────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `BridgeServer::bind` - Bind the port, load TLS when a pair exists
//! 2. `BridgeServer::spawn` - Accept loop in the background
//! 3. `Connection::spawn` - Register as current, run the dispatcher loop
//! 4. Client disconnects - Registry cleared if still current
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Connection handle and dispatcher loop |
//! | `registry` | The single current connection |
//! | `server` | Accept loop and WebSocket upgrade |
//! | `tls` | Certificate loading |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and dispatcher loop.
pub mod connection;

/// Current-connection registry.
pub mod registry;

/// WebSocket server for the inventory client.
pub mod server;

/// TLS acceptor setup.
pub mod tls;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub use registry::ConnectionRegistry;
pub use server::{BridgeServer, ServerHandle};
