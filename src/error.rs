//! Error types for the inventory bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use dim_inventory_bridge::{Bridge, Result};
//!
//! async fn example(bridge: &Bridge) -> Result<()> {
//!     let weapons = bridge.weapons_all().await?;
//!     println!("{} weapons", weapons.len());
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::Tls`] |
//! | Connection | [`Error::NotConnected`], [`Error::Timeout`] |
//! | Protocol | [`Error::Protocol`] |
//! | Remote | [`Error::RemoteFailure`], [`Error::PartialFailure`] |
//! | Query | [`Error::NoCharacterFound`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::ItemId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when bridge configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// TLS setup error.
    ///
    /// Returned when the certificate or private key cannot be loaded.
    #[error("TLS error: {message}")]
    Tls {
        /// Description of the TLS error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// No inventory client is connected.
    ///
    /// Returned immediately when a request is issued with no registered
    /// connection. Never waits toward the request deadline.
    #[error("Inventory client not connected")]
    NotConnected,

    /// No matching response arrived before the request deadline.
    #[error("Timed out after {timeout_ms}ms waiting for {kind} response")]
    Timeout {
        /// Request kind that timed out (`pong`, `transfer_items`).
        kind: &'static str,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed or unroutable message.
    ///
    /// Produced while decoding inbound frames and absorbed by the dispatcher,
    /// which logs and drops the frame. Requests never return it; a request
    /// whose response is malformed keeps waiting until its deadline.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Remote Errors
    // ========================================================================
    /// The inventory client reported `success: false`.
    #[error("Remote failure: {message}")]
    RemoteFailure {
        /// Error text supplied by the remote side.
        message: String,
    },

    /// A transfer where some items moved and some did not.
    #[error("Partial failure: {succeeded} transferred, {} failed", .failed.len())]
    PartialFailure {
        /// Number of items transferred.
        succeeded: usize,
        /// Items that failed to transfer.
        failed: Vec<ItemId>,
    },

    // ========================================================================
    // Query Errors
    // ========================================================================
    /// No non-vault store is present in the snapshot.
    #[error("No character found in inventory")]
    NoCharacterFound,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a TLS error.
    #[inline]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(kind: &'static str, timeout_ms: u64) -> Self {
        Self::Timeout { kind, timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a remote failure error.
    #[inline]
    pub fn remote_failure(message: impl Into<String>) -> Self {
        Self::RemoteFailure {
            message: message.into(),
        }
    }

    /// Creates a partial failure error.
    #[inline]
    pub fn partial_failure(succeeded: usize, failed: Vec<ItemId>) -> Self {
        Self::PartialFailure { succeeded, failed }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::NotConnected | Self::WebSocket(_))
    }

    /// Returns `true` if this error reports a remote-side transfer failure.
    #[inline]
    #[must_use]
    pub fn is_remote_error(&self) -> bool {
        matches!(self, Self::RemoteFailure { .. } | Self::PartialFailure { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Requests are never retried automatically; recoverable errors may
    /// succeed when the caller reissues them.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotConnected | Self::Timeout { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::protocol("missing type");
        assert_eq!(err.to_string(), "Protocol error: missing type");
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::timeout("pong", 10_000);
        assert_eq!(
            err.to_string(),
            "Timed out after 10000ms waiting for pong response"
        );
    }

    #[test]
    fn test_partial_failure_display() {
        let err = Error::partial_failure(2, vec![ItemId::from("42")]);
        assert_eq!(err.to_string(), "Partial failure: 2 transferred, 1 failed");
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::timeout("pong", 1).is_timeout());
        assert!(!Error::NotConnected.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::NotConnected.is_connection_error());
        assert!(!Error::NoCharacterFound.is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::NotConnected.is_recoverable());
        assert!(Error::timeout("transfer_items", 30_000).is_recoverable());
        assert!(!Error::remote_failure("nope").is_recoverable());
        assert!(Error::remote_failure("nope").is_remote_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
