//! Tracks the single live client connection.
//!
//! Last-connected wins: attaching a new connection silently replaces the
//! previous one. The replaced connection is not closed; it keeps running
//! until its client disconnects, and its eventual detach is a no-op.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::identifiers::ConnectionId;

use super::Connection;

// ============================================================================
// ConnectionRegistry
// ============================================================================

/// Holder of the current [`Connection`].
///
/// Read from caller context on every request and written from the
/// connection tasks on connect/disconnect, so every access goes through
/// one mutex. The lock is never held across an await.
#[derive(Default)]
pub struct ConnectionRegistry {
    current: Mutex<Option<Connection>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `connection` as current.
    ///
    /// Returns the connection it replaced, if any.
    pub fn attach(&self, connection: Connection) -> Option<Connection> {
        let id = connection.id();
        let previous = self.current.lock().replace(connection);

        match &previous {
            Some(old) => info!(
                connection = %id,
                replaced = %old.id(),
                "Client reconnected, replacing previous connection"
            ),
            None => info!(connection = %id, "Client connection registered"),
        }

        previous
    }

    /// Clears the registry if it still refers to `id`.
    ///
    /// Returns `true` if the registry was cleared. A detach from a
    /// connection that has already been replaced leaves the registry alone.
    pub fn detach(&self, id: ConnectionId) -> bool {
        let mut current = self.current.lock();

        if current.as_ref().is_some_and(|conn| conn.id() == id) {
            *current = None;
            info!(connection = %id, "Client connection cleared");
            true
        } else {
            debug!(connection = %id, "Stale detach ignored");
            false
        }
    }

    /// Returns the current connection handle.
    #[must_use]
    pub fn current(&self) -> Option<Connection> {
        self.current.lock().clone()
    }

    /// Returns `true` if a connection is registered.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.current.lock().is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry() {
        let registry = ConnectionRegistry::new();
        assert!(registry.current().is_none());
        assert!(!registry.is_connected());
    }

    #[test]
    fn test_attach_and_detach() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = Connection::detached(4);
        let id = conn.id();

        assert!(registry.attach(conn).is_none());
        assert_eq!(registry.current().map(|c| c.id()), Some(id));

        assert!(registry.detach(id));
        assert!(registry.current().is_none());
    }

    #[test]
    fn test_last_connected_wins() {
        let registry = ConnectionRegistry::new();
        let (first, _rx1) = Connection::detached(4);
        let (second, _rx2) = Connection::detached(4);
        let first_id = first.id();
        let second_id = second.id();

        registry.attach(first);
        let replaced = registry.attach(second);
        assert_eq!(replaced.map(|c| c.id()), Some(first_id));
        assert_eq!(registry.current().map(|c| c.id()), Some(second_id));
    }

    #[test]
    fn test_stale_detach_is_noop() {
        let registry = ConnectionRegistry::new();
        let (first, _rx1) = Connection::detached(4);
        let (second, _rx2) = Connection::detached(4);
        let first_id = first.id();
        let second_id = second.id();

        registry.attach(first);
        registry.attach(second);

        assert!(!registry.detach(first_id));
        assert_eq!(registry.current().map(|c| c.id()), Some(second_id));
    }
}
