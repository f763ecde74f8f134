//! WebSocket connection and inbound dispatcher loop.
//!
//! # Event Loop
//!
//! Each accepted connection spawns one tokio task that handles:
//!
//! - Incoming frames from the client, decoded and routed (the dispatcher)
//! - Outgoing frames queued by [`Connection::send`]
//! - Shutdown requests
//!
//! # Routing
//!
//! | Inbound | Action |
//! |---------|--------|
//! | `hello` | logged, no state change |
//! | `weapons` / `armor` | replace the cached list |
//! | `pong` | resolve the `pong` slot |
//! | `transfer_items_response` | resolve the `transfer_items` slot |
//! | anything else | ignored |
//!
//! Frames that fail to decode are logged and dropped; the connection stays
//! open. This includes `pong` and `transfer_items_response` frames whose
//! body is malformed: the waiting request stays pending.
//!
//! On close the registry is cleared only if it still points at this
//! connection. Outstanding requests are left to reach their own deadline.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Notify, mpsc};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

use crate::bridge::{BridgeContext, SnapshotSource};
use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::{InboundMessage, ItemKind, Reply, RequestKind};

// ============================================================================
// Connection
// ============================================================================

/// Handle to one client connection.
///
/// Cheap to clone; all clones feed the same outbound queue. Valid only while
/// the connection is open: once the event loop exits, [`Connection::send`]
/// fails with [`Error::NotConnected`].
#[derive(Clone)]
pub struct Connection {
    /// Process-local identity.
    id: ConnectionId,
    /// Remote address, when accepted from a socket.
    peer: Option<SocketAddr>,
    /// Outbound frame queue (bounded).
    outbound_tx: mpsc::Sender<String>,
    /// Wakes the event loop to close the socket.
    shutdown: Arc<Notify>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Wraps an upgraded WebSocket stream.
    ///
    /// Registers the connection as current and spawns its event loop.
    pub(crate) fn spawn<S>(
        ws_stream: WebSocketStream<S>,
        peer: Option<SocketAddr>,
        context: Arc<BridgeContext>,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound_tx, outbound_rx) = mpsc::channel(context.config().max_queue);
        let connection = Self {
            id: ConnectionId::next(),
            peer,
            outbound_tx,
            shutdown: Arc::new(Notify::new()),
        };

        context.registry().attach(connection.clone());

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            connection.id,
            outbound_rx,
            Arc::clone(&connection.shutdown),
            context,
        ));

        connection
    }

    /// Returns the connection id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the client address.
    #[inline]
    #[must_use]
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Queues one text frame for the client.
    ///
    /// Waits for queue space when the outbound queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if the event loop has exited.
    pub async fn send(&self, text: String) -> Result<()> {
        self.outbound_tx
            .send(text)
            .await
            .map_err(|_| Error::NotConnected)
    }

    /// Asks the event loop to close the socket.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        id: ConnectionId,
        mut outbound_rx: mpsc::Receiver<String>,
        shutdown: Arc<Notify>,
        context: Arc<BridgeContext>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();
        let mut outbound_open = true;

        loop {
            tokio::select! {
                // Incoming frames from the client
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_message(&text, id, &context);
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(connection = %id, ?frame, "WebSocket closed by client");
                            break;
                        }

                        Some(Err(e)) => {
                            warn!(connection = %id, error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!(connection = %id, "WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Frames queued by requests
                outbound = outbound_rx.recv(), if outbound_open => {
                    match outbound {
                        Some(text) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                warn!(connection = %id, error = %e, "Failed to send frame");
                                break;
                            }
                            trace!(connection = %id, "Frame sent");
                        }

                        // Every handle dropped; keep serving inbound pushes.
                        None => outbound_open = false,
                    }
                }

                () = shutdown.notified() => {
                    debug!(connection = %id, "Shutdown requested");
                    let _ = ws_write.close().await;
                    break;
                }
            }
        }

        context.registry().detach(id);
        info!(connection = %id, "Connection closed");
    }

    /// Decodes one text frame and routes it. Malformed frames are dropped.
    fn handle_incoming_message(text: &str, id: ConnectionId, context: &BridgeContext) {
        match InboundMessage::decode(text) {
            Ok(message) => route(message, id, context),
            Err(e) => {
                warn!(connection = %id, error = %e, len = text.len(), "Dropping inbound frame");
            }
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Applies one decoded inbound message to the shared bridge state.
pub(crate) fn route(message: InboundMessage, id: ConnectionId, context: &BridgeContext) {
    match message {
        InboundMessage::Hello => {
            info!(connection = %id, "Client said hello");
        }

        InboundMessage::Weapons(items) => {
            debug!(connection = %id, count = items.len(), "Weapons push received");
            context
                .cache()
                .replace_items(ItemKind::Weapon, items, SnapshotSource::Push);
        }

        InboundMessage::Armor(items) => {
            debug!(connection = %id, count = items.len(), "Armor push received");
            context
                .cache()
                .replace_items(ItemKind::Armor, items, SnapshotSource::Push);
        }

        InboundMessage::Pong(envelope) => match envelope.body {
            Ok(snapshot) => {
                debug!(connection = %id, "Pong received");
                context.correlator().complete(
                    RequestKind::Pong,
                    envelope.request_id,
                    Reply::Inventory(snapshot),
                );
            }
            Err(e) => {
                warn!(connection = %id, error = %e, "Dropping malformed pong");
            }
        },

        InboundMessage::TransferItemsResponse(envelope) => match envelope.body {
            Ok(result) => {
                debug!(connection = %id, "Transfer response received");
                context.correlator().complete(
                    RequestKind::TransferItems,
                    envelope.request_id,
                    Reply::Transfer(result),
                );
            }
            Err(e) => {
                warn!(connection = %id, error = %e, "Dropping malformed transfer response");
            }
        },

        InboundMessage::Unknown(kind) => {
            debug!(connection = %id, kind = %kind, "Ignoring unrecognized message");
        }
    }
}

// ============================================================================
// Test Support
// ============================================================================

#[cfg(test)]
impl Connection {
    /// Creates a handle with no socket behind it; frames land in the receiver.
    pub(crate) fn detached(depth: usize) -> (Self, mpsc::Receiver<String>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(depth);
        let connection = Self {
            id: ConnectionId::next(),
            peer: None,
            outbound_tx,
            shutdown: Arc::new(Notify::new()),
        };
        (connection, outbound_rx)
    }
}

// ============================================================================
// Tests
// ============================================================================
