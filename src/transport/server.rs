//! WebSocket server the inventory client connects to.
//!
//! # Connection Flow
//!
//! 1. Bridge binds the configured port (`9130` by default)
//! 2. Client connects with `wss://` when a certificate pair is present,
//!    `ws://` otherwise
//! 3. TLS handshake (optional), then WebSocket upgrade
//! 4. Client sends `hello` and starts pushing weapons/armor
//! 5. The newest connection becomes the one requests are sent over

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::accept_async_with_config;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{debug, error, info, warn};

use crate::bridge::BridgeContext;
use crate::error::{Error, Result};

use super::Connection;
use super::tls;

// ============================================================================
// BridgeServer
// ============================================================================

/// Accept loop bound to the bridge port.
pub struct BridgeServer {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Port the server is bound to.
    port: u16,
    /// TLS acceptor, when a certificate pair was found.
    tls: Option<TlsAcceptor>,
    /// Shared bridge state handed to every connection.
    context: Arc<BridgeContext>,
}

impl BridgeServer {
    /// Binds the configured address and loads TLS if available.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if binding fails
    /// - [`Error::Tls`] if the certificate pair exists but is invalid
    /// - [`Error::Config`] if TLS is required but the pair is missing
    pub async fn bind(context: Arc<BridgeContext>) -> Result<Self> {
        let config = context.config();

        let tls = if config.tls_available() {
            let acceptor = tls::load_acceptor(&config.cert_path, &config.key_path)?;
            info!("Using TLS certificates");
            Some(acceptor)
        } else if config.require_tls {
            return Err(Error::config("TLS required but certificate pair not found"));
        } else {
            if config.cert_path.exists() != config.key_path.exists() {
                warn!(
                    cert = %config.cert_path.display(),
                    key = %config.key_path.display(),
                    "Incomplete certificate pair, serving plaintext"
                );
            }
            None
        };

        let addr = SocketAddr::new(config.bind_ip, config.port);
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        debug!(port, tls = tls.is_some(), "WebSocket server bound");

        Ok(Self {
            listener,
            port,
            tls,
            context,
        })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns `true` if connections are TLS-encrypted.
    #[inline]
    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Returns the URL the client should connect to.
    ///
    /// Format: `ws://localhost:{port}` or `wss://localhost:{port}`
    #[must_use]
    pub fn ws_url(&self) -> String {
        let scheme = if self.is_tls() { "wss" } else { "ws" };
        format!("{scheme}://localhost:{}", self.port)
    }

    /// Starts the accept loop in the background.
    #[must_use]
    pub fn spawn(self) -> ServerHandle {
        let stop = Arc::new(Notify::new());
        let port = self.port;
        let tls = self.is_tls();
        let url = self.ws_url();

        info!(url = %url, "WebSocket server started, waiting for client");

        let task = tokio::spawn(self.accept_loop(Arc::clone(&stop)));

        ServerHandle {
            port,
            tls,
            stop,
            task,
        }
    }

    /// Background task that accepts new connections.
    async fn accept_loop(self, stop: Arc<Notify>) {
        debug!("Accept loop started");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let tls = self.tls.clone();
                        let context = Arc::clone(&self.context);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, addr, tls, context).await {
                                warn!(error = %e, ?addr, "Connection handling failed");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                },

                () = stop.notified() => {
                    debug!("Accept loop shutting down");
                    break;
                }
            }
        }

        // Close the live client too, so it reconnects to whatever comes next.
        if let Some(connection) = self.context.registry().current() {
            connection.shutdown();
        }

        debug!("Accept loop terminated");
    }
}

/// Upgrades one TCP stream and hands it to a [`Connection`].
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    tls: Option<TlsAcceptor>,
    context: Arc<BridgeContext>,
) -> Result<()> {
    debug!(?addr, "New TCP connection");

    match tls {
        Some(acceptor) => {
            let stream = acceptor
                .accept(stream)
                .await
                .map_err(|e| Error::tls(format!("handshake failed: {e}")))?;
            upgrade(stream, addr, context).await
        }
        None => upgrade(stream, addr, context).await,
    }
}

/// WebSocket upgrade without message or frame size limits.
async fn upgrade<S>(stream: S, addr: SocketAddr, context: Arc<BridgeContext>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let config = WebSocketConfig::default()
        .max_message_size(None)
        .max_frame_size(None);

    let ws_stream = accept_async_with_config(stream, Some(config)).await?;

    let connection = Connection::spawn(ws_stream, Some(addr), context);
    info!(connection = %connection.id(), ?addr, "Inventory client connected");

    Ok(())
}

// ============================================================================
// ServerHandle
// ============================================================================

/// Handle to a running accept loop.
pub struct ServerHandle {
    port: u16,
    tls: bool,
    stop: Arc<Notify>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Returns the bound port.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns `true` if the server speaks `wss://`.
    #[inline]
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        self.tls
    }

    /// Returns the URL the client should connect to.
    #[must_use]
    pub fn ws_url(&self) -> String {
        let scheme = if self.tls { "wss" } else { "ws" };
        format!("{scheme}://localhost:{}", self.port)
    }

    /// Stops accepting, closes the live connection and waits for the loop.
    pub async fn shutdown(self) {
        info!(port = self.port, "WebSocket server shutting down");
        self.stop.notify_one();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Accept loop task failed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
