//! Bridge configuration and its builder.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use dim_inventory_bridge::BridgeConfig;
//!
//! # fn example() -> dim_inventory_bridge::Result<()> {
//! let config = BridgeConfig::builder()
//!     .port(9130)
//!     .tls_paths("/etc/dim-bridge/cert.pem", "/etc/dim-bridge/key.pem")
//!     .transfer_timeout(Duration::from_secs(45))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Port the inventory client connects to.
pub const DEFAULT_PORT: u16 = 9130;

/// Deadline for a full-snapshot `ping`/`pong` round trip.
pub const DEFAULT_INVENTORY_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for a `transfer_items` round trip.
///
/// Longer than the snapshot deadline since moves go through the game API.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(30);

/// Depth of each connection's outbound command queue.
pub const DEFAULT_MAX_QUEUE: usize = 64;

/// Directory name under the user config dir holding `cert.pem`/`key.pem`.
const TLS_DIR_NAME: &str = "dim-mcp-bridge";

const CERT_FILE: &str = "cert.pem";
const KEY_FILE: &str = "key.pem";

// ============================================================================
// BridgeConfig
// ============================================================================

/// Validated bridge configuration.
///
/// Use [`BridgeConfig::builder()`] to create one, or
/// [`BridgeConfig::default()`] for the stock settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Address to bind the WebSocket server to.
    pub bind_ip: IpAddr,
    /// Port to bind (0 = OS-assigned).
    pub port: u16,
    /// PEM certificate chain.
    pub cert_path: PathBuf,
    /// PEM private key.
    pub key_path: PathBuf,
    /// Fail at startup instead of serving plaintext when the pair is missing.
    pub require_tls: bool,
    /// Snapshot round-trip deadline.
    pub inventory_timeout: Duration,
    /// Transfer round-trip deadline.
    pub transfer_timeout: Duration,
    /// Outbound command queue depth per connection.
    pub max_queue: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let tls_dir = default_tls_dir();
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            cert_path: tls_dir.join(CERT_FILE),
            key_path: tls_dir.join(KEY_FILE),
            require_tls: false,
            inventory_timeout: DEFAULT_INVENTORY_TIMEOUT,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            max_queue: DEFAULT_MAX_QUEUE,
        }
    }
}

impl BridgeConfig {
    /// Creates a new builder seeded with the defaults.
    #[inline]
    #[must_use]
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::new()
    }

    /// Returns `true` when both halves of the TLS pair exist on disk.
    #[must_use]
    pub fn tls_available(&self) -> bool {
        self.cert_path.is_file() && self.key_path.is_file()
    }
}

/// `<config_dir>/dim-mcp-bridge`, or the working directory when the
/// platform has no config dir.
fn default_tls_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(TLS_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

// ============================================================================
// BridgeConfigBuilder
// ============================================================================

/// Builder for [`BridgeConfig`].
#[derive(Debug, Clone)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl Default for BridgeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeConfigBuilder {
    /// Creates a builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: BridgeConfig::default(),
        }
    }

    /// Sets the bind address.
    #[inline]
    #[must_use]
    pub fn bind_ip(mut self, ip: IpAddr) -> Self {
        self.config.bind_ip = ip;
        self
    }

    /// Sets the port (0 for a random port).
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the certificate and key locations.
    #[inline]
    #[must_use]
    pub fn tls_paths(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.config.cert_path = cert.into();
        self.config.key_path = key.into();
        self
    }

    /// Looks for `cert.pem` and `key.pem` inside `dir`.
    #[inline]
    #[must_use]
    pub fn tls_dir(self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        self.tls_paths(dir.join(CERT_FILE), dir.join(KEY_FILE))
    }

    /// Refuses to start without a certificate/key pair.
    #[inline]
    #[must_use]
    pub fn require_tls(mut self, require: bool) -> Self {
        self.config.require_tls = require;
        self
    }

    /// Sets the snapshot round-trip deadline.
    #[inline]
    #[must_use]
    pub fn inventory_timeout(mut self, timeout: Duration) -> Self {
        self.config.inventory_timeout = timeout;
        self
    }

    /// Sets the transfer round-trip deadline.
    #[inline]
    #[must_use]
    pub fn transfer_timeout(mut self, timeout: Duration) -> Self {
        self.config.transfer_timeout = timeout;
        self
    }

    /// Sets the per-connection outbound queue depth.
    #[inline]
    #[must_use]
    pub fn max_queue(mut self, depth: usize) -> Self {
        self.config.max_queue = depth;
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if a timeout or the queue depth is zero
    /// - [`Error::Config`] if TLS is required but the pair is missing
    pub fn build(self) -> Result<BridgeConfig> {
        let config = self.config;

        if config.inventory_timeout.is_zero() || config.transfer_timeout.is_zero() {
            return Err(Error::config("request timeouts must be non-zero"));
        }

        if config.max_queue == 0 {
            return Err(Error::config("max_queue must be at least 1"));
        }

        if config.require_tls && !config.tls_available() {
            return Err(Error::config(format!(
                "TLS required but certificate pair not found: {} / {}",
                config.cert_path.display(),
                config.key_path.display()
            )));
        }

        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.port, 9130);
        assert_eq!(config.bind_ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.inventory_timeout, Duration::from_secs(10));
        assert_eq!(config.transfer_timeout, Duration::from_secs(30));
        assert_eq!(config.max_queue, 64);
        assert!(config.cert_path.ends_with("cert.pem"));
        assert!(config.key_path.ends_with("key.pem"));
    }

    #[test]
    fn test_builder_overrides() {
        let config = BridgeConfig::builder()
            .port(0)
            .inventory_timeout(Duration::from_millis(250))
            .max_queue(8)
            .tls_dir("/nonexistent")
            .build()
            .expect("valid config");

        assert_eq!(config.port, 0);
        assert_eq!(config.inventory_timeout, Duration::from_millis(250));
        assert_eq!(config.max_queue, 8);
        assert_eq!(config.cert_path, PathBuf::from("/nonexistent/cert.pem"));
        assert!(!config.tls_available());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = BridgeConfig::builder()
            .transfer_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_zero_queue_rejected() {
        assert!(BridgeConfig::builder().max_queue(0).build().is_err());
    }

    #[test]
    fn test_require_tls_without_pair() {
        let err = BridgeConfig::builder()
            .tls_dir("/nonexistent")
            .require_tls(true)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("TLS required"));
    }

    #[test]
    fn test_tls_available_with_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cert.pem"), "x").unwrap();
        std::fs::write(dir.path().join("key.pem"), "y").unwrap();

        let config = BridgeConfig::builder()
            .tls_dir(dir.path())
            .require_tls(true)
            .build()
            .expect("pair present");
        assert!(config.tls_available());
    }
}
