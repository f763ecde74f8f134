//! TLS acceptor setup from a PEM certificate/key pair.
//!
//! The browser client connects with `wss://`, so the pair usually comes from
//! a locally trusted development CA. No client certificate is requested.

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use rustls::ServerConfig;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::TlsAcceptor;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Acceptor
// ============================================================================

/// Builds a TLS acceptor from PEM files.
///
/// # Errors
///
/// - [`Error::Io`] if either file cannot be read
/// - [`Error::Tls`] if the PEM contents are invalid or do not match
pub fn load_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor> {
    let cert_pem = std::fs::read(cert_path)?;
    let key_pem = std::fs::read(key_path)?;

    let acceptor = acceptor_from_pem(&cert_pem, &key_pem)?;
    debug!(cert = %cert_path.display(), "TLS certificate loaded");

    Ok(acceptor)
}

/// Builds a TLS acceptor from in-memory PEM.
///
/// # Errors
///
/// Returns [`Error::Tls`] if the PEM contents are invalid or do not match.
pub fn acceptor_from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<TlsAcceptor> {
    let certs = parse_certificates(cert_pem)?;
    if certs.is_empty() {
        return Err(Error::tls("no certificates found"));
    }

    let key = parse_private_key(key_pem)?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::tls(format!("protocol versions: {e}")))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| Error::tls(format!("server config error: {e}")))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Parse PEM-encoded certificates.
fn parse_certificates(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    CertificateDer::pem_slice_iter(pem)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::tls(format!("failed to parse certificates: {e}")))
}

/// Parse PEM-encoded private key.
fn parse_private_key(pem: &[u8]) -> Result<PrivateKeyDer<'static>> {
    PrivateKeyDer::from_pem_slice(pem)
        .map_err(|e| Error::tls(format!("failed to parse private key: {e}")))
}

// ============================================================================
// Tests
// ============================================================================
