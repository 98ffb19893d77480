//! TLS connector setup for the hyper HTTP client.
//!
//! This module builds the HTTPS-or-HTTP connector every [`HttpClient`]
//! dispatches through, plus the TLS configurations it is built from.
//!
//! [`HttpClient`]: super::HttpClient

use std::sync::Arc;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::ClientConfig;

use crate::tls::native_root_store;

/// Protocol versions fetchkit negotiates: TLS 1.2 minimum.
static PROTOCOL_VERSIONS: &[&rustls::SupportedProtocolVersion] =
    &[&rustls::version::TLS13, &rustls::version::TLS12];

/// Crypto provider for TLS connections.
///
/// Uses the process-wide default if the application installed one,
/// otherwise a ring provider that is not installed globally.
fn crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::ring::default_provider()))
}

/// Start a `ClientConfig` with the crypto provider and pinned protocol versions.
pub(crate) fn config_builder()
-> Result<rustls::ConfigBuilder<ClientConfig, rustls::WantsVerifier>, rustls::Error> {
    ClientConfig::builder_with_provider(crypto_provider()).with_protocol_versions(PROTOCOL_VERSIONS)
}

/// Build the default TLS configuration: native roots, no client certificate.
pub fn default_tls_config() -> ClientConfig {
    match config_builder() {
        Ok(builder) => builder
            .with_root_certificates(native_root_store())
            .with_no_client_auth(),
        Err(e) => {
            // Only reachable with a custom global provider lacking TLS 1.2/1.3.
            tracing::warn!(error = %e, "falling back to rustls defaults");
            ClientConfig::builder()
                .with_root_certificates(native_root_store())
                .with_no_client_auth()
        }
    }
}

/// Build an HTTPS connector with the given TLS configuration.
///
/// The connector also accepts plain `http://` URLs; any other scheme is
/// rejected when the connection is attempted.
pub fn build_https_connector(tls_config: ClientConfig) -> HttpsConnector<HttpConnector> {
    HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1()
        .build()
}

// ============================================================================
// Dangerous: Accept Invalid Certificates
// ============================================================================

/// A certificate verifier that accepts any certificate.
///
/// # Warning
///
/// This should only be used for development/testing! It makes the
/// connection vulnerable to man-in-the-middle attacks.
#[derive(Debug)]
pub struct DangerousAcceptAnyCertVerifier {
    schemes: Vec<rustls::SignatureScheme>,
}

impl DangerousAcceptAnyCertVerifier {
    /// Create a verifier advertising the schemes of the active crypto provider.
    pub fn new() -> Self {
        Self {
            schemes: crypto_provider()
                .signature_verification_algorithms
                .supported_schemes(),
        }
    }
}

impl Default for DangerousAcceptAnyCertVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl rustls::client::danger::ServerCertVerifier for DangerousAcceptAnyCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.schemes.clone()
    }
}
