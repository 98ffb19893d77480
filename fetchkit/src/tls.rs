//! TLS material loading.
//!
//! Builds a `rustls::ClientConfig` from PEM files on disk, and keeps a
//! process-wide cache of the OS root certificates so repeated client
//! construction does not hit the certificate store again.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use rustls::{ClientConfig, RootCertStore};
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use serde::Deserialize;

use crate::FetchError;
use crate::transport::{DangerousAcceptAnyCertVerifier, config_builder};

/// Cached native root certificates.
/// Always stores Ok; empty vec means no certs found (warned, not errored).
static NATIVE_ROOTS_CACHE: OnceLock<Vec<CertificateDer<'static>>> = OnceLock::new();

fn load_native_certs_inner() -> Vec<CertificateDer<'static>> {
    let result = rustls_native_certs::load_native_certs();

    for err in &result.errors {
        tracing::warn!(error = %err, "error loading native root certificate");
    }

    if result.certs.is_empty() {
        tracing::warn!("no native root CA certificates found");
    } else {
        tracing::debug!(count = result.certs.len(), "loaded native root certificates");
    }

    result.certs
}

/// Get cached native root certificates.
///
/// Loaded lazily on first call; may be empty.
pub fn native_root_certs() -> &'static [CertificateDer<'static>] {
    NATIVE_ROOTS_CACHE
        .get_or_init(load_native_certs_inner)
        .as_slice()
}

/// Root store built from the cached native certificates.
pub(crate) fn native_root_store() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(native_root_certs().iter().cloned());
    if ignored > 0 {
        tracing::debug!(added, ignored, "skipped unparsable native root certificates");
    }
    roots
}

/// Build a TLS configuration from PEM files.
///
/// `cert` and `key` are required and name the client certificate chain and
/// its private key. `ca` is optional: when empty the cached native roots
/// are trusted, otherwise only the certificates in that file.
/// `insecure_skip_verify` disables server certificate verification and
/// must only be used for testing.
///
/// Protocol versions are limited to TLS 1.2 and 1.3. rustls never
/// renegotiates.
///
/// # Errors
///
/// [`FetchError::Config`] if a path is missing, a file cannot be read or
/// holds no usable PEM data.
pub fn tls_config(
    ca: impl AsRef<Path>,
    cert: impl AsRef<Path>,
    key: impl AsRef<Path>,
    insecure_skip_verify: bool,
) -> Result<ClientConfig, FetchError> {
    let (ca, cert, key) = (ca.as_ref(), cert.as_ref(), key.as_ref());
    if cert.as_os_str().is_empty() || key.as_os_str().is_empty() {
        tracing::error!("TLS key and cert file paths not provided, TLS not configured");
        return Err(FetchError::Config(
            "TLS key and cert file paths not provided, TLS not configured".to_string(),
        ));
    }

    let roots = if ca.as_os_str().is_empty() {
        native_root_store()
    } else {
        load_cert_pool(ca).inspect_err(|e| {
            tracing::error!(error = %e, "error loading CA certificate");
        })?
    };

    let (chain, private_key) = load_key_pair(cert, key).inspect_err(|e| {
        tracing::error!(error = %e, "error loading certificate and key");
    })?;

    let builder = config_builder().map_err(|e| FetchError::Config(e.to_string()))?;
    let builder = if insecure_skip_verify {
        tracing::warn!("TLS certificate verification disabled");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousAcceptAnyCertVerifier::new()))
    } else {
        builder.with_root_certificates(roots)
    };

    builder.with_client_auth_cert(chain, private_key).map_err(|e| {
        FetchError::Config(format!(
            "could not load keypair {}:{}: {e}",
            cert.display(),
            key.display()
        ))
    })
}

fn load_cert_pool(path: &Path) -> Result<RootCertStore, FetchError> {
    let pem = std::fs::read(path).map_err(|e| {
        FetchError::Config(format!(
            "could not read certificate {}: {e}",
            path.display()
        ))
    })?;

    let mut roots = RootCertStore::empty();
    for cert in CertificateDer::pem_slice_iter(&pem).flatten() {
        // Unparsable entries are skipped; only an empty pool is an error.
        let _ = roots.add(cert);
    }

    if roots.is_empty() {
        return Err(FetchError::Config(format!(
            "could not parse any PEM certificates {}",
            path.display()
        )));
    }
    Ok(roots)
}

fn load_key_pair(
    cert: &Path,
    key: &Path,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), FetchError> {
    let keypair_error = |reason: String| {
        FetchError::Config(format!(
            "could not load keypair {}:{}: {reason}",
            cert.display(),
            key.display()
        ))
    };

    let cert_pem = std::fs::read(cert).map_err(|e| keypair_error(e.to_string()))?;
    let chain = CertificateDer::pem_slice_iter(&cert_pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| keypair_error(e.to_string()))?;
    if chain.is_empty() {
        return Err(keypair_error(
            "failed to find any PEM data in certificate input".to_string(),
        ));
    }

    let key_pem = std::fs::read(key).map_err(|e| keypair_error(e.to_string()))?;
    let private_key = PrivateKeyDer::from_pem_slice(&key_pem).map_err(|e| match e {
        rustls_pki_types::pem::Error::NoItemsFound => {
            keypair_error("failed to find any PEM data in key input".to_string())
        }
        other => keypair_error(other.to_string()),
    })?;

    Ok((chain, private_key))
}

/// TLS file locations, deserializable from application configuration.
///
/// ```ignore
/// let files: TlsFiles = serde_json::from_str(r#"{"cert": "client.crt", "key": "client.key"}"#)?;
/// let client = fetchkit::Client::builder().tls_config(files.load()?).build();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TlsFiles {
    /// CA bundle; native roots are used when absent.
    pub ca: Option<PathBuf>,
    pub cert: PathBuf,
    pub key: PathBuf,
    pub insecure_skip_verify: bool,
}

impl TlsFiles {
    /// Load the files into a TLS configuration. See [`tls_config`].
    pub fn load(&self) -> Result<ClientConfig, FetchError> {
        tls_config(
            self.ca.as_deref().unwrap_or(Path::new("")),
            &self.cert,
            &self.key,
            self.insecure_skip_verify,
        )
    }
}
