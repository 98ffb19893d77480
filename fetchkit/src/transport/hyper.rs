//! Hyper-based HTTP client for fetchkit.
//!
//! This module provides [`HttpClient`], the transport every request is
//! dispatched through, using hyper_util's legacy client.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rustls::ClientConfig;
use tower_service::Service;

use super::body::TransportBody;
use super::connector::{build_https_connector, default_tls_config};
use crate::FetchError;
use crate::error::error_chain;

/// Type alias for the hyper client with HTTPS connector.
type HyperClient = Client<HttpsConnector<HttpConnector>, TransportBody>;

/// HTTP client using hyper_util's legacy client.
///
/// Cloning is cheap and clones share the connection pool. The optional
/// timeout bounds one full exchange: connecting, sending and reading the
/// whole response body.
///
/// # Example
///
/// ```ignore
/// use fetchkit::HttpClient;
/// use std::time::Duration;
///
/// let http = HttpClient::builder()
///     .timeout(Duration::from_secs(5))
///     .build();
/// ```
#[derive(Clone)]
pub struct HttpClient {
    client: HyperClient,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a new client builder.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Create a client with native root certificates and no timeout.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// The timeout applied to each exchange, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Return a copy of this client with a different timeout.
    ///
    /// The copy shares the connection pool with `self`.
    pub fn with_timeout(&self, timeout: Option<Duration>) -> Self {
        Self {
            client: self.client.clone(),
            timeout,
        }
    }

    /// Send a request and read the full response body.
    pub async fn execute(
        &self,
        request: http::Request<TransportBody>,
    ) -> Result<http::Response<Bytes>, FetchError> {
        execute(self.client.clone(), self.timeout, request).await
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

async fn execute(
    client: HyperClient,
    timeout: Option<Duration>,
    request: http::Request<TransportBody>,
) -> Result<http::Response<Bytes>, FetchError> {
    let target = format!("{} {}", request.method(), request.uri());
    let exchange = async move {
        let response = client
            .request(request)
            .await
            .map_err(|e| FetchError::Transport(format!("{target}: {}", error_chain(&e))))?;
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| {
                FetchError::Transport(format!("{target}: reading body: {}", error_chain(&e)))
            })?
            .to_bytes();
        Ok(http::Response::from_parts(parts, body))
    };

    match timeout {
        Some(limit) => tokio::time::timeout(limit, exchange)
            .await
            .map_err(|_| FetchError::DeadlineExceeded(limit))?,
        None => exchange.await,
    }
}

/// How long an idle pooled connection is kept before it is closed.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Builder for [`HttpClient`].
///
/// # Example
///
/// ```ignore
/// use fetchkit::HttpClientBuilder;
///
/// let http = HttpClientBuilder::new()
///     .tls_config(fetchkit::tls_config("ca.crt", "client.crt", "client.key", false)?)
///     .build();
/// ```
#[derive(Default)]
pub struct HttpClientBuilder {
    /// Custom TLS configuration.
    tls_config: Option<ClientConfig>,
    /// Per-exchange timeout.
    timeout: Option<Duration>,
}

impl HttpClientBuilder {
    /// Create a new builder: native roots, no timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom TLS configuration.
    ///
    /// Use [`tls_config`](crate::tls_config) to build one from PEM files.
    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Set the per-exchange timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> HttpClient {
        let tls_config = self.tls_config.unwrap_or_else(default_tls_config);
        let https_connector = build_https_connector(tls_config);

        let mut builder = Client::builder(TokioExecutor::new());
        // Required for the idle timeout to take effect.
        builder.pool_timer(TokioTimer::new());
        builder.pool_idle_timeout(POOL_IDLE_TIMEOUT);

        HttpClient {
            client: builder.build(https_connector),
            timeout: self.timeout,
        }
    }
}

impl std::fmt::Debug for HttpClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientBuilder")
            .field("tls_config", &self.tls_config.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Service<http::Request<TransportBody>> for HttpClient {
    type Response = http::Response<Bytes>;
    type Error = FetchError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // hyper_util legacy::Client is always ready
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<TransportBody>) -> Self::Future {
        Box::pin(execute(self.client.clone(), self.timeout, req))
    }
}
