//! fetchkit client implementation.
//!
//! This module provides the [`Client`] type and the [`Fetcher`] trait that
//! [`Request::send`](crate::Request::send) drives.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, Instrument, info_span};

use crate::FetchError;
use crate::builder::{ClientBuilder, ClientOption};
use crate::request::{RETRY_COUNT_HEADER, Request};
use crate::transport::HttpClient;

/// Performs a single attempt of a request.
///
/// [`Client`] is the real implementation. [`Request::send`] calls
/// `fetch` once per attempt and handles retries itself, so other
/// implementations only have to care about one exchange.
pub trait Fetcher: Sync {
    /// Send `request` once and decode the response into its targets.
    fn fetch<T, E>(
        &self,
        request: &mut Request<T, E>,
    ) -> impl Future<Output = Result<Bytes, FetchError>> + Send
    where
        T: DeserializeOwned + Send,
        E: DeserializeOwned + Send;
}

/// Reusable HTTP client.
///
/// Holds the transport, its timeout and the logger. It is immutable once
/// built and cheap to clone; clones share the connection pool.
///
/// # Example
///
/// ```ignore
/// use fetchkit::{Client, Request};
/// use std::time::Duration;
///
/// let client = Client::builder()
///     .timeout(Duration::from_secs(5))
///     .build();
///
/// let mut request = Request::new().url("http://localhost:8080/health");
/// request.send(&client).await?;
/// ```
#[derive(Clone)]
pub struct Client {
    http: HttpClient,
    logger: Dispatch,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("http", &self.http)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Build a client from options applied in order.
    ///
    /// Equivalent to adding each option to [`Client::builder`].
    pub fn new(options: impl IntoIterator<Item = ClientOption>) -> Self {
        options
            .into_iter()
            .fold(ClientBuilder::new(), ClientBuilder::option)
            .build()
    }

    /// Create a new [`ClientBuilder`].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_parts(http: HttpClient, logger: Dispatch) -> Self {
        Self { http, logger }
    }

    /// The dispatcher that receives this client's spans and events.
    pub fn logger(&self) -> &Dispatch {
        &self.logger
    }

    /// Timeout applied to each exchange, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.http.timeout()
    }

    /// The underlying HTTP client.
    pub fn http_client(&self) -> &HttpClient {
        &self.http
    }

    async fn fetch_once<T, E>(&self, request: &mut Request<T, E>) -> Result<Bytes, FetchError>
    where
        T: DeserializeOwned,
        E: DeserializeOwned,
    {
        let http_request = request.build_http_request().inspect_err(|e| {
            tracing::error!(error = %e, "error creating request");
        })?;

        let response = self.http.execute(http_request).await.inspect_err(|e| {
            tracing::error!(error = %e, "error sending request");
        })?;

        let result = request.apply_response(response);
        match &result {
            Ok(body) => {
                tracing::debug!(status = request.status_code(), bytes = body.len(), "request completed");
            }
            Err(FetchError::UnexpectedStatus {
                expected, actual, ..
            }) => {
                tracing::warn!(expected, actual, "unexpected status code");
            }
            Err(e) => {
                tracing::error!(status = request.status_code(), error = %e, "error decoding response");
            }
        }
        result
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Fetcher for Client {
    async fn fetch<T, E>(&self, request: &mut Request<T, E>) -> Result<Bytes, FetchError>
    where
        T: DeserializeOwned + Send,
        E: DeserializeOwned + Send,
    {
        // The span is created inside so it belongs to the client's logger.
        async {
            let attempt = request.header_value(RETRY_COUNT_HEADER).unwrap_or("0");
            let span = info_span!(
                "fetch",
                http.method = %request.http_method(),
                url = %request.target_url(),
                attempt = %attempt,
            );
            if attempt != "0" {
                span.in_scope(|| tracing::debug!("retrying request"));
            }
            self.fetch_once(request).instrument(span).await
        }
        .with_subscriber(self.logger.clone())
        .await
    }
}
