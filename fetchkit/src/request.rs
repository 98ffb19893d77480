//! Request descriptors.
//!
//! A [`Request`] describes one logical call: method, URL, headers, an
//! optional JSON body, the status code that counts as success, how many
//! attempts to make, and the types the response is decoded into.
//! [`Request::send`] executes it through any [`Fetcher`], usually a
//! [`Client`](crate::Client).

mod encoder;

use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};

use crate::FetchError;
use crate::client::Fetcher;
use crate::response::{ErrorBody, decode_body};
use crate::transport::TransportBody;

/// Header set before every attempt when retries are enabled, carrying the
/// zero-based attempt index.
pub const RETRY_COUNT_HEADER: &str = "Retry-Count";

/// Headers every new request starts with.
const DEFAULT_HEADERS: [(&str, &str); 2] = [
    ("Content-Type", "application/json"),
    ("Accept", "application/json"),
];

/// A request descriptor.
///
/// `T` is the success target, decoded when the response status equals the
/// expected status. It defaults to [`IgnoredAny`], which accepts any well
/// formed body and keeps nothing. `E` is the error target, decoded on any
/// other status; it defaults to [`ErrorBody`].
///
/// After [`send`](Request::send), [`status_code`](Request::status_code),
/// [`response`](Request::response) and
/// [`error_response`](Request::error_response) describe the last attempt.
///
/// # Example
///
/// ```ignore
/// use fetchkit::{Client, Request};
///
/// #[derive(serde::Deserialize)]
/// struct Status {
///     status: String,
/// }
///
/// let client = Client::builder().build();
/// let mut request = Request::new()
///     .url("http://localhost:8080/test")
///     .with_response::<Status>();
/// let raw = request.send(&client).await?;
/// assert_eq!(request.response().unwrap().status, "ok");
/// ```
#[derive(Debug, Clone)]
pub struct Request<T = IgnoredAny, E = ErrorBody> {
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    /// Encoded body, or the encoding failure reported by `send`.
    body: Option<Result<Bytes, FetchError>>,
    expected_status: u16,
    retries: u32,
    status_code: u16,
    response: Option<T>,
    error_response: Option<E>,
}

impl Request {
    /// Create a `GET` request expecting `200`, with JSON `Content-Type` and
    /// `Accept` headers and no URL.
    pub fn new() -> Self {
        Self {
            method: "GET".to_string(),
            url: String::new(),
            headers: DEFAULT_HEADERS
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            body: None,
            expected_status: 200,
            retries: 0,
            status_code: 0,
            response: None,
            error_response: None,
        }
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Request<T, E> {
    /// Set the HTTP method. It is validated when the request is sent.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Set the target URL. It is validated when the request is sent.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the request body, encoded as JSON.
    ///
    /// Encoding happens here; a failure (for example a NaN float) is
    /// reported by `send` before anything is dispatched.
    pub fn body<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.body = Some(encoder::encode_json(body));
        self
    }

    /// Decode successful responses into `U`.
    pub fn with_response<U>(self) -> Request<U, E> {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            expected_status: self.expected_status,
            retries: self.retries,
            status_code: self.status_code,
            response: None,
            error_response: self.error_response,
        }
    }

    /// Decode responses with an unexpected status into `F`.
    pub fn with_error_response<F>(self) -> Request<T, F> {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            expected_status: self.expected_status,
            retries: self.retries,
            status_code: self.status_code,
            response: self.response,
            error_response: None,
        }
    }

    /// Set the status code that counts as success.
    pub fn expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    /// Make up to `retries` attempts, stopping at the first success or at
    /// an error that is not [retryable](FetchError::is_retryable).
    ///
    /// With a non-zero count every attempt carries a [`RETRY_COUNT_HEADER`]
    /// header with its zero-based index. Zero means a single attempt
    /// without that header.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set a header, replacing any header with the same name in any case.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name.into(), value.into());
        self
    }

    /// Set `Authorization: Bearer <token>`.
    pub fn bearer_auth(self, token: impl std::fmt::Display) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    fn set_header(&mut self, name: String, value: String) {
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.headers.push((name, value)),
        }
    }

    /// Status code of the last response, or 0 if none was received.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Decoded success value of the last attempt.
    pub fn response(&self) -> Option<&T> {
        self.response.as_ref()
    }

    /// Decoded error value of the last attempt.
    pub fn error_response(&self) -> Option<&E> {
        self.error_response.as_ref()
    }

    pub fn into_response(self) -> Option<T> {
        self.response
    }

    pub fn into_error_response(self) -> Option<E> {
        self.error_response
    }

    pub fn http_method(&self) -> &str {
        &self.method
    }

    pub fn target_url(&self) -> &str {
        &self.url
    }

    /// Headers in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Value of a header, matched case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn expected_status_code(&self) -> u16 {
        self.expected_status
    }

    pub fn retry_count(&self) -> u32 {
        self.retries
    }

    fn reset_outcome(&mut self) {
        self.status_code = 0;
        self.response = None;
        self.error_response = None;
    }

    /// Validate the descriptor and build the transport request.
    pub(crate) fn build_http_request(&self) -> Result<http::Request<TransportBody>, FetchError> {
        if self.url.is_empty() {
            return Err(FetchError::MissingUrl);
        }
        let parse_error = |reason: String| FetchError::Parse {
            url: self.url.clone(),
            reason,
        };
        let uri: http::Uri = self
            .url
            .parse()
            .map_err(|e: http::uri::InvalidUri| parse_error(e.to_string()))?;
        if uri.scheme().is_none() {
            return Err(parse_error("missing scheme".to_string()));
        }
        if uri.authority().is_none() {
            return Err(parse_error("missing host".to_string()));
        }

        let body = match &self.body {
            None => TransportBody::empty(),
            Some(Ok(bytes)) => TransportBody::full(bytes.clone()),
            Some(Err(e)) => return Err(e.clone()),
        };

        let method = http::Method::from_bytes(self.method.as_bytes()).map_err(|e| {
            FetchError::RequestBuild(format!("invalid method {:?}: {e}", self.method))
        })?;

        let mut request = http::Request::new(body);
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                FetchError::RequestBuild(format!("invalid header name {name:?}: {e}"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                FetchError::RequestBuild(format!("invalid value for header {name:?}: {e}"))
            })?;
            request.headers_mut().insert(header_name, header_value);
        }
        Ok(request)
    }
}

impl<T: DeserializeOwned, E: DeserializeOwned> Request<T, E> {
    /// Record the status and decode the body into the matching target.
    ///
    /// Returns the raw body on success. Every error carries it too.
    pub(crate) fn apply_response(
        &mut self,
        response: http::Response<Bytes>,
    ) -> Result<Bytes, FetchError> {
        let (parts, body) = response.into_parts();
        let status = parts.status.as_u16();
        self.status_code = status;
        let content_type = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());

        if status != self.expected_status {
            self.error_response = Some(decode_body(content_type, &body)?);
            return Err(FetchError::UnexpectedStatus {
                expected: self.expected_status,
                actual: status,
                body,
            });
        }

        self.response = Some(decode_body(content_type, &body)?);
        Ok(body)
    }
}

impl<T, E> Request<T, E>
where
    T: DeserializeOwned + Send,
    E: DeserializeOwned + Send,
{
    /// Execute the request, retrying if enabled.
    ///
    /// Returns the raw response body of the first successful attempt, or
    /// the error of the last attempt. An error raised while building the
    /// request ends the loop at once.
    pub async fn send<C: Fetcher>(&mut self, client: &C) -> Result<Bytes, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            if self.retries > 0 {
                self.set_header(RETRY_COUNT_HEADER.to_string(), attempt.to_string());
            }
            self.reset_outcome();
            match client.fetch(self).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt + 1 < self.retries => attempt += 1,
                Err(e) => return Err(e),
            }
        }
    }

    /// [`send`](Request::send), aborted with
    /// [`FetchError::DeadlineExceeded`] once `timeout` has elapsed.
    ///
    /// The deadline covers all attempts. The client timeout still applies
    /// to each attempt; whichever fires first wins.
    pub async fn send_with_timeout<C: Fetcher>(
        &mut self,
        client: &C,
        timeout: Duration,
    ) -> Result<Bytes, FetchError> {
        tokio::time::timeout(timeout, self.send(client))
            .await
            .map_err(|_| FetchError::DeadlineExceeded(timeout))?
    }
}
