//! Error types for fetchkit.
//!
//! This module provides [`FetchError`], the single error type returned by
//! client construction helpers and by [`Request::send`](crate::Request::send).

use std::time::Duration;

use bytes::Bytes;

/// Errors returned while configuring TLS or executing a request.
///
/// Errors raised after a response was received carry the exact response
/// bytes, available through [`FetchError::body`]. Errors raised before
/// dispatch (URL, encoding, request building) carry none.
#[derive(Clone, Debug, thiserror::Error)]
pub enum FetchError {
    /// Bad or missing TLS material.
    #[error("TLS configuration error: {0}")]
    Config(String),

    /// No URL was set on the request.
    #[error("missing URL")]
    MissingUrl,

    /// The URL could not be parsed.
    #[error("invalid URL {url:?}: {reason}")]
    Parse { url: String, reason: String },

    /// The request body could not be serialized.
    #[error("encode error: {0}")]
    Encode(String),

    /// The transport-level request could not be built (bad method or header).
    #[error("failed to build request: {0}")]
    RequestBuild(String),

    /// Network-level failure (connection refused, DNS, unsupported scheme, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The client timeout or a per-call deadline fired.
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    /// The status code differed from the expected one and the body was
    /// decoded into the error target.
    #[error("unexpected status code: expected {expected}, got {actual}")]
    UnexpectedStatus {
        expected: u16,
        actual: u16,
        body: Bytes,
    },

    /// The response body could not be decoded into the target.
    #[error("error decoding response: {message}")]
    Decode { message: String, body: Bytes },

    /// The response declared a content type there is no decoder for.
    #[error("unsupported content type: {}", .content_type.as_deref().unwrap_or("<none>"))]
    UnsupportedContentType {
        content_type: Option<String>,
        body: Bytes,
    },
}

impl FetchError {
    /// Raw response bytes, if a response was received.
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            FetchError::UnexpectedStatus { body, .. }
            | FetchError::Decode { body, .. }
            | FetchError::UnsupportedContentType { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Actual status code for [`FetchError::UnexpectedStatus`].
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::UnexpectedStatus { actual, .. } => Some(*actual),
            _ => None,
        }
    }

    /// Whether the request never got a response because of the network or a deadline.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FetchError::Transport(_) | FetchError::DeadlineExceeded(_)
        )
    }

    /// Whether another attempt could succeed.
    ///
    /// Errors raised while building the request fail the same way every
    /// time.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            FetchError::Config(_)
                | FetchError::MissingUrl
                | FetchError::Parse { .. }
                | FetchError::Encode(_)
                | FetchError::RequestBuild(_)
        )
    }
}

/// Render an error followed by every error in its source chain.
///
/// hyper and hyper-util keep the interesting part ("connection refused",
/// "unsupported scheme") in the source, not in the top-level message.
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_message = cause.to_string();
        if !message.ends_with(&cause_message) {
            message.push_str(": ");
            message.push_str(&cause_message);
        }
        source = cause.source();
    }
    message
}
