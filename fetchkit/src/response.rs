//! Response decoding for fetchkit.
//!
//! This module provides [`ErrorBody`], the default error target, and the
//! content-type driven decoder used on both the success and error paths.

mod decoder;

pub use decoder::{BodyFormat, decode_response};
pub(crate) use decoder::decode_body;

use serde::Deserialize;

/// Default error target: a body with a single `error` field.
///
/// Matches responses such as `{"error": "not found"}`. A body without the
/// field decodes to an empty string.
///
/// # Example
///
/// ```ignore
/// let mut request = Request::new().url(url);
/// if let Err(FetchError::UnexpectedStatus { .. }) = request.send(&client).await {
///     println!("server said: {}", request.error_response().unwrap().error);
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: String,
}
