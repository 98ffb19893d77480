//! Content-type dispatch decoding.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::FetchError;

/// Body formats fetchkit can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    /// `application/json`, decoded with serde_json.
    Json,
    /// `application/xml`, decoded with quick-xml.
    Xml,
}

impl BodyFormat {
    /// Pick a format from a `Content-Type` header value.
    ///
    /// Only the media type is compared: parameters such as `charset` are
    /// ignored and matching is case-insensitive.
    pub fn from_content_type(content_type: Option<&str>) -> Option<Self> {
        let essence = content_type?.split(';').next()?.trim();
        if essence.eq_ignore_ascii_case("application/json") {
            Some(BodyFormat::Json)
        } else if essence.eq_ignore_ascii_case("application/xml") {
            Some(BodyFormat::Xml)
        } else {
            None
        }
    }

    /// Decode `body` in this format.
    pub fn decode<T: DeserializeOwned>(self, body: &Bytes) -> Result<T, FetchError> {
        let decode_error = |message: String| FetchError::Decode {
            message,
            body: body.clone(),
        };
        match self {
            BodyFormat::Json => serde_json::from_slice(body).map_err(|e| decode_error(e.to_string())),
            BodyFormat::Xml => {
                quick_xml::de::from_reader(body.as_ref()).map_err(|e| decode_error(e.to_string()))
            }
        }
    }
}

/// Decode a buffered response according to its `Content-Type` header.
///
/// # Errors
///
/// [`FetchError::UnsupportedContentType`] for a missing or unknown content
/// type, [`FetchError::Decode`] if the body does not match `T`.
pub fn decode_response<T: DeserializeOwned>(
    response: &http::Response<Bytes>,
) -> Result<T, FetchError> {
    let content_type = response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    decode_body(content_type, response.body())
}

pub(crate) fn decode_body<T: DeserializeOwned>(
    content_type: Option<&str>,
    body: &Bytes,
) -> Result<T, FetchError> {
    match BodyFormat::from_content_type(content_type) {
        Some(format) => format.decode(body),
        None => Err(FetchError::UnsupportedContentType {
            content_type: content_type.map(str::to_string),
            body: body.clone(),
        }),
    }
}
