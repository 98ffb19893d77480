//! Fluent HTTP requests for Rust.
//!
//! This crate wraps a hyper client behind a small request builder: describe
//! a call with [`Request`], execute it with a reusable [`Client`], and get
//! back the raw response bytes plus the body decoded into either a success
//! or an error type depending on the status code.
//!
//! ## Features
//!
//! - Reusable client with optional TLS, timeout and logger
//! - JSON request bodies
//! - Status-gated decoding: success target on the expected status, error
//!   target otherwise
//! - JSON and XML responses, chosen by `Content-Type`
//! - Retries with a `Retry-Count` header
//! - Client certificates loaded from PEM files
//!
//! ## Example
//!
//! ```ignore
//! use fetchkit::{Client, FetchError, Request};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize)]
//! struct NewTodo<'a> {
//!     title: &'a str,
//! }
//!
//! #[derive(Deserialize)]
//! struct Todo {
//!     id: u64,
//!     title: String,
//! }
//!
//! let client = Client::builder().build();
//!
//! let mut request = Request::new()
//!     .method("POST")
//!     .url("http://localhost:8080/todos")
//!     .body(&NewTodo { title: "Buy milk" })
//!     .bearer_auth("token")
//!     .expected_status(201)
//!     .with_response::<Todo>();
//!
//! match request.send(&client).await {
//!     Ok(_raw) => println!("created {}", request.response().unwrap().id),
//!     Err(FetchError::UnexpectedStatus { actual, .. }) => {
//!         println!("{actual}: {}", request.error_response().unwrap().error);
//!     }
//!     Err(e) => return Err(e.into()),
//! }
//! ```
//!
//! ## Retries
//!
//! ```ignore
//! let mut request = Request::new().url("http://localhost:8080/flaky").retries(3);
//!
//! // Up to three attempts carrying `Retry-Count: 0`, `1` and `2`.
//! request.send(&client).await?;
//! ```
//!
//! ## TLS
//!
//! ```ignore
//! use fetchkit::{Client, tls_config};
//!
//! let client = Client::builder()
//!     .tls_config(tls_config("ca.crt", "client.crt", "client.key", false)?)
//!     .build();
//! ```

mod builder;
mod client;
mod error;
pub mod request;
pub mod response;
pub mod tls;
pub mod transport;

pub use builder::{ClientBuilder, ClientOption};
pub use client::{Client, Fetcher};
pub use error::FetchError;

pub use request::{RETRY_COUNT_HEADER, Request};
pub use response::{BodyFormat, ErrorBody, decode_response};
pub use tls::{TlsFiles, tls_config};
pub use transport::{HttpClient, HttpClientBuilder, TlsClientConfig, TransportBody};

// Re-export commonly used types
pub use bytes::Bytes;
