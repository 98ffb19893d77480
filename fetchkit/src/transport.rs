//! HTTP transport layer for fetchkit.
//!
//! This module provides the [`HttpClient`] type, which handles HTTP
//! communication using hyper_util's legacy client. It supports:
//!
//! - HTTP/1.1 over plain TCP or TLS (rustls, ring provider)
//! - Connection pooling
//! - A per-exchange timeout
//! - Tower service integration for middleware
//!
//! # Example
//!
//! ```ignore
//! use fetchkit::transport::HttpClient;
//! use std::time::Duration;
//!
//! // Native roots, no timeout
//! let http = HttpClient::new();
//!
//! // Or use the builder for customization
//! let http = HttpClient::builder()
//!     .timeout(Duration::from_secs(10))
//!     .build();
//! ```

mod body;
mod connector;
mod hyper;

pub use body::TransportBody;
pub use connector::{DangerousAcceptAnyCertVerifier, build_https_connector, default_tls_config};
pub(crate) use connector::config_builder;
pub use hyper::{HttpClient, HttpClientBuilder};

// Re-export rustls types that users might need for TLS configuration
pub use rustls::ClientConfig as TlsClientConfig;
