//! Client builder for fetchkit.
//!
//! Provides [`ClientOption`], the configuration actions a [`Client`] is
//! built from, and a fluent [`ClientBuilder`] over them.

use std::time::Duration;

use rustls::ClientConfig;
use tracing::Dispatch;

use crate::client::Client;
use crate::transport::HttpClient;

/// One configuration action for a [`Client`].
///
/// Options are applied in the order given. Later options win over
/// earlier ones touching the same setting.
#[derive(Debug)]
pub enum ClientOption {
    /// Use a transport with this TLS configuration. The timeout is kept.
    TlsConfig(ClientConfig),
    /// Bound every exchange (connect, send, read the whole response).
    Timeout(Duration),
    /// Replace the transport and its timeout with this client.
    ///
    /// Earlier `TlsConfig` and `Timeout` options are discarded.
    HttpClient(HttpClient),
    /// Send spans and events to this dispatcher.
    Logger(Dispatch),
}

/// Builder for creating a [`Client`].
///
/// Without options the client trusts the native root certificates, has no
/// timeout and logs to the dispatcher that is current when
/// [`build`](ClientBuilder::build) runs.
///
/// # Example
///
/// ```ignore
/// use fetchkit::{ClientBuilder, tls_config};
/// use std::time::Duration;
///
/// let client = ClientBuilder::new()
///     .tls_config(tls_config("ca.crt", "client.crt", "client.key", false)?)
///     .timeout(Duration::from_secs(10))
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ClientBuilder {
    options: Vec<ClientOption>,
}

impl ClientBuilder {
    /// Create a builder with no options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an option.
    pub fn option(mut self, option: ClientOption) -> Self {
        self.options.push(option);
        self
    }

    /// Use a transport with this TLS configuration.
    pub fn tls_config(self, config: ClientConfig) -> Self {
        self.option(ClientOption::TlsConfig(config))
    }

    /// Set the per-exchange timeout.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.option(ClientOption::Timeout(timeout))
    }

    /// Replace the transport and timeout with a custom client.
    pub fn http_client(self, client: HttpClient) -> Self {
        self.option(ClientOption::HttpClient(client))
    }

    /// Send spans and events to `logger` instead of the current dispatcher.
    pub fn logger(self, logger: impl Into<Dispatch>) -> Self {
        self.option(ClientOption::Logger(logger.into()))
    }

    /// Build the client.
    pub fn build(self) -> Client {
        let mut http: Option<HttpClient> = None;
        let mut timeout: Option<Duration> = None;
        let mut logger: Option<Dispatch> = None;

        for option in self.options {
            match option {
                ClientOption::TlsConfig(config) => {
                    http = Some(HttpClient::builder().tls_config(config).build());
                }
                ClientOption::Timeout(limit) => timeout = Some(limit),
                ClientOption::HttpClient(client) => {
                    timeout = client.timeout();
                    http = Some(client);
                }
                ClientOption::Logger(dispatch) => logger = Some(dispatch),
            }
        }

        let http = http.unwrap_or_default().with_timeout(timeout);
        let logger = logger.unwrap_or_else(|| tracing::dispatcher::get_default(Dispatch::clone));
        Client::from_parts(http, logger)
    }
}
