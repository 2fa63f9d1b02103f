//! Configuration values injected into the components that talk to the provider.

use std::{fmt, time::Duration};

/// Everything needed to call the bank-data provider on behalf of this app.
///
/// Built once at start-up and passed to the client explicitly, so tests can
/// substitute their own values or a fake client.
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    /// The base URL of the provider API, e.g. "https://example.biapi.pro/2.0".
    pub base_url: String,
    /// The client ID issued to this app by the provider.
    pub client_id: String,
    /// The client secret issued to this app by the provider.
    pub client_secret: String,
    /// The redirect URI registered with the provider for the code exchange.
    pub redirect_uri: String,
    /// The timeout applied to every upstream request.
    pub timeout: Duration,
}

impl ProviderConfig {
    /// The timeout used for upstream requests unless overridden.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a config with the default request timeout.
    pub fn new(base_url: &str, client_id: &str, client_secret: &str, redirect_uri: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client_id: client_id.to_owned(),
            client_secret: client_secret.to_owned(),
            redirect_uri: redirect_uri.to_owned(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Override the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// Keep the client secret out of logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"********")
            .field("redirect_uri", &self.redirect_uri)
            .field("timeout", &self.timeout)
            .finish()
    }
}
