//! Bridge configuration
//!
//! All knobs can be set through environment variables so the bridge is
//! usable unconfigured against a local IMS:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | IMS_HOST | localhost | IMS host |
//! | IMS_PORT | 5172 | IMS port (WebSocket and REST) |
//! | IMS_AUTH_TOKEN | aglet_secure_token_2024 | credential for query/update |
//! | IMS_RECONNECT_INTERVAL_MS | 5000 | fixed delay before reconnect |
//! | IMS_REQUEST_TIMEOUT_MS | 10000 | per-request deadline |
//! | IMS_BULK_TIMEOUT_MS | 5000 | bulk sync HTTP timeout |
//! | IMS_HTTP_URL | http://{host}:{port} | bulk sync base URL override |

use std::time::Duration;

/// Configuration for connecting to the inventory-management service.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// IMS host name
    pub host: String,
    /// IMS port, shared by the WebSocket and REST endpoints
    pub port: u16,
    /// Credential attached to every stock query/update
    pub auth_token: String,
    /// Fixed delay between a drop and the next connect attempt
    pub reconnect_interval: Duration,
    /// Deadline for each correlated request
    pub request_timeout: Duration,
    /// Timeout for bulk sync HTTP calls
    pub bulk_timeout: Duration,
    /// Base URL for the bulk sync REST endpoints, when it differs from
    /// `http://{host}:{port}`
    pub http_base_url: Option<String>,
}

impl BridgeConfig {
    /// Load configuration from environment variables, falling back to
    /// development defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("IMS_HOST") {
            config.host = host;
        }
        if let Some(port) = env_parse("IMS_PORT") {
            config.port = port;
        }
        if let Ok(token) = std::env::var("IMS_AUTH_TOKEN") {
            config.auth_token = token;
        }
        if let Some(ms) = env_parse("IMS_RECONNECT_INTERVAL_MS") {
            config.reconnect_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse("IMS_REQUEST_TIMEOUT_MS") {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse("IMS_BULK_TIMEOUT_MS") {
            config.bulk_timeout = Duration::from_millis(ms);
        }
        if let Ok(url) = std::env::var("IMS_HTTP_URL") {
            config.http_base_url = Some(url);
        }
        config
    }

    /// Set the IMS host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the IMS port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the auth credential
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = token.into();
        self
    }

    /// Set the reconnect interval
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Set the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override the bulk sync base URL
    pub fn with_http_base_url(mut self, url: impl Into<String>) -> Self {
        self.http_base_url = Some(url.into());
        self
    }

    /// WebSocket endpoint of the IMS
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}/ws", self.host, self.port)
    }

    /// Base URL for the bulk sync REST endpoints
    pub fn http_base_url(&self) -> String {
        self.http_base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.host, self.port))
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5172,
            auth_token: "aglet_secure_token_2024".into(),
            reconnect_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            bulk_timeout: Duration::from_secs(5),
            http_base_url: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_development_friendly() {
        let config = BridgeConfig::default();
        assert_eq!(config.ws_url(), "ws://localhost:5172/ws");
        assert_eq!(config.http_base_url(), "http://localhost:5172");
        assert_eq!(config.reconnect_interval, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn http_base_url_override_wins() {
        let config = BridgeConfig::default().with_http_base_url("https://ims.internal:7183");
        assert_eq!(config.http_base_url(), "https://ims.internal:7183");
        // WebSocket URL still derives from host/port
        assert_eq!(config.ws_url(), "ws://localhost:5172/ws");
    }
}
