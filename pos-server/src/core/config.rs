//! Server configuration
//!
//! All settings come from environment variables with development defaults:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | HTTP_PORT | 3000 | HTTP API port |
//! | DATABASE_URL | sqlite::memory: | local sale-record store |
//! | IMS_* | see `BridgeConfig` | inventory bridge settings |

use ims_bridge::BridgeConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API port
    pub http_port: u16,
    /// SQLite connection string for local sale records
    pub database_url: String,
    /// Inventory bridge configuration
    pub bridge: BridgeConfig,
}

impl Config {
    /// Load configuration from environment variables, with defaults that
    /// work unconfigured in a development setting.
    pub fn from_env() -> Self {
        Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite::memory:".into()),
            bridge: BridgeConfig::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
