//! Inventory synchronization bridge.
//!
//! Maintains one long-lived WebSocket connection to the external
//! inventory-management service (IMS), turns its unordered message exchange
//! into correlated request/response calls, recovers from disconnects with a
//! fixed-interval reconnect, and fans server-pushed inventory changes out
//! to locally connected observers. A separate, stateless HTTP path pulls
//! the full catalog for cache seeding.
//!
//! The bridge is a relay, not a store: it persists nothing and makes no
//! exactly-once promises for broadcasts.

pub mod bridge;
pub mod catalog;
pub mod config;
pub mod correlation;
pub mod error;
pub mod observers;
pub mod worker;

pub use bridge::InventoryBridge;
pub use catalog::CatalogClient;
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use observers::{ObserverId, ObserverRegistry};
pub use worker::ConnectionState;
