//! Aglet POS backend.
//!
//! CRUD/route plumbing around the [`ims_bridge`] crate: catalog reads
//! served from a bulk-sync cache, the sale-creation workflow (stock
//! validation through the bridge before any local write, best-effort stock
//! decrement after commit), dashboard aggregation over local sale records,
//! and a WebSocket endpoint that turns POS terminals into bridge observers.

pub mod api;
pub mod core;
pub mod db;
pub mod services;
pub mod utils;

pub use core::config::Config;
pub use core::state::ServerState;
