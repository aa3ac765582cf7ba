//! Types shared between the IMS bridge and the POS server.
//!
//! Everything that crosses a process boundary lives here: the IMS wire
//! protocol, the inventory events fanned out to POS terminals, and the
//! canonical catalog record produced by bulk sync normalization.

pub mod catalog;
pub mod protocol;

pub use catalog::CatalogItem;
pub use protocol::{CorrelationKey, EventKind, ImsMessage, InventoryEvent, ReplyKind};
