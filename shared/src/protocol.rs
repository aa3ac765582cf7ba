//! IMS wire protocol.
//!
//! Messages are JSON objects tagged by a `type` field, with camelCase
//! payload fields. The protocol carries no sequence counter: a request and
//! its reply are paired by a [`CorrelationKey`] derived from the expected
//! reply type and the item id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A message exchanged with the IMS over the persistent connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ImsMessage {
    /// Outbound: ask for the current quantity of one item.
    StockQuery { item_id: i64, auth_token: String },
    /// Inbound reply to `StockQuery`.
    StockInfo { item_id: i64, current_quantity: i64 },
    /// Outbound: apply a signed delta (negative = consumption).
    StockUpdate {
        item_id: i64,
        quantity_delta: i64,
        auth_token: String,
    },
    /// Inbound acknowledgement of `StockUpdate`.
    StockUpdated { item_id: i64, new_quantity: i64 },
    /// Inbound, unsolicited: stock changed through another channel.
    StockChanged {
        item_id: i64,
        current_quantity: i64,
        delta: i64,
    },
    /// Inbound: explicit rejection from the IMS. When the IMS includes the
    /// item id the error can be correlated back to the request it answers.
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item_id: Option<i64>,
    },
}

impl ImsMessage {
    /// The correlation key this message resolves, if it is a direct reply.
    ///
    /// Only the two reply types participate; broadcasts and errors never
    /// match a pending entry by themselves.
    pub fn correlation_key(&self) -> Option<CorrelationKey> {
        match self {
            ImsMessage::StockInfo { item_id, .. } => {
                Some(CorrelationKey::new(ReplyKind::StockInfo, *item_id))
            }
            ImsMessage::StockUpdated { item_id, .. } => {
                Some(CorrelationKey::new(ReplyKind::StockUpdated, *item_id))
            }
            _ => None,
        }
    }
}

/// The reply type a pending request is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplyKind {
    StockInfo,
    StockUpdated,
}

impl fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyKind::StockInfo => write!(f, "stock_info"),
            ReplyKind::StockUpdated => write!(f, "stock_updated"),
        }
    }
}

/// Deterministic identifier pairing an outbound request with its expected
/// inbound reply. At most one request may be in flight per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationKey {
    pub reply: ReplyKind,
    pub item_id: i64,
}

impl CorrelationKey {
    pub fn new(reply: ReplyKind, item_id: i64) -> Self {
        Self { reply, item_id }
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.reply, self.item_id)
    }
}

/// Classification of an inventory change, derived from the delta sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Restock,
    Consumption,
    Correction,
}

impl EventKind {
    pub fn from_delta(delta: i64) -> Self {
        match delta {
            d if d > 0 => EventKind::Restock,
            d if d < 0 => EventKind::Consumption,
            _ => EventKind::Correction,
        }
    }
}

/// An immutable inventory-change fact pushed from the IMS and fanned out
/// to locally connected observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEvent {
    pub item_id: i64,
    pub current_quantity: i64,
    pub delta: i64,
    pub kind: EventKind,
}

impl InventoryEvent {
    pub fn new(item_id: i64, current_quantity: i64, delta: i64) -> Self {
        Self {
            item_id,
            current_quantity,
            delta,
            kind: EventKind::from_delta(delta),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_query_wire_format() {
        let msg = ImsMessage::StockQuery {
            item_id: 7,
            auth_token: "tok".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "stock_query");
        assert_eq!(json["itemId"], 7);
        assert_eq!(json["authToken"], "tok");
    }

    #[test]
    fn stock_info_parses_and_correlates() {
        let msg: ImsMessage =
            serde_json::from_str(r#"{"type":"stock_info","itemId":7,"currentQuantity":5}"#)
                .unwrap();
        assert_eq!(
            msg.correlation_key(),
            Some(CorrelationKey::new(ReplyKind::StockInfo, 7))
        );
    }

    #[test]
    fn stock_changed_has_no_correlation_key() {
        let msg = ImsMessage::StockChanged {
            item_id: 3,
            current_quantity: 10,
            delta: 4,
        };
        assert!(msg.correlation_key().is_none());
    }

    #[test]
    fn error_item_id_is_optional() {
        let bare: ImsMessage =
            serde_json::from_str(r#"{"type":"error","message":"bad token"}"#).unwrap();
        let ImsMessage::Error { item_id, .. } = bare else {
            panic!("expected error variant");
        };
        assert!(item_id.is_none());
    }

    #[test]
    fn correlation_key_display_matches_wire_key() {
        let key = CorrelationKey::new(ReplyKind::StockUpdated, 42);
        assert_eq!(key.to_string(), "stock_updated_42");
    }

    #[test]
    fn event_kind_from_delta_sign() {
        assert_eq!(EventKind::from_delta(3), EventKind::Restock);
        assert_eq!(EventKind::from_delta(-2), EventKind::Consumption);
        assert_eq!(EventKind::from_delta(0), EventKind::Correction);
    }
}
