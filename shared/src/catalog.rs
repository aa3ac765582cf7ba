//! Canonical catalog record.
//!
//! The IMS REST endpoints are served by a different codebase and have
//! shipped both camelCase and PascalCase field spellings. The aliases below
//! isolate that variance at the boundary: everything past deserialization
//! sees one canonical shape.

use serde::{Deserialize, Serialize};

/// One catalog entry as reported by the IMS bulk endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    #[serde(alias = "Id")]
    pub id: i64,
    #[serde(alias = "Brand")]
    pub brand: String,
    #[serde(alias = "Model")]
    pub model: String,
    #[serde(default, alias = "Colorway")]
    pub colorway: Option<String>,
    #[serde(default, alias = "Size")]
    pub size: Option<f64>,
    #[serde(default, alias = "Condition")]
    pub condition: Option<String>,
    #[serde(default, alias = "PurchasePrice")]
    pub purchase_price: Option<f64>,
    #[serde(default, alias = "Price")]
    pub price: Option<f64>,
    #[serde(default, alias = "CurrentStock")]
    pub current_stock: i64,
}

impl CatalogItem {
    /// Placeholder for an item the IMS no longer reports but local sale
    /// records still reference.
    pub fn unknown(id: i64) -> Self {
        Self {
            id,
            brand: "Unknown".into(),
            model: "Unknown".into(),
            colorway: None,
            size: None,
            condition: None,
            purchase_price: None,
            price: None,
            current_stock: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_camel_case_fields() {
        let item: CatalogItem = serde_json::from_str(
            r#"{"id":1,"brand":"Nike","model":"Dunk","price":120.0,"currentStock":4}"#,
        )
        .unwrap();
        assert_eq!(item.id, 1);
        assert_eq!(item.current_stock, 4);
    }

    #[test]
    fn accepts_pascal_case_fields() {
        let item: CatalogItem = serde_json::from_str(
            r#"{"Id":2,"Brand":"Adidas","Model":"Samba","PurchasePrice":40.5,"CurrentStock":9}"#,
        )
        .unwrap();
        assert_eq!(item.id, 2);
        assert_eq!(item.purchase_price, Some(40.5));
        assert_eq!(item.current_stock, 9);
    }

    #[test]
    fn missing_optionals_default() {
        let item: CatalogItem =
            serde_json::from_str(r#"{"id":3,"brand":"NB","model":"550"}"#).unwrap();
        assert_eq!(item.current_stock, 0);
        assert!(item.price.is_none());
    }
}
