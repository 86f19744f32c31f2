//! Product rows and insert payloads.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::slug::Slug;

/// A product row as stored in the `products` table.
///
/// Nullable columns deserialize to `None`, and columns the database fills in
/// by default tolerate being absent from the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    /// Contact / payee email shown to buyers.
    #[serde(default)]
    pub payee_email: Option<String>,
    /// External checkout link.
    #[serde(default)]
    pub checkout_link: Option<String>,
    /// ISO 4217 currency code, free-form in the database.
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload for a new product.
///
/// Only the slug is required here. `title` stays optional so that an omitted
/// title reaches the database and fails its NOT NULL constraint there.
/// Omitted fields are not serialized, leaving column defaults in effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub slug: Slug,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payee_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl NewProduct {
    /// A payload with only the slug and title set.
    #[must_use]
    pub const fn new(slug: Slug, title: Option<String>) -> Self {
        Self {
            slug,
            title,
            description: None,
            price: None,
            images: None,
            condition: None,
            category: None,
            brand: None,
            payee_email: None,
            checkout_link: None,
            currency: None,
            in_stock: None,
            featured: None,
            metadata: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_deserializes_minimal_row() {
        let product: Product =
            serde_json::from_value(json!({"slug": "a", "title": "A"})).unwrap();
        assert_eq!(product.slug, "a");
        assert_eq!(product.price, None);
        assert!(product.images.is_empty());
        assert!(!product.featured);
    }

    #[test]
    fn test_product_price_reads_json_numbers() {
        let product: Product = serde_json::from_value(json!({
            "slug": "a",
            "title": "A",
            "price": 19.99,
            "created_at": "2025-01-02T03:04:05.123456+00:00"
        }))
        .unwrap();
        assert_eq!(product.price, Some(Decimal::new(1999, 2)));
        assert!(product.created_at.is_some());

        let product: Product =
            serde_json::from_value(json!({"slug": "a", "title": "A", "price": 20})).unwrap();
        assert_eq!(product.price, Some(Decimal::from(20)));
    }

    #[test]
    fn test_new_product_omits_unset_fields() {
        let payload = NewProduct::new(Slug::parse("no-title").unwrap(), None);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value, json!({"slug": "no-title"}));
    }

    #[test]
    fn test_new_product_serializes_price_as_number() {
        let mut payload =
            NewProduct::new(Slug::parse("priced").unwrap(), Some("Priced".to_string()));
        payload.price = Some(Decimal::new(1050, 2));
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["price"], json!(10.5));
    }
}
