//! Partial product updates.
//!
//! A PATCH body arrives as untyped JSON. [`ProductPatch::from_json`] reduces it
//! to the fields that will actually be written, following a per-field policy:
//!
//! | Field kind | Accepted | Silently ignored |
//! |---|---|---|
//! | required text (`title`, `slug`) | non-blank strings | blank strings, any other type |
//! | numeric (`price`) | JSON numbers | strings (even `"12.50"`), booleans, `null` |
//! | nullable text (`description`, `brand`, ...) | strings, `null` (clears) | any other type |
//! | flags (`in_stock`, `featured`) | booleans | any other type |
//! | `images` | arrays of strings | anything else |
//! | `metadata` | objects | anything else |
//!
//! Unknown keys are dropped. Hard failures are a non-blank `slug` that is not
//! a valid [`Slug`] and a numeric `price` outside the decimal range.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use super::slug::{Slug, SlugError};

/// Errors produced while building a [`ProductPatch`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The body is not a JSON object.
    #[error("update body must be a JSON object")]
    NotAnObject,
    /// A rename target is not a valid slug.
    #[error("invalid slug: {0}")]
    InvalidSlug(#[from] SlugError),
    /// A numeric price that a decimal column cannot hold.
    #[error("price {0} is out of range")]
    PriceOutOfRange(String),
}

/// The set of columns a partial update will write.
///
/// `None` means "leave the column untouched". For nullable text columns the
/// inner `Option` distinguishes "set to this string" from "set to NULL".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<Slug>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payee_email: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_link: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl ProductPatch {
    /// Build a patch from an untyped request body.
    ///
    /// # Errors
    ///
    /// Returns `PatchError::NotAnObject` if `body` is not an object,
    /// `PatchError::InvalidSlug` if a non-blank `slug` fails validation and
    /// `PatchError::PriceOutOfRange` for a number no decimal can represent.
    pub fn from_json(body: &Value) -> Result<Self, PatchError> {
        let fields = body.as_object().ok_or(PatchError::NotAnObject)?;

        let slug = required_text(fields.get("slug"))
            .map(Slug::parse)
            .transpose()?;

        Ok(Self {
            slug,
            title: required_text(fields.get("title")).map(str::to_owned),
            description: nullable_text(fields.get("description")),
            price: numeric(fields.get("price"))?,
            images: string_list(fields.get("images")),
            condition: nullable_text(fields.get("condition")),
            category: nullable_text(fields.get("category")),
            brand: nullable_text(fields.get("brand")),
            payee_email: nullable_text(fields.get("payee_email")),
            checkout_link: nullable_text(fields.get("checkout_link")),
            currency: nullable_text(fields.get("currency")),
            in_stock: fields.get("in_stock").and_then(Value::as_bool),
            featured: fields.get("featured").and_then(Value::as_bool),
            metadata: fields.get("metadata").and_then(Value::as_object).cloned(),
        })
    }

    /// Whether the patch writes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn required_text(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn nullable_text(value: Option<&Value>) -> Option<Option<String>> {
    match value? {
        Value::Null => Some(None),
        Value::String(s) => Some(Some(s.clone())),
        _ => None,
    }
}

fn numeric(value: Option<&Value>) -> Result<Option<Decimal>, PatchError> {
    let Some(Value::Number(number)) = value else {
        return Ok(None);
    };
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Some)
        .map_err(|_| PatchError::PriceOutOfRange(text))
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value?
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_owned))
        .collect()
}
