//! Variant selectors.
//!
//! A [`VariantSelector`] is the structured choice (size, color, bundle, ...)
//! a shopper made for a product. Together with the product ID it forms the
//! identity of a cart line, so two selectors must compare equal whenever they
//! describe the same choice, regardless of the field order the caller used.

use core::fmt;
use core::hash::{Hash, Hasher};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Errors that can occur when building a [`VariantSelector`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// The selector was not a JSON object.
    #[error("variant selector must be an object, got {0}")]
    NotAnObject(&'static str),
}

/// A canonicalized variant choice.
///
/// Object keys are sorted recursively on construction, so the canonical
/// serialized form is identical for structurally equal selectors and equality
/// is byte equality of that form.
///
/// ```
/// use basket_core::VariantSelector;
/// use serde_json::json;
///
/// let a = VariantSelector::try_from(json!({"size": "M", "color": "red"})).unwrap();
/// let b = VariantSelector::try_from(json!({"color": "red", "size": "M"})).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.canonical_key(), r#"{"color":"red","size":"M"}"#);
/// ```
#[derive(Clone, Serialize)]
#[serde(transparent)]
pub struct VariantSelector {
    #[serde(skip)]
    key: String,
    value: Value,
}

impl VariantSelector {
    /// Build a selector from a JSON object, canonicalizing it.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::NotAnObject`] for arrays, scalars and `null`.
    pub fn new(value: Value) -> Result<Self, SelectorError> {
        if !value.is_object() {
            return Err(SelectorError::NotAnObject(kind_name(&value)));
        }
        let value = canonicalize(value);
        let key = value.to_string();
        Ok(Self { key, value })
    }

    /// The canonical serialized form.
    #[must_use]
    pub fn canonical_key(&self) -> &str {
        &self.key
    }

    /// Look up a top-level field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.value.get(field)
    }

    /// The variant's own price, if the selector carries one.
    ///
    /// Accepts both JSON numbers and decimal strings (`"19.99"`).
    #[must_use]
    pub fn price(&self) -> Option<Decimal> {
        match self.get("price")? {
            Value::String(s) => Decimal::from_str(s).ok(),
            Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
            _ => None,
        }
    }
}

impl PartialEq for VariantSelector {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for VariantSelector {}

impl Hash for VariantSelector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for VariantSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VariantSelector").field(&self.key).finish()
    }
}

impl fmt::Display for VariantSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl TryFrom<Value> for VariantSelector {
    type Error = SelectorError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for VariantSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

/// Rebuild a value with every object's keys in sorted order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

const fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
