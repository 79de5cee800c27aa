//! Wire envelope for live-update messages.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope type for order status pushes.
pub const ORDER_STATUS: &str = "order.status";

/// A live-update message: `{ "type": "...", "data": ... }`.
///
/// The manager only checks the envelope shape; `data` is handed to
/// subscribers untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Build an envelope from any serializable payload.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` cannot be represented as JSON.
    pub fn new(kind: impl Into<String>, data: impl Serialize) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: kind.into(),
            data: serde_json::to_value(data)?,
        })
    }

    /// Whether this envelope has the given type.
    #[must_use]
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// Decode the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}
