//! Unified error handling with Sentry integration.
//!
//! No error produced inside the client crosses a public operation boundary.
//! Components convert failures into state fields (`last_error`), `None`/`false`
//! returns, or a [`report`] call, which logs the error and leaves a Sentry
//! breadcrumb so the trail shows up on the next captured event.

use thiserror::Error;

use crate::config::ConfigError;
use crate::connection::TransportError;
use crate::orders::ApiError;
use crate::storage::StorageError;

/// Client-level error taxonomy.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Storage read/write/parse failure. Recovered locally.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Order API call failed. Surfaced as `last_error` on the order store.
    #[error("Network error: {0}")]
    Network(#[from] ApiError),

    /// Live-update channel failure. Recovered by reconnecting.
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Caller supplied an invalid identity or quantity. Treated as a no-op.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Short category name used as the breadcrumb category.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Persistence(_) => "persistence",
            Self::Network(_) => "network",
            Self::Connection(_) => "connection",
            Self::Validation(_) => "validation",
            Self::Config(_) => "config",
        }
    }

    /// Whether this is a routine condition rather than a fault: invalid
    /// caller input, or a send while the channel is down.
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Connection(ConnectionError::NotConnected(_))
        )
    }
}

/// Failure reading, writing, or decoding the persisted cart.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The storage adapter failed.
    #[error("storage failure for key '{key}': {source}")]
    Storage {
        key: String,
        #[source]
        source: StorageError,
    },

    /// The persisted blob could not be decoded.
    #[error("corrupt cart blob under '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The cart could not be encoded.
    #[error("failed to encode cart: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Failure on the live-update channel.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The channel could not be established or broke.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A message was sent while the channel was not open.
    #[error("not connected (state: {0})")]
    NotConnected(String),

    /// An inbound frame was not a valid envelope.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),

    /// An outbound message could not be encoded.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// A subscriber panicked while handling an envelope.
    #[error("subscriber panicked on '{kind}': {message}")]
    HandlerPanicked { kind: String, message: String },

    /// The driver task is gone, so nothing can be sent.
    #[error("connection driver is not running")]
    DriverStopped,
}

/// Invalid caller input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Quantity must be positive.
    #[error("quantity must be at least 1 (got {0})")]
    NonPositiveQuantity(i64),

    /// Quantity does not fit a cart line.
    #[error("quantity {0} is too large")]
    QuantityOverflow(i64),

    /// A cart amount does not fit a `Decimal`.
    #[error("cart amount is out of range")]
    AmountOverflow,
}

/// Report an error to the observability channel.
///
/// Faults log at `warn`, which the Sentry layer turns into an event.
/// Expected conditions (see [`ClientError::is_expected`]) log at `info` and
/// only leave a breadcrumb. Never fails and never panics.
pub fn report(error: impl Into<ClientError>) {
    let error = error.into();
    let level = if error.is_expected() {
        tracing::info!(category = error.category(), error = %error, "Client condition");
        sentry::Level::Info
    } else {
        tracing::warn!(category = error.category(), error = %error, "Client error");
        sentry::Level::Warning
    };

    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(error.category().to_string()),
        message: Some(error.to_string()),
        level,
        ..Default::default()
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "p1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::from(ValidationError::NonPositiveQuantity(0));
        assert_eq!(
            err.to_string(),
            "Validation error: quantity must be at least 1 (got 0)"
        );

        let err = ClientError::from(ConnectionError::NotConnected("connecting".to_string()));
        assert_eq!(
            err.to_string(),
            "Connection error: not connected (state: connecting)"
        );
    }

    #[test]
    fn test_client_error_categories() {
        assert_eq!(
            ClientError::from(ValidationError::QuantityOverflow(1)).category(),
            "validation"
        );
        assert_eq!(
            ClientError::from(ConnectionError::NotConnected(String::new())).category(),
            "connection"
        );
        assert_eq!(
            ClientError::from(PersistenceError::Storage {
                key: "cart".to_string(),
                source: StorageError::QuotaExceeded,
            })
            .category(),
            "persistence"
        );
    }

    #[test]
    fn test_expected_conditions() {
        assert!(ClientError::from(ValidationError::NonPositiveQuantity(0)).is_expected());
        assert!(
            ClientError::from(ConnectionError::NotConnected("connecting".to_string()))
                .is_expected()
        );
        assert!(!ClientError::from(ConnectionError::DriverStopped).is_expected());
        assert!(
            !ClientError::from(PersistenceError::Storage {
                key: "cart".to_string(),
                source: StorageError::QuotaExceeded,
            })
            .is_expected()
        );
    }

    #[test]
    fn test_report_does_not_panic_without_sentry() {
        report(ValidationError::NonPositiveQuantity(-3));
        add_breadcrumb("cart", "Added item", Some(&[("product_id", "p1")]));
    }
}
