//! Order API collaborator contract.

use async_trait::async_trait;
use basket_core::OrderId;
use thiserror::Error;

use super::types::{NewOrder, Order, TrackingInfo};

/// Message shown when the API gave no usable message of its own.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Errors that can occur when calling the order API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The API rejected the request with a message for the shopper.
    #[error("{0}")]
    Rejected(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The configured base URL cannot take path segments.
    #[error("Invalid base URL: {0}")]
    BaseUrl(String),
}

impl ApiError {
    /// The message to surface as `last_error`.
    ///
    /// Uses the API's own message when it sent one, and a generic fallback
    /// for transport and decoding failures.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } | Self::Rejected(message) if !message.trim().is_empty() => {
                message.clone()
            }
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Server-side order operations.
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// List the shopper's orders.
    async fn get_orders(&self) -> Result<Vec<Order>, ApiError>;

    /// Fetch one order.
    async fn get_order(&self, id: &OrderId) -> Result<Order, ApiError>;

    /// Place an order.
    async fn create_order(&self, data: &NewOrder) -> Result<Order, ApiError>;

    /// Fetch shipment tracking for an order.
    async fn track_order(&self, id: &OrderId) -> Result<TrackingInfo, ApiError>;
}
