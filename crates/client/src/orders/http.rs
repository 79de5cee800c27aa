//! HTTP implementation of the order API.
//!
//! Endpoints, relative to the configured base URL:
//! - `GET orders` → `{ "orders": [...] }`
//! - `GET orders/{id}` → `{ "order": {...} }`
//! - `POST orders` → `{ "order": {...} }`
//! - `GET orders/{id}/tracking` → tracking info
//!
//! Error responses may carry `{ "message": "..." }`, which becomes the
//! shopper-facing error message.

use std::time::Duration;

use async_trait::async_trait;
use basket_core::OrderId;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument, warn};
use url::Url;
use uuid::Uuid;

use super::api::{ApiError, OrderApi};
use super::types::{NewOrder, Order, TrackingInfo};
use crate::config::OrderApiConfig;

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Deserialize)]
struct OrdersEnvelope {
    orders: Vec<Order>,
}

#[derive(Deserialize)]
struct OrderEnvelope {
    order: Order,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Order API client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpOrderApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpOrderApi {
    /// Create a new order API client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value, the base URL
    /// cannot take a path, or the HTTP client fails to build.
    pub fn new(config: &OrderApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = &config.api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| ApiError::Parse(format!("Invalid API token format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        if config.base_url.cannot_be_a_base() {
            return Err(ApiError::BaseUrl(config.base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Resolve path segments against the base URL, percent-encoding each.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::BaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and decode the JSON body.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let request_id = Uuid::new_v4();
        let response = request
            .header("X-Request-Id", request_id.to_string())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(&body);
            warn!(
                status = %status,
                request_id = %request_id,
                message = %message,
                "Order API returned non-success status"
            );
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                request_id = %request_id,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse order API response"
            );
            ApiError::Parse(e.to_string())
        })
    }
}

#[async_trait]
impl OrderApi for HttpOrderApi {
    #[instrument(skip(self))]
    async fn get_orders(&self) -> Result<Vec<Order>, ApiError> {
        let url = self.endpoint(&["orders"])?;
        let envelope: OrdersEnvelope = self.execute(self.client.get(url)).await?;
        debug!(count = envelope.orders.len(), "Fetched orders");
        Ok(envelope.orders)
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn get_order(&self, id: &OrderId) -> Result<Order, ApiError> {
        let url = self.endpoint(&["orders", id.as_str()])?;
        let envelope: OrderEnvelope = self.execute(self.client.get(url)).await?;
        Ok(envelope.order)
    }

    #[instrument(skip(self, data), fields(lines = data.lines.len()))]
    async fn create_order(&self, data: &NewOrder) -> Result<Order, ApiError> {
        let url = self.endpoint(&["orders"])?;
        let envelope: OrderEnvelope = self.execute(self.client.post(url).json(data)).await?;
        Ok(envelope.order)
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn track_order(&self, id: &OrderId) -> Result<TrackingInfo, ApiError> {
        let url = self.endpoint(&["orders", id.as_str(), "tracking"])?;
        self.execute(self.client.get(url)).await
    }
}

/// Pull a human-readable message out of an error body.
///
/// Prefers a JSON `message` (or `error`) field, then a short plain-text body.
/// Returns an empty string when there is nothing usable, which callers turn
/// into the generic fallback.
fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body)
        && let Some(message) = parsed.message.or(parsed.error)
    {
        return message;
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() <= 200 && !trimmed.starts_with(['{', '<']) {
        return trimmed.to_string();
    }
    String::new()
}
