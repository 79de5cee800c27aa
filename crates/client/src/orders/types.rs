//! Order API payloads.

use basket_core::{OrderId, OrderStatus, ProductId, VariantSelector};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::CartStore;
use crate::storage::StorageAdapter;

/// An order as returned by the order API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    #[serde(default)]
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Payload for `create_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub lines: Vec<NewOrderLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One requested line of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderLine {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_selector: Option<VariantSelector>,
    pub quantity: u32,
}

impl NewOrder {
    /// Build an order request from the current cart lines.
    #[must_use]
    pub fn from_cart<S: StorageAdapter>(cart: &CartStore<S>) -> Self {
        Self {
            lines: cart
                .lines()
                .iter()
                .map(|line| NewOrderLine {
                    product_id: line.product_id.clone(),
                    variant_selector: line.variant_selector.clone(),
                    quantity: line.quantity,
                })
                .collect(),
            note: None,
        }
    }
}

/// Shipment tracking for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingInfo {
    pub order_id: OrderId,
    pub status: OrderStatus,
    #[serde(default)]
    pub carrier: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub events: Vec<TrackingEvent>,
}

/// A carrier scan or status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub at: DateTime<Utc>,
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// A pushed status change, carried in an `order.status` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cart::Product;
    use crate::config::CartConfig;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_order_wire_format() {
        let order: Order = serde_json::from_value(json!({
            "id": "ord-1",
            "status": "processing",
            "lines": [{"productId": "p1", "name": "Tee", "quantity": 2, "unitPrice": "12.50"}],
            "total": "25.00",
            "createdAt": "2026-03-01T12:00:00Z"
        }))
        .unwrap();

        assert_eq!(order.id.as_str(), "ord-1");
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.lines[0].unit_price, Decimal::new(1250, 2));
        assert_eq!(order.total, Decimal::new(2500, 2));
    }

    #[test]
    fn test_new_order_from_cart() {
        let mut cart = CartStore::hydrate(MemoryStorage::new(), CartConfig::default());
        let tee = Product::new("tee", "Tee", Decimal::new(1250, 2));
        cart.add_item(&tee, 2, None);
        cart.add_item(
            &tee,
            1,
            Some(VariantSelector::new(json!({"size": "L"})).unwrap()),
        );

        let order = NewOrder::from_cart(&cart);
        assert_eq!(order.lines.len(), 2);
        assert_eq!(
            serde_json::to_value(&order).unwrap(),
            json!({
                "lines": [
                    {"productId": "tee", "quantity": 2},
                    {"productId": "tee", "variantSelector": {"size": "L"}, "quantity": 1}
                ]
            })
        );
    }

    #[test]
    fn test_tracking_optional_fields() {
        let tracking: TrackingInfo = serde_json::from_value(json!({
            "orderId": "ord-1",
            "status": "shipped"
        }))
        .unwrap();
        assert!(tracking.carrier.is_none());
        assert!(tracking.events.is_empty());
    }
}
