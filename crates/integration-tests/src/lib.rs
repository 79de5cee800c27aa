//! Integration tests for the Basket client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p basket-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_persistence` - cart mutations, reloads, and damaged storage
//! - `live_orders` - live status pushes flowing into the order store
//!
//! Every collaborator is an in-process fake, so no service needs to run.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use basket_client::cart::Product;
use basket_client::orders::{ApiError, NewOrder, Order, OrderApi, OrderLine, TrackingInfo};
use basket_core::{OrderId, OrderStatus};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

/// A product priced in cents.
#[must_use]
pub fn product(id: &str, cents: i64) -> Product {
    Product::new(id, format!("Product {id}"), Decimal::new(cents, 2))
}

/// An order with a fixed timestamp.
#[must_use]
pub fn order(id: &str, status: OrderStatus) -> Order {
    Order {
        id: OrderId::new(id),
        status,
        lines: Vec::new(),
        total: Decimal::new(1999, 2),
        created_at: Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap(),
    }
}

/// A fresh directory under the system temp dir.
#[must_use]
pub fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("basket-it-{}", uuid::Uuid::new_v4()))
}

/// Order API serving a fixed set of orders.
///
/// Created orders are assigned sequential ids and remembered, so later
/// fetches see them.
#[derive(Debug, Default)]
pub struct FakeOrderApi {
    orders: Mutex<VecDeque<Order>>,
    failure: Mutex<Option<String>>,
}

impl FakeOrderApi {
    #[must_use]
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        Self {
            orders: Mutex::new(orders.into_iter().collect()),
            failure: Mutex::default(),
        }
    }

    /// Make every following call fail with `message`.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    fn check(&self) -> Result<(), ApiError> {
        match self.failure.lock().unwrap().clone() {
            Some(message) => Err(ApiError::Api {
                status: 500,
                message,
            }),
            None => Ok(()),
        }
    }

    fn find(&self, id: &OrderId) -> Result<Order, ApiError> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|order| &order.id == id)
            .cloned()
            .ok_or_else(|| ApiError::Rejected(format!("Order {id} not found")))
    }
}

#[async_trait]
impl OrderApi for FakeOrderApi {
    async fn get_orders(&self) -> Result<Vec<Order>, ApiError> {
        self.check()?;
        Ok(self.orders.lock().unwrap().iter().cloned().collect())
    }

    async fn get_order(&self, id: &OrderId) -> Result<Order, ApiError> {
        self.check()?;
        self.find(id)
    }

    async fn create_order(&self, data: &NewOrder) -> Result<Order, ApiError> {
        self.check()?;
        let mut orders = self.orders.lock().unwrap();
        let mut created = order(&format!("ord-{}", orders.len() + 1), OrderStatus::Pending);
        created.lines = data
            .lines
            .iter()
            .map(|line| OrderLine {
                product_id: line.product_id.clone(),
                name: line.product_id.to_string(),
                quantity: line.quantity,
                unit_price: Decimal::ZERO,
            })
            .collect();
        orders.push_front(created.clone());
        Ok(created)
    }

    async fn track_order(&self, id: &OrderId) -> Result<TrackingInfo, ApiError> {
        self.check()?;
        let order = self.find(id)?;
        Ok(TrackingInfo {
            order_id: order.id,
            status: order.status,
            carrier: Some("USPS".to_string()),
            tracking_number: None,
            events: Vec::new(),
        })
    }
}
