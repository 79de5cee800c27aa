//! Order sync store.
//!
//! [`OrderStore`] wraps an [`OrderApi`] and keeps an observable
//! [`OrderQueryState`]: the shopper's orders, the order being viewed, its
//! tracking info, a loading flag, and the last error message. Every
//! operation follows the same shape: flag loading and clear the error, call
//! the API, then record either the result or the error message. Failures
//! never escape; callers get `None` and read `last_error`.
//!
//! Live status pushes arrive through [`OrderStore::follow`], which listens
//! for `order.status` envelopes on a [`ConnectionManager`].

mod api;
mod http;
mod types;

pub use api::{ApiError, GENERIC_ERROR_MESSAGE, OrderApi};
pub use http::HttpOrderApi;
pub use types::{NewOrder, NewOrderLine, Order, OrderLine, OrderUpdate, TrackingEvent, TrackingInfo};

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use basket_core::OrderId;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::connection::{ConnectionManager, Envelope, ORDER_STATUS, Subscription};
use crate::error::{self, ConnectionError};

/// Observable state of the order store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQueryState {
    /// Orders from the last list fetch, newest first. `None` until fetched.
    pub items: Option<Vec<Order>>,
    /// The order from the last single fetch or create.
    pub current: Option<Order>,
    /// Tracking info from the last `track_order`.
    pub tracking: Option<TrackingInfo>,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

/// Order operations against an [`OrderApi`] with observable state.
///
/// Operations take `&self`, so several may be in flight at once; they
/// interleave and whichever response lands last wins.
pub struct OrderStore<A> {
    api: A,
    state: watch::Sender<OrderQueryState>,
    alive: Arc<AtomicBool>,
}

impl<A: OrderApi> OrderStore<A> {
    #[must_use]
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: watch::Sender::new(OrderQueryState::default()),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> OrderQueryState {
        self.state.borrow().clone()
    }

    /// Receiver that sees every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OrderQueryState> {
        self.state.subscribe()
    }

    /// Whether the store still applies results.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Stop applying results. Operations still in flight discard what they
    /// get, and later calls return `None` without reaching the API.
    pub fn unmount(&self) {
        if self.alive.swap(false, Ordering::AcqRel) {
            debug!("Order store unmounted");
        }
    }

    /// Fetch all of the shopper's orders into `items`.
    #[instrument(skip(self))]
    pub async fn fetch_orders(&self) -> Option<Vec<Order>> {
        let orders = self
            .run("fetch_orders", self.api.get_orders(), |state, orders| {
                state.items = Some(orders.clone());
            })
            .await?;
        info!(count = orders.len(), "Orders fetched");
        Some(orders)
    }

    /// Fetch one order into `current`.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn fetch_order(&self, id: &OrderId) -> Option<Order> {
        self.run("fetch_order", self.api.get_order(id), |state, order| {
            state.current = Some(order.clone());
        })
        .await
    }

    /// Place an order, make it `current`, and prepend it to `items`.
    #[instrument(skip(self, data), fields(lines = data.lines.len()))]
    pub async fn create_order(&self, data: &NewOrder) -> Option<Order> {
        let order = self
            .run("create_order", self.api.create_order(data), |state, order| {
                state.current = Some(order.clone());
                state
                    .items
                    .get_or_insert_with(Vec::new)
                    .insert(0, order.clone());
            })
            .await?;
        info!(order_id = %order.id, "Order created");
        error::add_breadcrumb("orders", "Created order", Some(&[("order_id", order.id.as_str())]));
        Some(order)
    }

    /// Fetch tracking info into `tracking`.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn track_order(&self, id: &OrderId) -> Option<TrackingInfo> {
        self.run("track_order", self.api.track_order(id), |state, tracking| {
            state.tracking = Some(tracking.clone());
        })
        .await
    }

    /// Clear `last_error` without touching fetched data.
    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| state.last_error.take().is_some());
    }

    /// Clear `current` only.
    pub fn reset_order(&self) {
        self.state.send_if_modified(|state| state.current.take().is_some());
    }

    /// Apply a pushed status change to the matching order in `items`,
    /// `current`, and `tracking`.
    ///
    /// Returns `true` if any held order changed.
    pub fn apply_update(&self, update: &OrderUpdate) -> bool {
        if !self.is_alive() {
            return false;
        }

        let changed = self.state.send_if_modified(|state| {
            let mut changed = false;
            let orders = state
                .items
                .iter_mut()
                .flatten()
                .chain(state.current.as_mut());
            for order in orders.filter(|order| order.id == update.order_id) {
                if order.status != update.status {
                    order.status = update.status;
                    changed = true;
                }
            }
            if let Some(tracking) = state
                .tracking
                .as_mut()
                .filter(|tracking| tracking.order_id == update.order_id && tracking.status != update.status)
            {
                tracking.status = update.status;
                changed = true;
            }
            changed
        });

        if changed {
            info!(order_id = %update.order_id, status = %update.status, "Order status updated");
        }
        changed
    }

    /// Run one API call with the loading/error bookkeeping.
    async fn run<T, F>(
        &self,
        operation: &'static str,
        call: F,
        apply: impl FnOnce(&mut OrderQueryState, &T),
    ) -> Option<T>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        if !self.is_alive() {
            debug!(operation, "Skipping call on unmounted order store");
            return None;
        }
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.last_error = None;
        });

        let result = call.await;

        if !self.is_alive() {
            debug!(operation, "Discarding result for unmounted order store");
            return None;
        }

        match result {
            Ok(value) => {
                self.state.send_modify(|state| {
                    apply(state, &value);
                    state.is_loading = false;
                });
                Some(value)
            }
            Err(e) => {
                let message = e.user_message();
                warn!(operation, error = %e, "Order operation failed");
                error::report(e);
                self.state.send_modify(|state| {
                    state.last_error = Some(message);
                    state.is_loading = false;
                });
                None
            }
        }
    }
}

impl<A: OrderApi + 'static> OrderStore<A> {
    /// Apply `order.status` envelopes from `connection` to this store.
    ///
    /// Holds only a weak reference, so the subscription never keeps the
    /// store alive. Payloads that do not decode are reported and skipped.
    #[must_use = "updates stop when the subscription is dropped"]
    pub fn follow(self: &Arc<Self>, connection: &ConnectionManager) -> Subscription {
        let store = Arc::downgrade(self);
        connection.subscribe(move |envelope: &Envelope| {
            if !envelope.is(ORDER_STATUS) {
                return;
            }
            let Some(store) = store.upgrade() else {
                return;
            };
            match envelope.decode::<OrderUpdate>() {
                Ok(update) => {
                    store.apply_update(&update);
                }
                Err(e) => error::report(ConnectionError::MalformedFrame(e)),
            }
        })
    }
}

impl<A> std::fmt::Debug for OrderStore<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStore")
            .field("state", &*self.state.borrow())
            .field("alive", &self.alive.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
