//! Integration tests for live order updates.
//!
//! These tests wire a connection manager over the in-memory transport to an
//! order store, push `order.status` envelopes from the far end, and check
//! what the store shows.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use basket_client::cart::CartStore;
use basket_client::config::CartConfig;
use basket_client::connection::memory::MemoryConnector;
use basket_client::connection::{
    ConnectionManager, ConnectionState, Connector, Envelope, ORDER_STATUS, ReconnectPolicy,
};
use basket_client::orders::{NewOrder, OrderStore, OrderUpdate};
use basket_client::storage::MemoryStorage;
use basket_core::{OrderId, OrderStatus};
use basket_integration_tests::{FakeOrderApi, order, product};
use url::Url;

fn connect(connector: &Arc<MemoryConnector>) -> ConnectionManager {
    ConnectionManager::connect(
        Url::parse("ws://localhost:4000/live").unwrap(),
        ReconnectPolicy::fixed(Duration::from_secs(2)),
        Arc::clone(connector) as Arc<dyn Connector>,
    )
}

async fn wait_until(manager: &ConnectionManager, predicate: impl Fn(&ConnectionState) -> bool) {
    manager
        .watch_state()
        .wait_for(|state| predicate(state))
        .await
        .unwrap();
}

fn status_push(id: &str, status: OrderStatus) -> String {
    serde_json::to_string(
        &Envelope::new(
            ORDER_STATUS,
            OrderUpdate {
                order_id: OrderId::new(id),
                status,
            },
        )
        .unwrap(),
    )
    .unwrap()
}

// =============================================================================
// Status Push Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_status_push_updates_listed_order() {
    let store = Arc::new(OrderStore::new(FakeOrderApi::with_orders([
        order("ord-1", OrderStatus::Processing),
        order("ord-2", OrderStatus::Pending),
    ])));
    store.fetch_orders().await.unwrap();

    let connector = Arc::new(MemoryConnector::new());
    let manager = connect(&connector);
    let _updates = store.follow(&manager);

    let peer = connector.accept();
    wait_until(&manager, ConnectionState::is_open).await;

    let mut states = store.subscribe();
    peer.push(status_push("ord-1", OrderStatus::Shipped));
    let state = states
        .wait_for(|state| {
            state.items.as_ref().is_some_and(|items| items[0].status == OrderStatus::Shipped)
        })
        .await
        .unwrap()
        .clone();
    assert_eq!(state.items.unwrap()[1].status, OrderStatus::Pending);

    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_pushes_resume_after_reconnect() {
    let store = Arc::new(OrderStore::new(FakeOrderApi::with_orders([order(
        "ord-1",
        OrderStatus::Processing,
    )])));
    store.fetch_order(&OrderId::new("ord-1")).await.unwrap();

    let connector = Arc::new(MemoryConnector::new());
    let manager = connect(&connector);
    let _updates = store.follow(&manager);

    let peer = connector.accept();
    wait_until(&manager, ConnectionState::is_open).await;
    peer.close(Some("deploy"));
    wait_until(&manager, |s| matches!(s, ConnectionState::Reconnecting { .. })).await;

    let peer = connector.accept();
    wait_until(&manager, ConnectionState::is_open).await;
    assert_eq!(connector.attempts(), 2);
    assert_eq!(connector.max_live_channels(), 1);

    let mut states = store.subscribe();
    peer.push(status_push("ord-1", OrderStatus::Delivered));
    states
        .wait_for(|state| {
            state
                .current
                .as_ref()
                .is_some_and(|order| order.status == OrderStatus::Delivered)
        })
        .await
        .unwrap();

    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_unrelated_and_malformed_pushes_are_ignored() {
    let store = Arc::new(OrderStore::new(FakeOrderApi::with_orders([order(
        "ord-1",
        OrderStatus::Pending,
    )])));
    store.fetch_orders().await.unwrap();
    let before = store.state();

    let connector = Arc::new(MemoryConnector::new());
    let manager = connect(&connector);
    let _updates = store.follow(&manager);

    let mut peer = connector.accept();
    wait_until(&manager, ConnectionState::is_open).await;
    peer.push(r#"{"type":"inventory.changed","data":{"productId":"tee"}}"#);
    peer.push(r#"{"type":"order.status","data":{"orderId":"ord-1"}}"#);
    peer.push("not json at all");
    peer.push(status_push("ord-404", OrderStatus::Cancelled));

    // Round-trip a frame so every push above has been dispatched.
    assert!(manager.send(&Envelope::new("ping", ()).unwrap()));
    peer.recv().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(store.state(), before);
    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_unmounted_store_ignores_pushes() {
    let store = Arc::new(OrderStore::new(FakeOrderApi::with_orders([order(
        "ord-1",
        OrderStatus::Pending,
    )])));
    store.fetch_orders().await.unwrap();

    let connector = Arc::new(MemoryConnector::new());
    let manager = connect(&connector);
    let _updates = store.follow(&manager);

    let peer = connector.accept();
    wait_until(&manager, ConnectionState::is_open).await;

    store.unmount();
    peer.push(status_push("ord-1", OrderStatus::Shipped));
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(store.state().items.unwrap()[0].status, OrderStatus::Pending);
    manager.close().await;
}

// =============================================================================
// Checkout Flow Tests
// =============================================================================

#[tokio::test]
async fn test_checkout_from_cart() {
    let mut cart = CartStore::hydrate(MemoryStorage::new(), CartConfig::default());
    cart.add_item(&product("tee", 2000), 2, None);
    cart.add_item(&product("mug", 1200), 1, None);

    let store = OrderStore::new(FakeOrderApi::with_orders([order(
        "ord-1",
        OrderStatus::Delivered,
    )]));
    store.fetch_orders().await.unwrap();

    let created = store.create_order(&NewOrder::from_cart(&cart)).await.unwrap();
    cart.checkout_complete();

    assert!(cart.is_empty());
    assert_eq!(created.lines.len(), 2);
    let state = store.state();
    assert_eq!(state.current.unwrap().id, created.id);
    let ids: Vec<String> = state.items.unwrap().iter().map(|o| o.id.to_string()).collect();
    assert_eq!(ids, ["ord-2", "ord-1"]);
}

#[tokio::test]
async fn test_failed_checkout_keeps_cart() {
    let mut cart = CartStore::hydrate(MemoryStorage::new(), CartConfig::default());
    cart.add_item(&product("tee", 2000), 1, None);

    let api = FakeOrderApi::default();
    api.fail_with("Card declined");
    let store = OrderStore::new(api);

    if store.create_order(&NewOrder::from_cart(&cart)).await.is_some() {
        cart.checkout_complete();
    }

    assert_eq!(cart.item_count(), 1);
    let state = store.state();
    assert_eq!(state.last_error.as_deref(), Some("Card declined"));
    assert!(!state.is_loading);
    assert!(state.current.is_none());
}

#[tokio::test]
async fn test_track_unknown_order_reports_message() {
    let store = OrderStore::new(FakeOrderApi::default());
    assert!(store.track_order(&OrderId::new("ord-9")).await.is_none());
    assert_eq!(
        store.state().last_error.as_deref(),
        Some("Order ord-9 not found")
    );
}
