//! Cart state manager.
//!
//! [`CartStore`] owns the shopper's cart lines and mirrors them into a
//! [`StorageAdapter`] slot. Every mutation updates the in-memory lines and
//! then writes the full collection in the same call, so the persisted blob
//! never lags behind a completed operation.
//!
//! # Example
//!
//! ```rust,ignore
//! use basket_client::cart::{CartStore, Product};
//! use basket_client::storage::MemoryStorage;
//!
//! let mut cart = CartStore::hydrate(MemoryStorage::new(), config.cart.clone());
//! cart.add_item(&product, 2, None);
//! assert_eq!(cart.item_count(), 2);
//! ```

mod line;
mod totals;

pub use line::{CartLine, DisplayMetadata, Product};
pub use totals::CartTotals;

use basket_core::{Price, ProductId, VariantSelector};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use crate::config::CartConfig;
use crate::error::{self, PersistenceError, ValidationError};
use crate::storage::StorageAdapter;

/// Identity-aware cart collection with a persistent mirror.
#[derive(Debug)]
pub struct CartStore<S> {
    storage: S,
    config: CartConfig,
    lines: Vec<CartLine>,
}

impl<S: StorageAdapter> CartStore<S> {
    /// Create a cart from whatever is persisted under the configured key.
    ///
    /// A missing blob yields an empty cart. An unreadable or corrupt blob is
    /// reported and also yields an empty cart; this never fails.
    #[instrument(skip(storage, config), fields(key = %config.storage_key))]
    pub fn hydrate(storage: S, config: CartConfig) -> Self {
        let mut store = Self {
            storage,
            config,
            lines: Vec::new(),
        };

        let blob = match store.storage.get(&store.config.storage_key) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!("No persisted cart, starting empty");
                return store;
            }
            Err(source) => {
                error::report(PersistenceError::Storage {
                    key: store.config.storage_key.clone(),
                    source,
                });
                return store;
            }
        };

        match serde_json::from_str::<Vec<CartLine>>(&blob) {
            Ok(lines) => {
                let persisted = lines.len();
                store.lines = normalize(lines);
                if store.lines.len() == persisted {
                    debug!(lines = persisted, "Hydrated cart");
                } else {
                    info!(
                        persisted,
                        kept = store.lines.len(),
                        "Repaired persisted cart"
                    );
                    store.persist();
                }
            }
            Err(source) => {
                error::report(PersistenceError::Corrupt {
                    key: store.config.storage_key.clone(),
                    source,
                });
            }
        }

        store
    }

    /// Add `quantity` of a product, merging into an existing line with the
    /// same identity or appending a new line.
    ///
    /// A non-positive quantity is reported and ignored.
    #[instrument(skip(self, product, variant), fields(product_id = %product.id))]
    pub fn add_item(&mut self, product: &Product, quantity: i64, variant: Option<VariantSelector>) {
        let quantity = match positive_quantity(quantity) {
            Ok(quantity) => quantity,
            Err(e) => {
                error::report(e);
                return;
            }
        };

        if let Some(line) = self.find_mut(&product.id, variant.as_ref()) {
            let Some(merged) = line.quantity.checked_add(quantity) else {
                error::report(ValidationError::QuantityOverflow(
                    i64::from(line.quantity) + i64::from(quantity),
                ));
                return;
            };
            let previous = std::mem::replace(&mut line.quantity, merged);
            if self.undo_if_unpriceable(|lines| {
                set_quantity(lines, &product.id, variant.as_ref(), previous);
            }) {
                return;
            }
            debug!(quantity = merged, "Merged into existing line");
        } else {
            self.lines.push(CartLine::new(product, quantity, variant));
            if self.undo_if_unpriceable(|lines| {
                lines.pop();
            }) {
                return;
            }
            debug!(quantity, "Appended new line");
        }

        error::add_breadcrumb("cart", "Added item", Some(&[("product_id", product.id.as_str())]));
        self.persist();
    }

    /// Remove the line with the given identity. Removing a missing line is a
    /// no-op, but the collection is still persisted.
    #[instrument(skip(self, variant))]
    pub fn remove_item(&mut self, product_id: &ProductId, variant: Option<&VariantSelector>) {
        let before = self.lines.len();
        self.lines.retain(|line| !line.matches(product_id, variant));
        if self.lines.len() < before {
            debug!("Removed line");
            error::add_breadcrumb("cart", "Removed item", Some(&[("product_id", product_id.as_str())]));
        }
        self.persist();
    }

    /// Set a line's quantity exactly. Zero or below removes the line.
    #[instrument(skip(self, variant))]
    pub fn update_quantity(
        &mut self,
        product_id: &ProductId,
        new_quantity: i64,
        variant: Option<&VariantSelector>,
    ) {
        if new_quantity <= 0 {
            self.remove_item(product_id, variant);
            return;
        }
        let Ok(quantity) = u32::try_from(new_quantity) else {
            error::report(ValidationError::QuantityOverflow(new_quantity));
            return;
        };

        if let Some(line) = self.find_mut(product_id, variant) {
            let previous = std::mem::replace(&mut line.quantity, quantity);
            if self.undo_if_unpriceable(|lines| set_quantity(lines, product_id, variant, previous)) {
                return;
            }
            debug!(quantity, "Updated quantity");
        }
        self.persist();
    }

    /// Empty the cart. Writes an empty collection rather than deleting the key.
    #[instrument(skip(self))]
    pub fn clear_cart(&mut self) {
        self.lines.clear();
        self.persist();
    }

    /// Empty the cart after a successful checkout.
    pub fn checkout_complete(&mut self) {
        error::add_breadcrumb("cart", "Checkout completed", None);
        self.clear_cart();
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The cart configuration in use.
    #[must_use]
    pub const fn config(&self) -> &CartConfig {
        &self.config
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of `unit_price × quantity` across all lines.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        // Mutations and hydration keep the subtotal representable.
        checked_subtotal(&self.lines).unwrap_or(Decimal::MAX)
    }

    /// Tax at the configured default rate.
    #[must_use]
    pub fn tax(&self) -> Decimal {
        self.tax_at(self.config.tax_rate)
    }

    /// Tax at an explicit rate. Saturates, and reports, if the product does
    /// not fit a `Decimal`.
    #[must_use]
    pub fn tax_at(&self, rate: Decimal) -> Decimal {
        let subtotal = self.subtotal();
        subtotal.checked_mul(rate).unwrap_or_else(|| {
            error::report(ValidationError::AmountOverflow);
            subtotal.saturating_mul(rate)
        })
    }

    /// Subtotal plus tax at the configured default rate.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.total_at(self.config.tax_rate)
    }

    /// Subtotal plus tax at an explicit rate. Saturates, and reports, on
    /// overflow.
    #[must_use]
    pub fn total_at(&self, rate: Decimal) -> Decimal {
        let subtotal = self.subtotal();
        let tax = self.tax_at(rate);
        subtotal.checked_add(tax).unwrap_or_else(|| {
            error::report(ValidationError::AmountOverflow);
            subtotal.saturating_add(tax)
        })
    }

    /// All derived figures at the configured rate, in the configured currency.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        let currency = self.config.currency;
        CartTotals {
            item_count: self.item_count(),
            subtotal: Price::new(self.subtotal(), currency),
            tax: Price::new(self.tax(), currency),
            total: Price::new(self.total(), currency),
        }
    }

    #[must_use]
    pub fn contains(&self, product_id: &ProductId, variant: Option<&VariantSelector>) -> bool {
        self.find(product_id, variant).is_some()
    }

    /// Quantity of the matching line, or 0.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId, variant: Option<&VariantSelector>) -> u32 {
        self.find(product_id, variant).map_or(0, |line| line.quantity)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn find(&self, product_id: &ProductId, variant: Option<&VariantSelector>) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.matches(product_id, variant))
    }

    fn find_mut(
        &mut self,
        product_id: &ProductId,
        variant: Option<&VariantSelector>,
    ) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.matches(product_id, variant))
    }

    /// If the last mutation pushed the subtotal out of range, run `undo` and
    /// report. Returns whether it did.
    fn undo_if_unpriceable(&mut self, undo: impl FnOnce(&mut Vec<CartLine>)) -> bool {
        if checked_subtotal(&self.lines).is_some() {
            return false;
        }
        undo(&mut self.lines);
        error::report(ValidationError::AmountOverflow);
        true
    }

    /// Write the full collection. Failures are reported; the in-memory state
    /// is kept either way.
    fn persist(&self) {
        let blob = match serde_json::to_string(&self.lines) {
            Ok(blob) => blob,
            Err(e) => {
                error::report(PersistenceError::Encode(e));
                return;
            }
        };

        if let Err(source) = self.storage.set(&self.config.storage_key, &blob) {
            error::report(PersistenceError::Storage {
                key: self.config.storage_key.clone(),
                source,
            });
        }
    }
}

/// Validate a caller-supplied quantity.
fn positive_quantity(quantity: i64) -> Result<u32, ValidationError> {
    if quantity <= 0 {
        return Err(ValidationError::NonPositiveQuantity(quantity));
    }
    u32::try_from(quantity).map_err(|_| ValidationError::QuantityOverflow(quantity))
}

/// Drop empty lines and merge duplicate identities, keeping first positions.
fn normalize(lines: Vec<CartLine>) -> Vec<CartLine> {
    let mut out: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 {
            continue;
        }
        match out
            .iter_mut()
            .find(|kept| kept.matches(&line.product_id, line.variant_selector.as_ref()))
        {
            Some(kept) => kept.quantity = kept.quantity.saturating_add(line.quantity),
            None => out.push(line),
        }
    }

    // Drop lines, in order, that would take the subtotal out of range.
    let mut running = Decimal::ZERO;
    out.retain(|line| {
        match line.line_total().and_then(|total| running.checked_add(total)) {
            Some(next) => {
                running = next;
                true
            }
            None => {
                error::report(ValidationError::AmountOverflow);
                false
            }
        }
    });
    out
}

/// Sum of line totals, or `None` on overflow.
fn checked_subtotal(lines: &[CartLine]) -> Option<Decimal> {
    lines
        .iter()
        .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line.line_total()?))
}

/// Set the quantity of the matching line, if any.
fn set_quantity(
    lines: &mut [CartLine],
    product_id: &ProductId,
    variant: Option<&VariantSelector>,
    quantity: u32,
) {
    if let Some(line) = lines.iter_mut().find(|line| line.matches(product_id, variant)) {
        line.quantity = quantity;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use basket_core::CurrencyCode;
    use serde_json::json;

    use super::*;
    use crate::storage::{MemoryStorage, StorageError};

    fn product(id: &str, cents: i64) -> Product {
        Product::new(id, format!("Product {id}"), Decimal::new(cents, 2))
    }

    fn variant(value: serde_json::Value) -> Option<VariantSelector> {
        Some(VariantSelector::new(value).unwrap())
    }

    fn empty_cart() -> (CartStore<MemoryStorage>, MemoryStorage) {
        let storage = MemoryStorage::new();
        (CartStore::hydrate(storage.clone(), CartConfig::default()), storage)
    }

    fn p1() -> ProductId {
        ProductId::new("p1")
    }

    #[test]
    fn test_add_same_identity_merges() {
        let (mut cart, _) = empty_cart();
        cart.add_item(&product("p1", 1000), 2, None);
        cart.add_item(&product("p1", 1000), 1, None);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.quantity_of(&p1(), None), 3);
    }

    #[test]
    fn test_add_many_sums_quantities() {
        let (mut cart, _) = empty_cart();
        let size = variant(json!({"size": "M"}));
        for quantity in [1, 4, 2, 7, 1] {
            cart.add_item(&product("p1", 500), quantity, size.clone());
        }
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.quantity_of(&p1(), size.as_ref()), 15);
    }

    #[test]
    fn test_different_variants_are_distinct_lines() {
        let (mut cart, _) = empty_cart();
        cart.add_item(&product("p1", 1000), 1, variant(json!({"size": "M"})));
        cart.add_item(&product("p1", 1000), 1, variant(json!({"size": "L"})));

        assert_eq!(cart.lines().len(), 2);
        assert!(!cart.contains(&p1(), None));
    }

    #[test]
    fn test_key_order_does_not_duplicate_lines() {
        let (mut cart, _) = empty_cart();
        cart.add_item(&product("p1", 1000), 1, variant(json!({"size": "M", "color": "red"})));
        cart.add_item(&product("p1", 1000), 1, variant(json!({"color": "red", "size": "M"})));

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let (mut cart, _) = empty_cart();
        cart.add_item(&product("a", 100), 1, None);
        cart.add_item(&product("b", 100), 1, None);
        cart.add_item(&product("a", 100), 1, None);
        cart.update_quantity(&ProductId::new("b"), 9, None);

        let ids: Vec<&str> = cart.lines().iter().map(|l| l.product_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_non_positive_add_is_noop() {
        let (mut cart, storage) = empty_cart();
        cart.add_item(&product("p1", 1000), 0, None);
        cart.add_item(&product("p1", 1000), -2, None);

        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Decimal::ZERO);
        assert!(storage.get("cart").unwrap().is_none());
    }

    #[test]
    fn test_zero_add_does_not_change_subtotal() {
        let (mut cart, _) = empty_cart();
        cart.add_item(&product("p1", 1250), 2, None);
        let before = cart.subtotal();
        cart.add_item(&product("p1", 1250), 0, None);
        assert_eq!(cart.subtotal(), before);
    }

    #[test]
    fn test_unit_price_fixed_at_add_time() {
        let (mut cart, _) = empty_cart();
        cart.add_item(&product("p1", 1000), 1, None);
        cart.add_item(&product("p1", 9999), 1, None);

        assert_eq!(cart.lines()[0].unit_price, Decimal::new(1000, 2));
        assert_eq!(cart.subtotal(), Decimal::new(2000, 2));
    }

    #[test]
    fn test_update_quantity_sets_exactly() {
        let (mut cart, _) = empty_cart();
        cart.add_item(&product("p1", 1000), 5, None);
        cart.update_quantity(&p1(), 2, None);
        assert_eq!(cart.quantity_of(&p1(), None), 2);
    }

    #[test]
    fn test_update_quantity_missing_line_is_noop() {
        let (mut cart, _) = empty_cart();
        cart.update_quantity(&p1(), 4, None);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_to_zero_equals_remove() {
        let (mut updated, _) = empty_cart();
        let (mut removed, _) = empty_cart();
        for cart in [&mut updated, &mut removed] {
            cart.add_item(&product("p1", 1000), 3, None);
            cart.add_item(&product("p2", 500), 1, None);
        }

        updated.update_quantity(&p1(), 0, None);
        removed.remove_item(&p1(), None);

        assert_eq!(updated.lines(), removed.lines());
        assert!(!updated.contains(&p1(), None));
    }

    #[test]
    fn test_negative_update_removes_line() {
        let (mut cart, _) = empty_cart();
        cart.add_item(&product("p1", 1000), 1, None);
        cart.update_quantity(&p1(), -1, None);
        assert!(!cart.contains(&p1(), None));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (mut cart, _) = empty_cart();
        cart.add_item(&product("p1", 1000), 1, None);
        cart.remove_item(&p1(), None);
        cart.remove_item(&p1(), None);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_respects_variant() {
        let (mut cart, _) = empty_cart();
        let m = variant(json!({"size": "M"}));
        cart.add_item(&product("p1", 1000), 1, m.clone());
        cart.add_item(&product("p1", 1000), 1, None);

        cart.remove_item(&p1(), m.as_ref());
        assert!(cart.contains(&p1(), None));
        assert!(!cart.contains(&p1(), m.as_ref()));
    }

    #[test]
    fn test_totals() {
        let (mut cart, _) = empty_cart();
        cart.add_item(&product("p1", 1000), 2, None);
        cart.add_item(&product("p2", 250), 3, variant(json!({"price": "3.00"})));

        // 2 × 10.00 + 3 × 3.00
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.subtotal(), Decimal::new(2900, 2));
        assert_eq!(cart.tax_at(Decimal::new(1, 1)), Decimal::new(290, 2));
        assert_eq!(cart.total_at(Decimal::new(1, 1)), Decimal::new(3190, 2));
        assert_eq!(cart.tax(), Decimal::new(232, 2));

        let totals = cart.totals();
        assert_eq!(totals.item_count, 5);
        assert_eq!(totals.total.currency_code, CurrencyCode::USD);
        assert_eq!(totals.total.to_string(), "$31.32");
    }

    #[test]
    fn test_clear_writes_empty_collection() {
        let (mut cart, storage) = empty_cart();
        cart.add_item(&product("p1", 1000), 1, None);
        cart.clear_cart();

        assert!(cart.is_empty());
        assert_eq!(storage.get("cart").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_every_mutation_persists() {
        let (mut cart, storage) = empty_cart();
        cart.add_item(&product("p1", 1000), 1, None);
        let persisted: Vec<CartLine> =
            serde_json::from_str(&storage.get("cart").unwrap().unwrap()).unwrap();
        assert_eq!(persisted, cart.lines());

        cart.update_quantity(&p1(), 4, None);
        let persisted: Vec<CartLine> =
            serde_json::from_str(&storage.get("cart").unwrap().unwrap()).unwrap();
        assert_eq!(persisted[0].quantity, 4);
    }

    #[test]
    fn test_hydrate_round_trip() {
        let (mut cart, storage) = empty_cart();
        cart.add_item(&product("b", 100), 2, variant(json!({"size": "S"})));
        cart.add_item(&product("a", 300), 1, None);

        let reloaded = CartStore::hydrate(storage, CartConfig::default());
        assert_eq!(reloaded.lines(), cart.lines());
    }

    #[test]
    fn test_hydrate_corrupt_blob_yields_empty_cart() {
        let storage = MemoryStorage::new();
        storage.set("cart", "{not json").unwrap();

        let cart = CartStore::hydrate(storage.clone(), CartConfig::default());
        assert!(cart.is_empty());
        // The corrupt blob is left for inspection until the next mutation.
        assert_eq!(storage.get("cart").unwrap().as_deref(), Some("{not json"));
    }

    #[test]
    fn test_hydrate_negative_quantity_is_corrupt() {
        let storage = MemoryStorage::new();
        storage
            .set(
                "cart",
                r#"[{"productId":"p1","unitPrice":"1.00","quantity":-1,"display":{"name":"P"}}]"#,
            )
            .unwrap();
        let cart = CartStore::hydrate(storage, CartConfig::default());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_hydrate_drops_unpriceable_line() {
        let storage = MemoryStorage::new();
        let blob = json!([
            {"productId": "p1", "unitPrice": Decimal::MAX.to_string(), "quantity": 2, "display": {"name": "P1"}},
            {"productId": "p2", "unitPrice": "1.00", "quantity": 1, "display": {"name": "P2"}}
        ]);
        storage.set("cart", &blob.to_string()).unwrap();

        let cart = CartStore::hydrate(storage.clone(), CartConfig::default());
        assert_eq!(cart.lines().len(), 1);
        assert!(!cart.contains(&p1(), None));
        assert_eq!(cart.subtotal(), Decimal::new(100, 2));
        assert_eq!(cart.totals().total.amount, Decimal::new(108, 2));

        let persisted: Vec<CartLine> =
            serde_json::from_str(&storage.get("cart").unwrap().unwrap()).unwrap();
        assert_eq!(persisted, cart.lines());
    }

    #[test]
    fn test_amount_overflow_is_rejected() {
        let (mut cart, storage) = empty_cart();
        let max_priced = Product::new("p1", "P1", Decimal::MAX);

        cart.add_item(&max_priced, 1, None);
        cart.add_item(&max_priced, 1, None);
        assert_eq!(cart.quantity_of(&p1(), None), 1);

        cart.update_quantity(&p1(), 2, None);
        assert_eq!(cart.quantity_of(&p1(), None), 1);

        let max_variant = variant(json!({"price": Decimal::MAX.to_string()}));
        cart.add_item(&product("p2", 100), 2, max_variant);
        assert_eq!(cart.lines().len(), 1);

        assert_eq!(cart.subtotal(), Decimal::MAX);
        assert_eq!(cart.total(), Decimal::MAX);

        let persisted: Vec<CartLine> =
            serde_json::from_str(&storage.get("cart").unwrap().unwrap()).unwrap();
        assert_eq!(persisted[0].quantity, 1);
    }

    #[test]
    fn test_hydrate_repairs_duplicates_and_empty_lines() {
        let storage = MemoryStorage::new();
        storage
            .set(
                "cart",
                r#"[
                    {"productId":"p1","variantSelector":{"b":1,"a":2},"unitPrice":"1.00","quantity":1,"display":{"name":"P"}},
                    {"productId":"p2","unitPrice":"2.00","quantity":0,"display":{"name":"Q"}},
                    {"productId":"p1","variantSelector":{"a":2,"b":1},"unitPrice":"1.00","quantity":2,"display":{"name":"P"}}
                ]"#,
            )
            .unwrap();

        let cart = CartStore::hydrate(storage.clone(), CartConfig::default());
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.item_count(), 3);

        let persisted: Vec<CartLine> =
            serde_json::from_str(&storage.get("cart").unwrap().unwrap()).unwrap();
        assert_eq!(persisted, cart.lines());
    }

    #[test]
    fn test_write_failure_keeps_in_memory_state() {
        let storage = MemoryStorage::with_quota(2);
        let mut cart = CartStore::hydrate(storage.clone(), CartConfig::default());
        cart.add_item(&product("p1", 1000), 1, None);

        assert_eq!(cart.item_count(), 1);
        assert!(storage.get("cart").unwrap().is_none());
    }

    #[test]
    fn test_custom_storage_key() {
        let storage = MemoryStorage::new();
        let config = CartConfig {
            storage_key: "guest-cart".to_string(),
            ..CartConfig::default()
        };
        let mut cart = CartStore::hydrate(storage.clone(), config);
        cart.add_item(&product("p1", 1000), 1, None);

        assert!(storage.get("cart").unwrap().is_none());
        assert!(storage.get("guest-cart").unwrap().is_some());
    }

    #[test]
    fn test_positive_quantity() {
        assert_eq!(positive_quantity(3), Ok(3));
        assert_eq!(
            positive_quantity(0),
            Err(ValidationError::NonPositiveQuantity(0))
        );
        assert_eq!(
            positive_quantity(i64::MAX),
            Err(ValidationError::QuantityOverflow(i64::MAX))
        );
    }

    #[test]
    fn test_unreadable_storage_yields_empty_cart() {
        struct Broken;
        impl StorageAdapter for Broken {
            fn get(&self, _: &str) -> Result<Option<String>, StorageError> {
                Err(StorageError::Io(std::io::Error::other("disk gone")))
            }
            fn set(&self, _: &str, _: &str) -> Result<(), StorageError> {
                Err(StorageError::QuotaExceeded)
            }
            fn clear(&self, _: &str) -> Result<(), StorageError> {
                Ok(())
            }
        }

        let mut cart = CartStore::hydrate(Broken, CartConfig::default());
        assert!(cart.is_empty());
        cart.add_item(&product("p1", 1000), 1, None);
        assert_eq!(cart.item_count(), 1);
    }
}
