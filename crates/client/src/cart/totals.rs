//! Derived cart figures.

use basket_core::Price;
use serde::Serialize;

/// Snapshot of the cart's derived figures for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: u64,
    pub subtotal: Price,
    pub tax: Price,
    pub total: Price,
}
