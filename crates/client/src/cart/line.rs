//! Cart line items and the product snapshot they are built from.

use basket_core::{ProductId, VariantSelector};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product as offered to `add_item`.
///
/// Only the fields the cart needs: the ID, the base price, and what to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Product {
    /// Create a product with no handle or image.
    #[must_use]
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            handle: None,
            image_url: None,
        }
    }
}

/// What the cart shows for a line, captured when the line was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<&Product> for DisplayMetadata {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            handle: product.handle.clone(),
            image_url: product.image_url.clone(),
        }
    }
}

/// One distinct purchasable configuration in the cart.
///
/// `unit_price` is fixed when the line is created. Quantity is always at
/// least 1 while the line is in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_selector: Option<VariantSelector>,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub display: DisplayMetadata,
}

impl CartLine {
    /// Build a new line, pricing it from the variant when the variant carries
    /// a price and from the product otherwise.
    #[must_use]
    pub fn new(product: &Product, quantity: u32, variant: Option<VariantSelector>) -> Self {
        let unit_price = variant
            .as_ref()
            .and_then(VariantSelector::price)
            .unwrap_or(product.price);

        Self {
            product_id: product.id.clone(),
            variant_selector: variant,
            unit_price,
            quantity,
            display: DisplayMetadata::from(product),
        }
    }

    /// Whether this line has the given identity.
    #[must_use]
    pub fn matches(&self, product_id: &ProductId, variant: Option<&VariantSelector>) -> bool {
        self.product_id == *product_id && self.variant_selector.as_ref() == variant
    }

    /// `unit_price × quantity`, or `None` if it does not fit a `Decimal`.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}
