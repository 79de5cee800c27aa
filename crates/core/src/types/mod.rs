//! Core types for Basket.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod selector;
pub mod status;

pub use id::*;
pub use price::{CurrencyCode, Price};
pub use selector::{SelectorError, VariantSelector};
pub use status::*;
