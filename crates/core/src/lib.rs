//! Basket Core - Shared types library.
//!
//! This crate provides common types used by the Basket client components:
//! - the cart state manager, which keys lines by product and [`VariantSelector`]
//! - the order sync store, which reports [`OrderStatus`] values
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, variant selectors, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
