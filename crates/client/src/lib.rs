//! Basket Client - cart, live updates, and order sync.
//!
//! The client is a set of explicit state containers owned by the embedding
//! application:
//!
//! - [`cart::CartStore`] - the shopping cart, persisted through a
//!   [`storage::StorageAdapter`] after every mutation
//! - [`connection::ConnectionManager`] - a long-lived live-update channel
//!   that reconnects with backoff
//! - [`orders::OrderStore`] - order queries and live status updates
//!
//! # Modules
//!
//! - [`config`] - Environment-driven configuration
//! - [`error`] - Error taxonomy and the observability channel
//! - [`telemetry`] - Tracing and Sentry setup

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod connection;
pub mod error;
pub mod orders;
pub mod storage;
pub mod telemetry;
