//! Kassalapp grocery catalog adapter.
//!
//! Implements the core [`middag_core::catalog::ProductCatalog`] trait
//! against the Kassalapp REST API (`kassal.app/api/v1`), including the
//! process-wide nearby store-group cache and the price-drop filtering
//! that turns raw products into deals.

pub mod cache;
pub mod client;
pub mod config;
pub mod wire;

pub use cache::StoreGroupCache;
pub use client::KassalappClient;
pub use config::{KassalappConfig, Location};
