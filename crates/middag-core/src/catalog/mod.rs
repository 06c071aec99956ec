//! The `ProductCatalog` trait -- the adapter interface for the grocery
//! catalog collaborator.
//!
//! The catalog is an I/O boundary: the core never talks to it directly
//! during a stage (tool calls go through the generator adapter), but the
//! trait lives here so both adapters and tests share one seam.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::Deal;

/// Trimmed detail record for a single product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: i64,
    pub name: String,
    pub current_price: Option<f64>,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub unit_measure_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Failures of the catalog collaborator.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog unreachable: {0}")]
    Transport(String),

    #[error("catalog returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("could not decode catalog response: {0}")]
    Decode(String),

    #[error("product {0} not found")]
    NotFound(String),
}

/// Adapter interface for the grocery product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Search products by term.
    ///
    /// With `filter_by_price_drop` set, only products with a detected
    /// price drop are returned and each [`Deal`] carries
    /// `previous_price` / `price_drop_percentage`; without it, all
    /// matches are returned as plain deals.
    async fn search_products(
        &self,
        term: &str,
        filter_by_price_drop: bool,
    ) -> Result<Vec<Deal>, CatalogError>;

    /// Fetch trimmed details for one product.
    async fn product_details(&self, product_id: i64) -> Result<ProductDetail, CatalogError>;

    /// The group codes of stores near the configured location.
    ///
    /// Implementations cache this process-wide: it is fetched at most
    /// once per process lifetime (a racing double-fetch is harmless and
    /// tolerated) and reused by every request.
    async fn nearby_store_groups(&self) -> Result<BTreeSet<String>, CatalogError>;
}

// Compile-time assertion: ProductCatalog must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn ProductCatalog) {}
};
