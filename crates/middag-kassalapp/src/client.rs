//! HTTP client for the Kassalapp grocery API.

use std::collections::BTreeSet;

use async_trait::async_trait;
use middag_core::catalog::{CatalogError, ProductCatalog, ProductDetail};
use middag_core::pricing::{coerce_price, detect_price_drop};
use middag_core::state::Deal;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::cache::StoreGroupCache;
use crate::config::KassalappConfig;
use crate::wire::{ProductResponse, ProductsResponse, RawProduct, StoresResponse};

const CURRENCY: &str = "NOK";
const SEARCH_PAGE_SIZE: &str = "100";
const ERROR_BODY_LIMIT: usize = 200;

pub struct KassalappClient {
    http: reqwest::Client,
    config: KassalappConfig,
    store_groups: StoreGroupCache,
}

impl KassalappClient {
    pub fn new(config: KassalappConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            store_groups: StoreGroupCache::new(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .query(query)
            .send()
            .await
            .map_err(|err| CatalogError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|err| CatalogError::Decode(err.to_string()))
    }

    /// Fetches the nearby store groups, caching the result for the life of
    /// the client. Without a configured location, or when the fetch fails,
    /// an empty set is cached so filtering stays disabled rather than
    /// retrying on every search.
    async fn cached_store_groups(&self) -> BTreeSet<String> {
        if let Some(groups) = self.store_groups.get().await {
            return groups;
        }

        let groups = match &self.config.location {
            Some(location) => {
                let query = [
                    ("size", "100".to_owned()),
                    ("lat", location.latitude.to_string()),
                    ("lng", location.longitude.to_string()),
                    ("km", location.radius_km.to_string()),
                ];
                match self
                    .get_json::<StoresResponse>("physical-stores", &query)
                    .await
                {
                    Ok(stores) => stores
                        .data
                        .into_iter()
                        .filter_map(|store| store.group)
                        .collect(),
                    Err(err) => {
                        warn!(error = %err, "could not fetch nearby stores, store filtering disabled");
                        BTreeSet::new()
                    }
                }
            }
            None => {
                debug!("no location configured, store filtering disabled");
                BTreeSet::new()
            }
        };

        self.store_groups.set(groups.clone()).await;
        groups
    }
}

/// Converts raw search results to deals.
///
/// Records missing an id, name, or usable price are dropped. When
/// `nearby_groups` is non-empty, products whose store code is not in the
/// set are dropped too. With `filter_by_price_drop`, only products whose
/// history shows a drop survive, annotated with the previous price and
/// drop percentage.
fn deals_from_products(
    products: Vec<RawProduct>,
    nearby_groups: &BTreeSet<String>,
    filter_by_price_drop: bool,
) -> Vec<Deal> {
    let mut deals = Vec::new();
    for product in products {
        let (Some(id), Some(name)) = (product.id, product.name) else {
            continue;
        };
        let Some(current_price) = product.current_price.as_ref().and_then(coerce_price) else {
            continue;
        };

        if !nearby_groups.is_empty() {
            let code = product
                .store
                .as_ref()
                .and_then(|store| store.code.as_deref());
            if !code.is_some_and(|code| nearby_groups.contains(code)) {
                continue;
            }
        }

        let drop = if filter_by_price_drop {
            match detect_price_drop(&product.price_history, current_price) {
                Some(drop) => Some(drop),
                None => continue,
            }
        } else {
            None
        };

        let store = product
            .store
            .and_then(|store| store.name)
            .unwrap_or_else(|| "N/A".to_owned());

        deals.push(Deal {
            id,
            name,
            current_price,
            previous_price: drop.as_ref().map(|d| d.previous_price),
            price_drop_percentage: drop.as_ref().map(|d| d.drop_percentage),
            currency: CURRENCY.to_owned(),
            store,
            image_url: product.image,
        });
    }
    deals
}

#[async_trait]
impl ProductCatalog for KassalappClient {
    async fn search_products(
        &self,
        term: &str,
        filter_by_price_drop: bool,
    ) -> Result<Vec<Deal>, CatalogError> {
        let groups = self.cached_store_groups().await;
        let query = [
            ("search", term.to_owned()),
            ("size", SEARCH_PAGE_SIZE.to_owned()),
        ];
        let response: ProductsResponse = self.get_json("products", &query).await?;
        let total = response.data.len();
        let deals = deals_from_products(response.data, &groups, filter_by_price_drop);
        debug!(term, total, kept = deals.len(), filter_by_price_drop, "product search");
        Ok(deals)
    }

    async fn product_details(&self, product_id: i64) -> Result<ProductDetail, CatalogError> {
        let path = format!("products/{product_id}");
        let response: ProductResponse = match self.get_json(&path, &[]).await {
            Ok(response) => response,
            Err(CatalogError::Api { status: 404, .. }) => {
                return Err(CatalogError::NotFound(product_id.to_string()));
            }
            Err(err) => return Err(err),
        };
        let Some(detail) = response.data else {
            return Err(CatalogError::NotFound(product_id.to_string()));
        };
        let (Some(id), Some(name)) = (detail.id, detail.name) else {
            return Err(CatalogError::Decode(format!(
                "product {product_id} record missing id or name"
            )));
        };
        Ok(ProductDetail {
            id,
            name,
            current_price: detail.current_price.as_ref().and_then(coerce_price),
            store: detail.store.and_then(|store| store.name),
            unit_measure_name: detail.unit_measure_name,
            image_url: detail.image,
        })
    }

    async fn nearby_store_groups(&self) -> Result<BTreeSet<String>, CatalogError> {
        Ok(self.cached_store_groups().await)
    }
}

#[cfg(test)]
mod tests {
    use middag_core::pricing::PricePoint;
    use serde_json::json;

    use super::*;
    use crate::wire::RawStoreRef;

    fn raw_product(id: i64, name: &str, price: f64, code: &str) -> RawProduct {
        RawProduct {
            id: Some(id),
            name: Some(name.to_owned()),
            current_price: Some(json!(price)),
            price_history: Vec::new(),
            store: Some(RawStoreRef {
                name: Some(code.to_owned()),
                code: Some(code.to_owned()),
            }),
            image: None,
        }
    }

    #[test]
    fn drops_records_missing_required_fields() {
        let products = vec![
            raw_product(1, "Laks", 99.9, "SPAR_NO"),
            RawProduct {
                id: None,
                name: Some("no id".to_owned()),
                current_price: Some(json!(10.0)),
                price_history: Vec::new(),
                store: None,
                image: None,
            },
            RawProduct {
                id: Some(3),
                name: Some("no price".to_owned()),
                current_price: Some(json!("not a number")),
                price_history: Vec::new(),
                store: None,
                image: None,
            },
        ];
        let deals = deals_from_products(products, &BTreeSet::new(), false);
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].id, 1);
        assert_eq!(deals[0].currency, "NOK");
        assert!(deals[0].previous_price.is_none());
    }

    #[test]
    fn nearby_filter_keeps_only_matching_store_codes() {
        let products = vec![
            raw_product(1, "Laks", 99.9, "SPAR_NO"),
            raw_product(2, "Torsk", 89.9, "MENY_NO"),
        ];
        let groups = BTreeSet::from(["SPAR_NO".to_owned()]);
        let deals = deals_from_products(products, &groups, false);
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].name, "Laks");
    }

    #[test]
    fn empty_group_set_disables_filtering() {
        let products = vec![raw_product(2, "Torsk", 89.9, "MENY_NO")];
        let deals = deals_from_products(products, &BTreeSet::new(), false);
        assert_eq!(deals.len(), 1);
    }

    #[test]
    fn price_drop_filter_annotates_survivors() {
        let mut dropped = raw_product(1, "Laks", 99.9, "SPAR_NO");
        dropped.price_history = vec![
            PricePoint::new("2026-08-20", json!(99.9)),
            PricePoint::new("2026-08-10", json!(120.0)),
        ];
        let stable = raw_product(2, "Torsk", 89.9, "SPAR_NO");

        let deals = deals_from_products(vec![dropped, stable], &BTreeSet::new(), true);
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].previous_price, Some(120.0));
        assert_eq!(deals[0].price_drop_percentage, Some(16.75));
    }

    #[tokio::test]
    async fn store_groups_fetched_once_then_served_from_cache() {
        let client = KassalappClient::new(KassalappConfig::new("key"));
        assert!(client.store_groups.get().await.is_none());

        // No location configured: the first call resolves to an empty set
        // and caches it instead of retrying on every search.
        let groups = client.cached_store_groups().await;
        assert!(groups.is_empty());
        assert_eq!(client.store_groups.get().await, Some(BTreeSet::new()));
    }

    #[tokio::test]
    async fn populated_cache_short_circuits_the_fetch() {
        let client = KassalappClient::new(KassalappConfig::new("key"));
        client
            .store_groups
            .set(BTreeSet::from(["SPAR_NO".to_owned()]))
            .await;

        // A fresh resolution without a location would yield an empty set;
        // getting the seeded set back proves the cache was consulted first.
        let groups = client.cached_store_groups().await;
        assert!(groups.contains("SPAR_NO"));
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn store_name_falls_back_when_absent() {
        let mut product = raw_product(1, "Laks", 99.9, "SPAR_NO");
        product.store = None;
        let deals = deals_from_products(vec![product], &BTreeSet::new(), false);
        assert_eq!(deals[0].store, "N/A");
    }
}
