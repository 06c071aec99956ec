//! Response shapes for the Kassalapp HTTP API.
//!
//! Every field that the API has been observed to omit or null out is an
//! `Option`; conversion into domain types happens in the client, where
//! unusable records are dropped rather than failing the whole response.

use middag_core::pricing::PricePoint;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct ProductsResponse {
    #[serde(default)]
    pub data: Vec<RawProduct>,
}

#[derive(Debug, Deserialize)]
pub struct RawProduct {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    /// Number or numeric string depending on endpoint version.
    #[serde(default)]
    pub current_price: Option<Value>,
    #[serde(default)]
    pub price_history: Vec<PricePoint>,
    #[serde(default)]
    pub store: Option<RawStoreRef>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawStoreRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductResponse {
    #[serde(default)]
    pub data: Option<RawProductDetail>,
}

#[derive(Debug, Deserialize)]
pub struct RawProductDetail {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub current_price: Option<Value>,
    #[serde(default)]
    pub store: Option<RawStoreRef>,
    #[serde(default)]
    pub unit_measure_name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StoresResponse {
    #[serde(default)]
    pub data: Vec<RawPhysicalStore>,
}

#[derive(Debug, Deserialize)]
pub struct RawPhysicalStore {
    #[serde(default)]
    pub group: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_search_tolerates_sparse_records() {
        let body = r#"{
            "data": [
                {"id": 1, "name": "Laks", "current_price": "129.90",
                 "store": {"name": "SPAR", "code": "SPAR_NO"}},
                {"name": "mystery item"},
                {}
            ]
        }"#;
        let parsed: ProductsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.len(), 3);
        assert_eq!(parsed.data[0].id, Some(1));
        assert_eq!(
            parsed.data[0].store.as_ref().unwrap().code.as_deref(),
            Some("SPAR_NO")
        );
        assert!(parsed.data[1].id.is_none());
        assert!(parsed.data[2].name.is_none());
    }

    #[test]
    fn product_detail_reads_unit_measure_name() {
        let body = r#"{
            "data": {
                "id": 456, "name": "Meierismør 500g",
                "current_price": 39.9,
                "store": {"name": "KIWI", "code": "KIWI_NO"},
                "unit_measure_name": "stk"
            }
        }"#;
        let parsed: ProductResponse = serde_json::from_str(body).unwrap();
        let detail = parsed.data.unwrap();
        assert_eq!(detail.unit_measure_name.as_deref(), Some("stk"));
        assert_eq!(detail.id, Some(456));
    }

    #[test]
    fn stores_response_tolerates_missing_group() {
        let body = r#"{"data": [{"group": "KIWI"}, {"name": "ignored"}]}"#;
        let parsed: StoresResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data[0].group.as_deref(), Some("KIWI"));
        assert!(parsed.data[1].group.is_none());
    }
}
