//! Kassalapp adapter configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://kassal.app/api/v1";

/// Location used to restrict results to nearby stores. Without one, store
/// filtering is disabled and every store counts as nearby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KassalappConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub location: Option<Location>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

impl KassalappConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            location: None,
        }
    }
}
