//! The `TextGenerator` trait -- the adapter interface for the
//! text-generation collaborator.
//!
//! The pipeline treats generation as an opaque function: prompt in,
//! free-form text out. A stage may offer catalog tools; whether and how
//! the backend uses them (function calling, ReAct, nothing at all) is the
//! adapter's business. The trait is object-safe so it can be shared as
//! `Arc<dyn TextGenerator>` across requests.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

/// Catalog operations a stage may offer to the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogTool {
    /// Search products by term, optionally filtered to price drops.
    SearchProducts,
    /// Fetch trimmed details for a single product id.
    ProductDetails,
}

impl fmt::Display for CatalogTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SearchProducts => "search_products",
            Self::ProductDetails => "get_product_details",
        };
        f.write_str(s)
    }
}

impl FromStr for CatalogTool {
    type Err = UnknownToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "search_products" => Ok(Self::SearchProducts),
            "get_product_details" => Ok(Self::ProductDetails),
            other => Err(UnknownToolError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an unknown tool name.
#[derive(Debug, Clone)]
pub struct UnknownToolError(pub String);

impl fmt::Display for UnknownToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown catalog tool: {:?}", self.0)
    }
}

impl std::error::Error for UnknownToolError {}

/// Failures of the generation collaborator itself (taxonomy: transport
/// faults). These fail the calling stage, never the pipeline.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The backend could not be reached.
    #[error("generation backend unreachable: {0}")]
    Transport(String),

    /// The backend was reached but refused or mangled the request.
    #[error("generation request failed: {0}")]
    Backend(String),
}

/// Adapter interface for the text-generation collaborator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a free-form text reply for `prompt`, with the given
    /// catalog tools available to the backend.
    async fn generate(&self, prompt: &str, tools: &[CatalogTool]) -> Result<String, GenerateError>;
}

// Compile-time assertion: TextGenerator must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn TextGenerator) {}
};
