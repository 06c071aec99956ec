//! Shared test doubles for middag integration tests.
//!
//! `ScriptedGenerator` stands in for the text-generation collaborator and
//! pops pre-canned replies per call; `FakeCatalog` serves canned deals and
//! product details. Both are `Send + Sync` so they can be shared exactly
//! like the real adapters.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use middag_core::catalog::{CatalogError, ProductCatalog, ProductDetail};
use middag_core::generate::{CatalogTool, GenerateError, TextGenerator};
use middag_core::state::Deal;

// ---------------------------------------------------------------------------
// Scripted generator
// ---------------------------------------------------------------------------

/// A text generator that replays a fixed script of replies.
///
/// Each `generate` call pops the next scripted result. Running past the
/// end of the script is reported as a backend error, which mimics a
/// collaborator outage mid-pipeline.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, GenerateError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(Ok(text.into()));
        self
    }

    /// Queue a collaborator failure.
    pub fn failure(self, detail: impl Into<String>) -> Self {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(Err(GenerateError::Backend(detail.into())));
        self
    }

    /// The prompts seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, _tools: &[CatalogTool]) -> Result<String, GenerateError> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(prompt.to_owned());
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Err(GenerateError::Backend("script exhausted".into())))
    }
}

// ---------------------------------------------------------------------------
// Fake catalog
// ---------------------------------------------------------------------------

/// A product catalog backed by in-memory fixtures.
#[derive(Default)]
pub struct FakeCatalog {
    deals_by_term: HashMap<String, Vec<Deal>>,
    details: HashMap<i64, ProductDetail>,
    store_groups: BTreeSet<String>,
    group_fetches: AtomicUsize,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deals(mut self, term: impl Into<String>, deals: Vec<Deal>) -> Self {
        self.deals_by_term.insert(term.into(), deals);
        self
    }

    pub fn with_detail(mut self, detail: ProductDetail) -> Self {
        self.details.insert(detail.id, detail);
        self
    }

    pub fn with_store_groups(mut self, groups: impl IntoIterator<Item = String>) -> Self {
        self.store_groups = groups.into_iter().collect();
        self
    }

    /// How many times `nearby_store_groups` was called.
    pub fn group_fetches(&self) -> usize {
        self.group_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductCatalog for FakeCatalog {
    async fn search_products(
        &self,
        term: &str,
        filter_by_price_drop: bool,
    ) -> Result<Vec<Deal>, CatalogError> {
        let mut deals = self.deals_by_term.get(term).cloned().unwrap_or_default();
        if filter_by_price_drop {
            deals.retain(|d| d.previous_price.is_some());
        } else {
            for deal in &mut deals {
                deal.previous_price = None;
                deal.price_drop_percentage = None;
            }
        }
        Ok(deals)
    }

    async fn product_details(&self, product_id: i64) -> Result<ProductDetail, CatalogError> {
        self.details
            .get(&product_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(product_id.to_string()))
    }

    async fn nearby_store_groups(&self) -> Result<BTreeSet<String>, CatalogError> {
        self.group_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.store_groups.clone())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A deal fixture with a detected drop.
pub fn deal_fixture(id: i64, name: &str, store: &str) -> Deal {
    Deal {
        id,
        name: name.to_owned(),
        current_price: 97.9,
        previous_price: Some(119.9),
        price_drop_percentage: Some(18.35),
        currency: "NOK".to_owned(),
        store: store.to_owned(),
        image_url: None,
    }
}
