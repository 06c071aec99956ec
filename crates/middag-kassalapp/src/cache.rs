//! Process-lifetime cache for the nearby store-group set.

use std::collections::BTreeSet;

use tokio::sync::RwLock;

/// Caches the set of store groups near the configured location.
///
/// The set is fetched at most once per process in the common case. Two tasks
/// racing on a cold cache may both fetch; the second write wins and both see
/// an equivalent set, so no coordination beyond the lock is needed.
#[derive(Debug, Default)]
pub struct StoreGroupCache {
    groups: RwLock<Option<BTreeSet<String>>>,
}

impl StoreGroupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached set, or `None` if nothing has been stored yet.
    pub async fn get(&self) -> Option<BTreeSet<String>> {
        self.groups.read().await.clone()
    }

    pub async fn set(&self, groups: BTreeSet<String>) {
        *self.groups.write().await = Some(groups);
    }
}
