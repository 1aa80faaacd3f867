//! In-memory response cache for catalog requests
//!
//! One cache lives for one run. Entries are never evicted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// What a previous request for the same URL produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedResponse {
    /// Successful response body
    Body(Arc<str>),
    /// The endpoint answered 404
    NotFound,
}

/// Response cache keyed by the full request URL
///
/// Cloning shares the underlying map, so a cache can be handed to a client
/// and still inspected by whoever created it.
#[derive(Debug, Clone, Default)]
pub struct ResponseCache {
    entries: Arc<Mutex<HashMap<String, CachedResponse>>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let hit = entries.get(key).cloned();
        if hit.is_some() {
            debug!("Cache hit: {}", key);
        }
        hit
    }

    pub fn insert(&self, key: impl Into<String>, response: CachedResponse) {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key.into(), response);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
