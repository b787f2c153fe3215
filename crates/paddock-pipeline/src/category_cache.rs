//! Category lookups memoized by event id
//!
//! Unbounded, no eviction; one cache lives for one discovery run. The lock is
//! released before the API call, so two concurrent misses on the same event
//! may both fetch (the second insert wins, with identical content).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use paddock_core::{ApiError, Category, ResultsApi};
use rustc_hash::FxHashMap;

#[derive(Default)]
pub struct CategoryCache {
    entries: Mutex<FxHashMap<String, Arc<[Category]>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl CategoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached categories of `event_id`, fetching them on a miss.
    ///
    /// Empty lists are returned but not cached.
    pub async fn get_or_fetch(
        &self,
        api: &dyn ResultsApi,
        event_id: &str,
    ) -> Result<Arc<[Category]>, ApiError> {
        if let Some(hit) = self.lookup(event_id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let categories: Arc<[Category]> = api.categories(event_id).await?.into();
        if !categories.is_empty() {
            self.entries()
                .insert(event_id.to_string(), Arc::clone(&categories));
        }
        Ok(categories)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, event_id: &str) -> Option<Arc<[Category]>> {
        self.entries().get(event_id).cloned()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, FxHashMap<String, Arc<[Category]>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use paddock_core::{Event, RiderResult, Season, Session};

    /// Serves two categories for every event except `"empty"`
    struct Categories {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ResultsApi for Categories {
        async fn seasons(&self) -> Result<Vec<Season>, ApiError> {
            Ok(Vec::new())
        }
        async fn events(&self, _: &str) -> Result<Vec<Event>, ApiError> {
            Ok(Vec::new())
        }
        async fn categories(&self, event_id: &str) -> Result<Vec<Category>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if event_id == "empty" {
                return Ok(Vec::new());
            }
            Ok(vec![
                Category { id: format!("{event_id}-c1"), name: "motogp".into() },
                Category { id: format!("{event_id}-c2"), name: "moto2".into() },
            ])
        }
        async fn sessions(&self, _: &str, _: &str) -> Result<Vec<Session>, ApiError> {
            Ok(Vec::new())
        }
        async fn classification(&self, _: &str) -> Result<Vec<RiderResult>, ApiError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn second_lookup_is_a_hit() {
        let api = Categories { calls: AtomicUsize::new(0) };
        let cache = CategoryCache::new();

        let first = cache.get_or_fetch(&api, "e1").await.unwrap();
        let second = cache.get_or_fetch(&api, "e1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[tokio::test]
    async fn keyed_by_event() {
        let api = Categories { calls: AtomicUsize::new(0) };
        let cache = CategoryCache::new();
        cache.get_or_fetch(&api, "e1").await.unwrap();
        let other = cache.get_or_fetch(&api, "e2").await.unwrap();
        assert_eq!(other[0].id, "e2-c1");
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn empty_lists_are_not_cached() {
        let api = Categories { calls: AtomicUsize::new(0) };
        let cache = CategoryCache::new();
        assert!(cache.get_or_fetch(&api, "empty").await.unwrap().is_empty());
        assert!(cache.get_or_fetch(&api, "empty").await.unwrap().is_empty());
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }
}
