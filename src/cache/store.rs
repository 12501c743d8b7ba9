//! Process-lifetime content cache with coalesced cold loads.

use std::{future::Future, sync::Arc};

use dashmap::DashMap;
use metrics::counter;
use tokio::sync::OnceCell;
use tracing::debug;

use super::{METRIC_CONTENT_CACHE_HIT, METRIC_CONTENT_CACHE_MISS, METRIC_CONTENT_LOAD};

const SOURCE: &str = "cache::store";

type Slot = Arc<OnceCell<Arc<str>>>;

/// Result of [`ContentCache::get_or_try_load`].
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub content: Arc<str>,
    /// `true` when this caller ran the loader; `false` for hits and for
    /// callers that waited on someone else's load.
    pub loaded: bool,
}

/// Id → content map shared by every resolution in the process.
///
/// Each id owns a slot that is filled at most once. Concurrent callers for a
/// cold id queue on the same slot: one runs the loader, the rest wait for its
/// result. A failed or cancelled load leaves the slot empty so the next waiter
/// runs its own loader. Filled slots are never evicted or refreshed.
#[derive(Debug, Default)]
pub struct ContentCache {
    slots: DashMap<String, Slot>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Arc<str>> {
        let content = self
            .slots
            .get(id)
            .and_then(|slot| slot.get().cloned());

        match content {
            Some(content) => {
                counter!(METRIC_CONTENT_CACHE_HIT).increment(1);
                Some(content)
            }
            None => {
                counter!(METRIC_CONTENT_CACHE_MISS).increment(1);
                None
            }
        }
    }

    /// Store content for `id` unless the slot is already filled or being
    /// filled. Returns whether the value was stored.
    pub fn put(&self, id: &str, content: Arc<str>) -> bool {
        self.slot(id).set(content).is_ok()
    }

    /// Return cached content for `id`, running `load` on a miss.
    ///
    /// At most one `load` is in flight per id at any moment. Errors are
    /// returned only to the caller whose loader produced them; nothing is
    /// cached on failure.
    pub async fn get_or_try_load<F, Fut, E>(&self, id: &str, load: F) -> Result<CacheLookup, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<str>, E>>,
    {
        let slot = self.slot(id);

        if let Some(content) = slot.get() {
            counter!(METRIC_CONTENT_CACHE_HIT).increment(1);
            return Ok(CacheLookup {
                content: content.clone(),
                loaded: false,
            });
        }
        counter!(METRIC_CONTENT_CACHE_MISS).increment(1);

        let mut loaded = false;
        let result = slot
            .get_or_try_init(|| {
                loaded = true;
                counter!(METRIC_CONTENT_LOAD).increment(1);
                load()
            })
            .await
            .cloned();

        match result {
            Ok(content) => Ok(CacheLookup { content, loaded }),
            Err(err) => {
                self.discard_if_unused(id, &slot);
                Err(err)
            }
        }
    }

    /// Number of ids with cached content.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, id: &str) -> Slot {
        if let Some(slot) = self.slots.get(id) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.slots.entry(id.to_owned()).or_default().value())
    }

    // Clones of a slot are only handed out under the shard lock held by
    // `remove_if`, so a count of two (map + caller) means nobody else waits.
    fn discard_if_unused(&self, id: &str, slot: &Slot) {
        let removed = self.slots.remove_if(id, |_, current| {
            Arc::ptr_eq(current, slot) && !current.initialized() && Arc::strong_count(current) <= 2
        });
        if removed.is_some() {
            debug!(
                target = SOURCE,
                page_id = id,
                "Dropped empty cache slot after failed load"
            );
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
