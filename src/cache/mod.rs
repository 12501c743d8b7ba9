//! In-process content cache.
//!
//! Page content is read from disk once per id and kept for the lifetime of the
//! process. Cold lookups for the same id are coalesced so a burst of first
//! requests performs a single read.

mod store;

pub use store::{CacheLookup, ContentCache};

pub(crate) const METRIC_CONTENT_CACHE_HIT: &str = "quire_content_cache_hit_total";
pub(crate) const METRIC_CONTENT_CACHE_MISS: &str = "quire_content_cache_miss_total";
pub(crate) const METRIC_CONTENT_LOAD: &str = "quire_content_load_total";
