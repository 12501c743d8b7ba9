use std::sync::Arc;

/// A resolved page: cached content merged with its current view count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub id: String,
    pub views: u64,
    pub content: Arc<str>,
}

/// The durable half of a page, one row per id in the `pages` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageViewsRecord {
    pub id: String,
    pub views: u64,
}
