//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::PageViewsRecord;
use crate::domain::identifier::PageId;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Durable `(id, views)` rows backing each page.
///
/// `create` reports a primary-key race as [`RepoError::Duplicate`] so callers
/// can re-fetch the winner's row; every other constraint failure is
/// [`RepoError::Integrity`].
#[async_trait]
pub trait PageViewsRepo: Send + Sync {
    async fn find(&self, id: &PageId) -> Result<Option<PageViewsRecord>, RepoError>;

    async fn create(&self, id: &PageId) -> Result<PageViewsRecord, RepoError>;

    /// Atomically add one view and return the committed count.
    async fn increment_views(&self, id: &PageId) -> Result<u64, RepoError>;

    async fn count(&self) -> Result<u64, RepoError>;
}
