use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::identifier::PageId;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content not found")]
    NotFound,
    #[error("content read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only source of page content keyed by a validated id.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn load(&self, id: &PageId) -> Result<Arc<str>, ContentError>;
}
