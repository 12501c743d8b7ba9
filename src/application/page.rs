use std::{sync::Arc, time::Instant};

use metrics::{counter, histogram};
use thiserror::Error;
use tracing::debug;

use crate::application::content::{ContentError, ContentSource};
use crate::application::repos::{PageViewsRepo, RepoError};
use crate::cache::ContentCache;
use crate::domain::entities::PageRecord;
use crate::domain::identifier::{IdentifierError, PageId};

const SOURCE: &str = "application::page::PageResolver";

pub(crate) const METRIC_PAGE_RESOLVE_MS: &str = "quire_page_resolve_ms";
pub(crate) const METRIC_PAGE_VIEWS: &str = "quire_page_views_total";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid page identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),
    #[error("content for page `{id}` not found")]
    ContentNotFound { id: String },
    #[error("content for page `{id}` could not be read")]
    ContentIo {
        id: String,
        #[source]
        source: std::io::Error,
    },
    #[error("page storage unavailable during {operation}")]
    StorageUnavailable {
        operation: &'static str,
        #[source]
        source: RepoError,
    },
}

impl ResolveError {
    fn content(id: &PageId, err: ContentError) -> Self {
        match err {
            ContentError::NotFound => Self::ContentNotFound { id: id.to_string() },
            ContentError::Io(source) => Self::ContentIo {
                id: id.to_string(),
                source,
            },
        }
    }

    fn storage(operation: &'static str, source: RepoError) -> Self {
        Self::StorageUnavailable { operation, source }
    }

    /// Whether the caller should present this as a missing page.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifier(_) | Self::ContentNotFound { .. }
        )
    }
}

/// Merges cached page content with its durable view counter.
///
/// Every successful [`resolve`](Self::resolve) counts exactly one view. The
/// row for an id is created lazily the first time its content is found; a
/// missing content file never creates a row.
#[derive(Clone)]
pub struct PageResolver {
    content: Arc<dyn ContentSource>,
    cache: Arc<ContentCache>,
    views: Arc<dyn PageViewsRepo>,
}

impl PageResolver {
    pub fn new(
        content: Arc<dyn ContentSource>,
        cache: Arc<ContentCache>,
        views: Arc<dyn PageViewsRepo>,
    ) -> Self {
        Self {
            content,
            cache,
            views,
        }
    }

    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }

    pub async fn resolve(&self, raw_id: &str) -> Result<PageRecord, ResolveError> {
        let started_at = Instant::now();
        let result = self.resolve_inner(raw_id).await;
        histogram!(METRIC_PAGE_RESOLVE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        result
    }

    async fn resolve_inner(&self, raw_id: &str) -> Result<PageRecord, ResolveError> {
        let id = PageId::parse(raw_id)?;

        // The caller that loads cold content also settles the row before the
        // content becomes visible to waiters, so they find it on their first
        // lookup instead of racing to insert it.
        let mut row_on_load: Option<Result<(), RepoError>> = None;
        let lookup = {
            let row_slot = &mut row_on_load;
            let id = &id;
            self.cache
                .get_or_try_load(id.as_str(), move || async move {
                    let content = self
                        .content
                        .load(id)
                        .await
                        .map_err(|err| ResolveError::content(id, err))?;
                    *row_slot = Some(self.ensure_row(id).await);
                    Ok::<_, ResolveError>(content)
                })
                .await?
        };

        match row_on_load {
            Some(Ok(())) => {}
            Some(Err(err)) => return Err(ResolveError::storage("ensure_row", err)),
            None => self
                .ensure_row(&id)
                .await
                .map_err(|err| ResolveError::storage("ensure_row", err))?,
        }

        let views = self
            .views
            .increment_views(&id)
            .await
            .map_err(|err| ResolveError::storage("increment_views", err))?;
        counter!(METRIC_PAGE_VIEWS).increment(1);

        debug!(
            target = SOURCE,
            page_id = %id,
            views,
            loaded = lookup.loaded,
            "Resolved page"
        );

        Ok(PageRecord {
            id: id.into_inner(),
            views,
            content: lookup.content,
        })
    }

    async fn ensure_row(&self, id: &PageId) -> Result<(), RepoError> {
        if self.views.find(id).await?.is_some() {
            return Ok(());
        }

        match self.views.create(id).await {
            Ok(_) => {
                debug!(target = SOURCE, page_id = %id, "Created page views row");
                Ok(())
            }
            Err(RepoError::Duplicate { constraint }) => {
                debug!(
                    target = SOURCE,
                    page_id = %id,
                    constraint = %constraint,
                    "Page views row created concurrently; re-fetching"
                );
                match self.views.find(id).await? {
                    Some(_) => Ok(()),
                    None => Err(RepoError::Integrity {
                        message: format!(
                            "row for `{id}` conflicted on `{constraint}` but could not be found"
                        ),
                    }),
                }
            }
            Err(err) => Err(err),
        }
    }
}
