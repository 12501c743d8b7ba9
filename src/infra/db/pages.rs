use async_trait::async_trait;

use crate::{
    application::repos::{PageViewsRepo, RepoError},
    domain::{entities::PageViewsRecord, identifier::PageId},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PageViewsRow {
    id: String,
    views: i32,
}

impl TryFrom<PageViewsRow> for PageViewsRecord {
    type Error = RepoError;

    fn try_from(row: PageViewsRow) -> Result<Self, Self::Error> {
        Ok(Self {
            views: convert_views(row.views)?,
            id: row.id,
        })
    }
}

fn convert_views(value: i32) -> Result<u64, RepoError> {
    u64::try_from(value).map_err(|_| RepoError::Integrity {
        message: format!("negative view count {value}"),
    })
}

// Each method checks out its own connection; the `PoolConnection` guard
// returns it to the pool on every exit path, including `?` and cancellation.
#[async_trait]
impl PageViewsRepo for PostgresRepositories {
    async fn find(&self, id: &PageId) -> Result<Option<PageViewsRecord>, RepoError> {
        let mut conn = self.pool().acquire().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, PageViewsRow>("SELECT id, views FROM pages WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        row.map(PageViewsRecord::try_from).transpose()
    }

    async fn create(&self, id: &PageId) -> Result<PageViewsRecord, RepoError> {
        let mut conn = self.pool().acquire().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, PageViewsRow>(
            "INSERT INTO pages (id) VALUES ($1) RETURNING id, views",
        )
        .bind(id.as_str())
        .fetch_one(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

        PageViewsRecord::try_from(row)
    }

    async fn increment_views(&self, id: &PageId) -> Result<u64, RepoError> {
        let mut conn = self.pool().acquire().await.map_err(map_sqlx_error)?;

        let views: Option<i32> =
            sqlx::query_scalar("UPDATE pages SET views = views + 1 WHERE id = $1 RETURNING views")
                .bind(id.as_str())
                .fetch_optional(&mut *conn)
                .await
                .map_err(map_sqlx_error)?;

        convert_views(views.ok_or(RepoError::NotFound)?)
    }

    async fn count(&self) -> Result<u64, RepoError> {
        let mut conn = self.pool().acquire().await.map_err(map_sqlx_error)?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pages")
            .fetch_one(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        count
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}
