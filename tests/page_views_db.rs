use std::sync::Arc;

use futures::future::join_all;
use quire::application::page::{PageResolver, ResolveError};
use quire::application::repos::{PageViewsRepo, RepoError};
use quire::cache::ContentCache;
use quire::domain::identifier::PageId;
use quire::infra::content::FsContentStore;
use quire::infra::db::PostgresRepositories;
use sqlx::PgPool;
use tempfile::TempDir;

fn id(raw: &str) -> PageId {
    PageId::parse(raw).expect("valid id")
}

fn content_dir(pages: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    for (name, body) in pages {
        std::fs::write(dir.path().join(format!("{name}.md")), body).expect("write page");
    }
    dir
}

fn build_resolver(pool: PgPool, dir: &TempDir) -> (PageResolver, Arc<PostgresRepositories>) {
    let repos = Arc::new(PostgresRepositories::new(pool));
    let resolver = PageResolver::new(
        Arc::new(FsContentStore::new(dir.path(), Some("md".to_string()))),
        Arc::new(ContentCache::new()),
        repos.clone(),
    );
    (resolver, repos)
}

#[sqlx::test(migrations = "./migrations")]
async fn resolving_counts_views_in_the_pages_table(pool: PgPool) {
    let dir = content_dir(&[("hello", "Hello World")]);
    let (resolver, repos) = build_resolver(pool, &dir);

    let first = resolver.resolve("hello").await.expect("first resolve");
    assert_eq!(first.id, "hello");
    assert_eq!(first.views, 1);
    assert_eq!(&*first.content, "Hello World");

    let second = resolver.resolve("hello").await.expect("second resolve");
    assert_eq!(second.views, 2);

    let row = repos
        .find(&id("hello"))
        .await
        .expect("find")
        .expect("row exists");
    assert_eq!(row.views, 2);
    assert_eq!(repos.count().await.expect("count"), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn missing_content_leaves_no_row(pool: PgPool) {
    let dir = content_dir(&[]);
    let (resolver, repos) = build_resolver(pool, &dir);

    let err = resolver.resolve("missing").await.expect_err("no content");
    assert!(matches!(err, ResolveError::ContentNotFound { .. }));

    assert!(repos.find(&id("missing")).await.expect("find").is_none());
    assert_eq!(repos.count().await.expect("count"), 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_cold_requests_create_one_row(pool: PgPool) {
    const REQUESTS: u64 = 24;

    let dir = content_dir(&[("burst", "burst content")]);
    let (resolver, repos) = build_resolver(pool, &dir);
    let resolver = Arc::new(resolver);

    let tasks = (0..REQUESTS).map(|_| {
        let resolver = resolver.clone();
        tokio::spawn(async move { resolver.resolve("burst").await })
    });

    let mut views: Vec<u64> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task joined").expect("resolved").views)
        .collect();
    views.sort_unstable();

    assert_eq!(views, (1..=REQUESTS).collect::<Vec<_>>());
    let row = repos
        .find(&id("burst"))
        .await
        .expect("find")
        .expect("row exists");
    assert_eq!(row.views, REQUESTS);
    assert_eq!(repos.count().await.expect("count"), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn create_reports_duplicates(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);

    let created = repos.create(&id("dup")).await.expect("first create");
    assert_eq!(created.views, 0);

    let err = repos.create(&id("dup")).await.expect_err("second create");
    assert!(matches!(err, RepoError::Duplicate { .. }), "got {err:?}");
}

#[sqlx::test(migrations = "./migrations")]
async fn increment_without_row_is_not_found(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);

    let err = repos
        .increment_views(&id("ghost"))
        .await
        .expect_err("no row");
    assert!(matches!(err, RepoError::NotFound));
}

#[sqlx::test(migrations = "./migrations")]
async fn resolver_adopts_rows_created_elsewhere(pool: PgPool) {
    let dir = content_dir(&[("seeded", "seeded content")]);
    let (resolver, repos) = build_resolver(pool, &dir);

    repos.create(&id("seeded")).await.expect("seed row");
    repos
        .increment_views(&id("seeded"))
        .await
        .expect("seed view");

    let record = resolver.resolve("seeded").await.expect("resolve");
    assert_eq!(record.views, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn negative_views_are_rejected_by_the_schema(pool: PgPool) {
    let result = sqlx::query("INSERT INTO pages (id, views) VALUES ('neg', -1)")
        .execute(&pool)
        .await;

    let err = result.expect_err("check constraint");
    let mapped = quire::infra::db::map_sqlx_error(err);
    assert!(matches!(mapped, RepoError::Integrity { .. }), "got {mapped:?}");
}
