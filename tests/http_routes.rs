use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use quire::application::page::PageResolver;
use quire::application::repos::{PageViewsRepo, RepoError};
use quire::cache::ContentCache;
use quire::domain::entities::PageViewsRecord;
use quire::domain::identifier::PageId;
use quire::infra::content::FsContentStore;
use quire::infra::http::{HttpState, build_router};
use tempfile::TempDir;
use tower::ServiceExt;

#[derive(Default)]
struct MemoryViews {
    rows: Mutex<HashMap<String, u64>>,
    offline: bool,
}

impl MemoryViews {
    fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.offline {
            Err(RepoError::Timeout)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PageViewsRepo for MemoryViews {
    async fn find(&self, id: &PageId) -> Result<Option<PageViewsRecord>, RepoError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(id.as_str())
            .map(|views| PageViewsRecord {
                id: id.to_string(),
                views: *views,
            }))
    }

    async fn create(&self, id: &PageId) -> Result<PageViewsRecord, RepoError> {
        self.check()?;
        self.rows.lock().unwrap().insert(id.to_string(), 0);
        Ok(PageViewsRecord {
            id: id.to_string(),
            views: 0,
        })
    }

    async fn increment_views(&self, id: &PageId) -> Result<u64, RepoError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let views = rows.get_mut(id.as_str()).ok_or(RepoError::NotFound)?;
        *views += 1;
        Ok(*views)
    }

    async fn count(&self) -> Result<u64, RepoError> {
        self.check()?;
        Ok(self.rows.lock().unwrap().len() as u64)
    }
}

fn app(dir: &TempDir, views: MemoryViews) -> Router {
    let views: Arc<dyn PageViewsRepo> = Arc::new(views);
    let resolver = PageResolver::new(
        Arc::new(FsContentStore::new(dir.path(), Some("md".to_string()))),
        Arc::new(ContentCache::new()),
        views.clone(),
    );
    build_router(HttpState {
        pages: Arc::new(resolver),
        views,
    })
}

fn content_dir() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("hello.md"), "Hello World").expect("write page");
    dir
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test]
async fn post_page_renders_content_and_view_count() {
    let dir = content_dir();
    let app = app(&dir, MemoryViews::default());

    let (status, body) = get(&app, "/post/hello").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Hello World"));
    assert!(body.contains("Views: 1"));

    let (status, body) = get(&app, "/post/hello").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Views: 2"));
}

#[tokio::test]
async fn missing_and_invalid_pages_are_not_found() {
    let dir = content_dir();
    let app = app(&dir, MemoryViews::default());

    let (status, body) = get(&app, "/post/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Page Not Found"));

    let (status, _) = get(&app, "/post/.hidden").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/post/a%2F..%2Fb").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn storage_outage_is_service_unavailable() {
    let dir = content_dir();
    let app = app(&dir, MemoryViews::offline());

    let (status, body) = get(&app, "/post/hello").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("Temporarily Unavailable"));
}

#[tokio::test]
async fn unreadable_content_is_internal_error() {
    let dir = content_dir();
    std::fs::write(dir.path().join("broken.md"), [0xff, 0xfe, 0x00]).expect("write page");
    let app = app(&dir, MemoryViews::default());

    let (status, body) = get(&app, "/post/broken").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Something Went Wrong"));

    let (status, _) = get(&app, "/post/hello").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let dir = content_dir();
    let app = app(&dir, MemoryViews::default());

    let request = Request::builder()
        .method(Method::GET)
        .uri("/post/missing")
        .body(Body::empty())
        .expect("request should build");
    let response = app.oneshot(request).await.expect("router should respond");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .expect("request id header");
    assert_eq!(request_id.len(), 36);
}

#[tokio::test]
async fn health_reflects_storage_reachability() {
    let dir = content_dir();

    let (status, _) = get(&app(&dir, MemoryViews::default()), "/_health/db").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = get(&app(&dir, MemoryViews::offline()), "/_health/db").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn index_and_unknown_routes() {
    let dir = content_dir();
    let app = app(&dir, MemoryViews::default());

    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("quire"));

    let (status, _) = get(&app, "/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
