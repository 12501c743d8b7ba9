use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::Response,
    routing::get,
};

use crate::{
    application::{
        error::ErrorReport,
        page::{PageResolver, ResolveError},
        repos::PageViewsRepo,
    },
    presentation::views::{
        IndexTemplate, PostTemplate, render_error_response, render_not_found_response,
        render_template_response,
    },
};

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
};

const SOURCE: &str = "infra::http::public";

#[derive(Clone)]
pub struct HttpState {
    pub pages: Arc<PageResolver>,
    pub views: Arc<dyn PageViewsRepo>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/post/{id}", get(post_detail))
        .route("/_health/db", get(public_health))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn index() -> Response {
    render_template_response(IndexTemplate::default(), StatusCode::OK)
}

async fn post_detail(State(state): State<HttpState>, Path(id): Path<String>) -> Response {
    match state.pages.resolve(&id).await {
        Ok(record) => render_template_response(
            PostTemplate {
                view: record.into(),
            },
            StatusCode::OK,
        ),
        Err(err) => resolve_error_to_response(err),
    }
}

fn resolve_error_to_response(err: ResolveError) -> Response {
    let status = match &err {
        err if err.is_not_found() => StatusCode::NOT_FOUND,
        ResolveError::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    render_error_response(status, ErrorReport::from_error(SOURCE, status, &err))
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.views.count().await.map(|_| ()))
}

async fn fallback() -> Response {
    render_not_found_response()
}
