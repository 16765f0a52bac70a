use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use crate::app::errors::{ApiError, ApiResult};
use crate::app::services::AppServices;

/// Public blog: only posts whose publish time has passed are visible.
pub fn router() -> Router {
    Router::new()
        .route("/", get(list_posts))
        .route("/:slug", get(get_post))
}

pub async fn list_posts(Extension(services): Extension<Arc<AppServices>>) -> ApiResult<Response> {
    let now = Utc::now();
    let posts: Vec<_> = services
        .store()
        .list_posts()
        .await?
        .into_iter()
        .filter(|p| p.is_published(now))
        .collect();
    Ok((StatusCode::OK, Json(json!({ "items": posts }))).into_response())
}

pub async fn get_post(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
) -> ApiResult<Response> {
    let post = services
        .store()
        .post_by_slug(&slug)
        .await?
        .filter(|p| p.is_published(Utc::now()))
        .ok_or_else(|| ApiError::not_found("post"))?;
    Ok((StatusCode::OK, Json(post)).into_response())
}
