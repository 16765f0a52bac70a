use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;

use crate::app::dto::{self, JsonBody};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(translate))
        .route("/batch", post(translate_batch))
}

/// POST /translate - cached by (target language, text).
pub async fn translate(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<dto::TranslateRequest>,
) -> ApiResult<Response> {
    let translated = services.translate(&body.text, &body.target_lang).await?;
    Ok((StatusCode::OK, Json(translated)).into_response())
}

pub async fn translate_batch(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<dto::TranslateBatchRequest>,
) -> ApiResult<Response> {
    let items = services.translate_batch(&body.texts, &body.target_lang).await?;
    let cached = items.iter().filter(|t| t.cached).count();
    Ok((StatusCode::OK, Json(json!({ "items": items, "cached": cached }))).into_response())
}
