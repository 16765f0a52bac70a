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
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/password", post(change_password))
}

/// POST /account/password
pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::ChangePasswordRequest>,
) -> ApiResult<Response> {
    services
        .change_password(principal.principal().user_id, &body.current_password, &body.new_password)
        .await?;
    Ok((StatusCode::OK, Json(json!({ "status": "password_changed" }))).into_response())
}
