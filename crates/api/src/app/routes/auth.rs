use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app::dto::{self, JsonBody};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<dto::LoginRequest>,
) -> ApiResult<Response> {
    let outcome = services.login(&body.email, &body.password).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "token": outcome.token,
            "expires_at": outcome.expires_at,
            "session_id": outcome.session_id,
            "account": dto::account_to_json(&outcome.account),
        })),
    )
        .into_response())
}
