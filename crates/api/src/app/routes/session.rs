//! Idle-session status and activity.
//!
//! `GET /session` sits behind the non-touching auth layer so polling the
//! countdown does not itself keep the session alive.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/session/activity", post(activity))
        .route("/session/logout", post(logout))
}

pub fn probe_router() -> Router {
    Router::new().route("/session", get(status))
}

pub async fn status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Response> {
    let status = services.sessions().status(principal.principal().session_id)?;
    Ok((StatusCode::OK, Json(status)).into_response())
}

/// The auth layer already recorded the activity; report the fresh status.
pub async fn activity(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Response> {
    let status = services.sessions().status(principal.principal().session_id)?;
    Ok((StatusCode::OK, Json(status)).into_response())
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> StatusCode {
    services.logout(principal.principal().session_id);
    StatusCode::NO_CONTENT
}
