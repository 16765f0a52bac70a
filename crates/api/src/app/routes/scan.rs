use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use stowline_auth::permissions::SCAN_LOOKUP;

use crate::app::dto::{self, JsonBody};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

/// POST /scan
pub async fn scan(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::ScanRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &SCAN_LOOKUP)?;
    let outcome = services.scan(&principal, &body.code).await?;
    Ok((StatusCode::OK, Json(outcome)).into_response())
}
