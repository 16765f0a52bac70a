use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use stowline_content::ContactSubmission;

use crate::app::dto::JsonBody;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

/// POST /contact
///
/// A filled honeypot gets the same answer as a delivered message.
pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<ContactSubmission>,
) -> ApiResult<Response> {
    services.submit_contact(body).await?;
    Ok((StatusCode::OK, Json(json!({ "status": "sent" }))).into_response())
}
