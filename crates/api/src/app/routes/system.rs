use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    let p = principal.principal();
    Json(json!({
        "user_id": p.user_id,
        "session_id": p.session_id,
        "role": p.role.as_str(),
        "client_id": p.client_id,
        "permissions": p.permissions.iter().map(|perm| perm.as_str()).collect::<Vec<_>>(),
    }))
}
