//! Admin-only routes: client onboarding, discrepancy queue, blog import.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use stowline_auth::permissions::{ASNS_REVIEW, BLOG_IMPORT, CLIENTS_MANAGE};
use stowline_receiving::AsnStatus;

use crate::app::dto::{self, JsonBody};
use crate::app::errors::ApiResult;
use crate::app::services::{AppServices, NewClient};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/clients", post(create_client).get(list_clients))
        .route("/discrepancies", get(list_discrepancies))
        .route("/blog/import", post(import_blog))
}

/// POST /admin/clients - the temporary password is only ever returned here.
pub async fn create_client(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::CreateClientRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &CLIENTS_MANAGE)?;
    let created = services
        .create_client(NewClient {
            company_name: body.company_name,
            contact_name: body.contact_name,
            contact_email: body.contact_email,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "client": dto::client_to_json(&created.client),
            "account": dto::account_to_json(&created.account),
            "temporary_password": created.temporary_password,
        })),
    )
        .into_response())
}

pub async fn list_clients(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Response> {
    authz::require(&principal, &CLIENTS_MANAGE)?;
    let clients = services.store().list_clients().await?;
    let items: Vec<_> = clients.iter().map(dto::client_to_json).collect();
    Ok((StatusCode::OK, Json(json!({ "items": items }))).into_response())
}

pub async fn list_discrepancies(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Response> {
    authz::require(&principal, &ASNS_REVIEW)?;
    let asns = services.store().list_asns(None, Some(AsnStatus::Discrepancy)).await?;
    Ok((StatusCode::OK, Json(json!({ "items": asns }))).into_response())
}

pub async fn import_blog(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::BlogImportRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &BLOG_IMPORT)?;
    let report = services.import_posts(body.posts).await?;
    Ok((StatusCode::OK, Json(report)).into_response())
}
