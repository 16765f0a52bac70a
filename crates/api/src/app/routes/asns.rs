use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use stowline_auth::permissions::{ASNS_CREATE, ASNS_READ, ASNS_RECEIVE, ASNS_REVIEW};
use stowline_core::AsnId;
use stowline_receiving::Asn;

use crate::app::dto::{self, JsonBody, QueryParams};
use crate::app::errors::ApiResult;
use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_asns).post(create_asn))
        .route("/:id", get(get_asn))
        .route("/:id/receive", post(receive_asn))
        .route("/:id/review", post(review_asn))
        .route("/:id/close", post(close_asn))
}

pub async fn list_asns(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    QueryParams(query): QueryParams<dto::AsnListQuery>,
) -> ApiResult<Response> {
    authz::require(&principal, &ASNS_READ)?;
    let scope = principal.read_scope(query.client_id)?;
    let asns = services.store().list_asns(scope.client_id(), query.status).await?;
    Ok((StatusCode::OK, Json(json!({ "items": asns }))).into_response())
}

pub async fn create_asn(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::CreateAsnRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &ASNS_CREATE)?;
    let client_id = principal.write_client(body.client_id)?;
    services.ensure_client(client_id).await?;

    let asn = Asn::submit(client_id, body.asn, Utc::now())?;
    services.store().insert_asn(asn.clone()).await?;
    tracing::info!(asn_id = %asn.id, client_id = %client_id, lines = asn.lines.len(), "ASN submitted");

    Ok((StatusCode::CREATED, Json(asn)).into_response())
}

pub async fn get_asn(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    authz::require(&principal, &ASNS_READ)?;
    let id: AsnId = parse_id(&id, "ASN")?;
    let asn = services.visible_asn(&principal, id).await?;
    Ok((StatusCode::OK, Json(asn)).into_response())
}

/// POST /asns/:id/receive - dock counts; clean receipts post to inventory.
pub async fn receive_asn(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::ReceiveAsnRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &ASNS_RECEIVE)?;
    let id: AsnId = parse_id(&id, "ASN")?;
    let outcome = services.receive_asn(&principal, id, body.counts).await?;
    Ok((StatusCode::OK, Json(outcome)).into_response())
}

pub async fn review_asn(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::ReviewAsnRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &ASNS_REVIEW)?;
    let id: AsnId = parse_id(&id, "ASN")?;
    let outcome = services.review_asn(&principal, id, body.resolution, body.note).await?;
    Ok((StatusCode::OK, Json(outcome)).into_response())
}

pub async fn close_asn(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    authz::require(&principal, &ASNS_RECEIVE)?;
    let id: AsnId = parse_id(&id, "ASN")?;
    let asn = services.close_asn(&principal, id).await?;
    Ok((StatusCode::OK, Json(asn)).into_response())
}
