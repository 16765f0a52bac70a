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

use stowline_auth::permissions::{BILLS_READ, BILLS_WRITE};
use stowline_billing::{Bill, NewBillItem};
use stowline_core::BillId;

use crate::app::dto::{self, JsonBody, QueryParams};
use crate::app::errors::ApiResult;
use crate::app::routes::common::{ScopeQuery, parse_id};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_bills).post(create_bill))
        .route("/:id", get(get_bill))
        .route("/:id/items", post(add_item))
        .route("/:id/populate", post(populate))
        .route("/:id/reprice", post(reprice))
        .route("/:id/status", post(set_status))
}

pub async fn list_bills(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    QueryParams(query): QueryParams<ScopeQuery>,
) -> ApiResult<Response> {
    authz::require(&principal, &BILLS_READ)?;
    let scope = principal.read_scope(query.client_id)?;
    let bills = services.store().list_bills(scope.client_id()).await?;
    let items: Vec<_> = bills.iter().map(dto::bill_to_json).collect();
    Ok((StatusCode::OK, Json(json!({ "items": items }))).into_response())
}

/// POST /bills - one bill per client and period (409 on a duplicate).
pub async fn create_bill(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::CreateBillRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &BILLS_WRITE)?;
    let client_id = principal.write_client(body.client_id)?;
    services.ensure_client(client_id).await?;

    let mut bill = Bill::new(client_id, body.period, Utc::now());
    bill.notes = body.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    services.store().insert_bill(bill.clone()).await?;
    tracing::info!(bill_id = %bill.id, period = %bill.period, "bill created");

    Ok((StatusCode::CREATED, Json(dto::bill_to_json(&bill))).into_response())
}

pub async fn get_bill(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    authz::require(&principal, &BILLS_READ)?;
    let id: BillId = parse_id(&id, "bill")?;
    let bill = services.visible_bill(&principal, id).await?;
    Ok((StatusCode::OK, Json(dto::bill_to_json(&bill))).into_response())
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<NewBillItem>,
) -> ApiResult<Response> {
    authz::require(&principal, &BILLS_WRITE)?;
    let id: BillId = parse_id(&id, "bill")?;
    let mut bill = services.visible_bill(&principal, id).await?;

    let item_id = bill.add_item(body, Utc::now())?;
    services.store().save_bill(&mut bill).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "item_id": item_id, "bill": dto::bill_to_json(&bill) })),
    )
        .into_response())
}

/// POST /bills/:id/populate - copy a quote's lines in as zero-quantity items.
pub async fn populate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::PopulateBillRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &BILLS_WRITE)?;
    let id: BillId = parse_id(&id, "bill")?;

    let (bill, outcome) = services.populate_bill(&principal, id, body.quote_id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "added": outcome.added,
            "skipped": outcome.skipped,
            "bill": dto::bill_to_json(&bill),
        })),
    )
        .into_response())
}

pub async fn reprice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::RepriceBillRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &BILLS_WRITE)?;
    let id: BillId = parse_id(&id, "bill")?;
    let source = body.rate_source()?;

    let (bill, outcome) = services.reprice_bill(&principal, id, body.scope, source).await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "updated": outcome.updated,
            "unchanged": outcome.unchanged,
            "bill": dto::bill_to_json(&bill),
        })),
    )
        .into_response())
}

pub async fn set_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::BillStatusRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &BILLS_WRITE)?;
    let id: BillId = parse_id(&id, "bill")?;
    let mut bill = services.visible_bill(&principal, id).await?;

    bill.transition(body.status, Utc::now())?;
    services.store().save_bill(&mut bill).await?;
    tracing::info!(bill_id = %bill.id, status = bill.status.as_str(), "bill status changed");

    Ok((StatusCode::OK, Json(dto::bill_to_json(&bill))).into_response())
}
