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

use stowline_auth::permissions::{INVENTORY_READ, INVENTORY_WRITE};
use stowline_core::SkuId;
use stowline_inventory::{LedgerReason, on_hand};

use crate::app::dto::{self, JsonBody, QueryParams};
use crate::app::errors::ApiResult;
use crate::app::routes::common::{ScopeQuery, parse_id};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_inventory))
        .route("/skus", post(create_sku))
        .route("/skus/:id/ledger", get(get_ledger))
        .route("/skus/:id/adjust", post(adjust_stock))
}

/// GET /inventory - SKUs in scope with their on-hand quantity.
pub async fn list_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    QueryParams(query): QueryParams<ScopeQuery>,
) -> ApiResult<Response> {
    authz::require(&principal, &INVENTORY_READ)?;
    let scope = principal.read_scope(query.client_id)?;

    let skus = services.store().list_skus(scope.client_id()).await?;
    let stock = services.store().on_hand(scope.client_id()).await?;
    let items: Vec<_> = skus
        .iter()
        .map(|s| dto::sku_to_json(s, stock.get(&s.id).copied().unwrap_or(0)))
        .collect();

    Ok((StatusCode::OK, Json(json!({ "items": items }))).into_response())
}

pub async fn create_sku(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::CreateSkuRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &INVENTORY_WRITE)?;
    let client_id = principal.write_client(body.client_id)?;
    services.ensure_client(client_id).await?;

    let sku = body.sku.into_sku(client_id, Utc::now())?;
    services.store().insert_sku(sku.clone()).await?;
    tracing::info!(sku_id = %sku.id, client_id = %client_id, "sku created");

    Ok((StatusCode::CREATED, Json(dto::sku_to_json(&sku, 0))).into_response())
}

pub async fn get_ledger(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    authz::require(&principal, &INVENTORY_READ)?;
    let id: SkuId = parse_id(&id, "SKU")?;
    let sku = services.visible_sku(&principal, id).await?;

    let entries = services.store().ledger(sku.id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "sku": dto::sku_to_json(&sku, on_hand(&entries)),
            "entries": entries,
        })),
    )
        .into_response())
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::AdjustStockRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &INVENTORY_WRITE)?;
    let id: SkuId = parse_id(&id, "SKU")?;

    let reason = body.reason.unwrap_or(LedgerReason::Adjustment);
    let on_hand = services
        .adjust_stock(&principal, id, body.delta, reason, body.reference)
        .await?;

    Ok((StatusCode::OK, Json(json!({ "sku_id": id, "on_hand": on_hand }))).into_response())
}
