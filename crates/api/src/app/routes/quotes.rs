use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use stowline_auth::permissions::{QUOTES_READ, QUOTES_WRITE};
use stowline_billing::Quote;
use stowline_core::QuoteId;

use crate::app::dto::{self, JsonBody, QueryParams};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::common::{ScopeQuery, parse_id};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_quotes).post(create_quote))
        .route("/:id", get(get_quote))
}

/// Client accounts also see quotes not bound to any client.
pub async fn list_quotes(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    QueryParams(query): QueryParams<ScopeQuery>,
) -> ApiResult<Response> {
    authz::require(&principal, &QUOTES_READ)?;
    let scope = principal.read_scope(query.client_id)?;
    let quotes = services.store().list_quotes(scope.client_id()).await?;
    Ok((StatusCode::OK, Json(json!({ "items": quotes }))).into_response())
}

/// POST /quotes - `client_id` omitted means a standard price list.
pub async fn create_quote(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::CreateQuoteRequest>,
) -> ApiResult<Response> {
    authz::require(&principal, &QUOTES_WRITE)?;
    if let Some(client_id) = body.client_id {
        services.ensure_client(client_id).await?;
    }

    let quote = Quote::new(&body.name, body.client_id, body.lines, Utc::now())?;
    services.store().insert_quote(quote.clone()).await?;
    tracing::info!(quote_id = %quote.id, lines = quote.lines.len(), "quote created");

    Ok((StatusCode::CREATED, Json(quote)).into_response())
}

pub async fn get_quote(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    authz::require(&principal, &QUOTES_READ)?;
    let id: QuoteId = parse_id(&id, "quote")?;
    let quote = services
        .store()
        .quote(id)
        .await?
        .ok_or_else(|| ApiError::not_found("quote"))?;
    if let Some(owner) = quote.client_id {
        principal.ensure_visible(owner, "quote")?;
    }
    Ok((StatusCode::OK, Json(quote)).into_response())
}
