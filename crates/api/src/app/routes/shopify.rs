use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use stowline_auth::permissions::SHOPIFY_CONNECT;

use crate::app::dto::{self, QueryParams};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

/// GET /integrations/shopify/start?shop=...
///
/// Returns the authorization URL for the browser to follow.
pub async fn start(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    QueryParams(query): QueryParams<dto::ShopifyStartQuery>,
) -> ApiResult<Response> {
    authz::require(&principal, &SHOPIFY_CONNECT)?;
    let client_id = principal.write_client(query.client_id)?;
    services.ensure_client(client_id).await?;

    let started = services.shopify_start(client_id, &query.shop).await?;
    tracing::info!(client_id = %client_id, shop = %started.shop, "shopify oauth started");
    Ok((StatusCode::OK, Json(started)).into_response())
}
