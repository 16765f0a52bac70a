//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store, gateways and the multi-step workflows
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs, extractors and JSON mapping helpers
//! - `errors.rs`: error categories and consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router from configuration (used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<(Router, Arc<services::AppServices>)> {
    errors::set_log_details(!config.environment.is_production());
    let services = Arc::new(services::build_services(config).await?);
    Ok((build_app_with(services.clone()), services))
}

/// Router over already-built services (tests inject fakes here).
pub fn build_app_with(services: Arc<services::AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        jwt: services.jwt_validator(),
        sessions: services.sessions(),
        touch: true,
    };

    // Every protected request resets the idle timer.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state.clone(),
        middleware::auth_middleware,
    ));

    // Status polling must not keep the session alive.
    let probe = routes::session::probe_router().layer(axum::middleware::from_fn_with_state(
        auth_state.probe(),
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .merge(probe)
        .layer(Extension(services))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
