use axum::{
    routing::{get, post},
    Router,
};

pub mod account;
pub mod admin;
pub mod asns;
pub mod auth;
pub mod bills;
pub mod blog;
pub mod chat;
pub mod common;
pub mod contact;
pub mod inventory;
pub mod quotes;
pub mod scan;
pub mod session;
pub mod shopify;
pub mod system;
pub mod translate;

/// Endpoints reachable without a token (marketing site and login).
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/login", post(auth::login))
        .route("/contact", post(contact::submit))
        .route("/chat", post(chat::chat))
        .nest("/translate", translate::router())
        .nest("/blog", blog::router())
}

/// Router for all authenticated endpoints. Each request counts as session
/// activity.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/scan", post(scan::scan))
        .route("/integrations/shopify/start", get(shopify::start))
        .merge(session::router())
        .nest("/account", account::router())
        .nest("/inventory", inventory::router())
        .nest("/bills", bills::router())
        .nest("/quotes", quotes::router())
        .nest("/asns", asns::router())
        .nest("/admin", admin::router())
}
