//! Error categories and their HTTP mapping.
//!
//! Every handler failure becomes an `ApiError`; the category decides status,
//! code and the message the caller sees. Upstream and internal failures get
//! a fixed generic message, and their details are logged only when
//! `set_log_details(true)` (development).

use std::sync::atomic::{AtomicBool, Ordering};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use stowline_auth::{AuthzError, PasswordError, TokenValidationError};
use stowline_core::DomainError;
use stowline_infra::shopify::ShopifyError;
use stowline_infra::{GatewayError, SessionError, StoreError, TranslationError};

pub const RATE_LIMITED_MESSAGE: &str = "Rate limits exceeded, please try again later.";
pub const PAYMENT_REQUIRED_MESSAGE: &str = "AI usage credits are exhausted. Please try again later.";
pub const UPSTREAM_MESSAGE: &str = "An upstream service failed. Please try again.";
pub const INTERNAL_MESSAGE: &str = "An unexpected error occurred. Please try again.";

static LOG_DETAILS: AtomicBool = AtomicBool::new(false);

pub fn set_log_details(enabled: bool) {
    LOG_DETAILS.store(enabled, Ordering::Relaxed);
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Validation(String),
    Unauthorized { code: &'static str, message: String },
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Invariant(String),
    RateLimited,
    PaymentRequired,
    Upstream(String),
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized { code: "unauthorized", message: msg.into() }
    }

    pub fn session_expired() -> Self {
        ApiError::Unauthorized { code: "session_expired", message: "session expired; please sign in again".to_string() }
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        ApiError::Internal(detail.into())
    }

    /// (status, code, public message)
    pub fn category(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.clone()),
            ApiError::Unauthorized { code, message } => (StatusCode::UNAUTHORIZED, *code, message.clone()),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.clone()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.clone()),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.clone()),
            ApiError::Invariant(m) => (StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", m.clone()),
            ApiError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited", RATE_LIMITED_MESSAGE.to_string()),
            ApiError::PaymentRequired => {
                (StatusCode::PAYMENT_REQUIRED, "payment_required", PAYMENT_REQUIRED_MESSAGE.to_string())
            }
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error", UPSTREAM_MESSAGE.to_string()),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", INTERNAL_MESSAGE.to_string()),
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.category();
        match &self {
            ApiError::Upstream(detail) | ApiError::Internal(detail) => {
                if LOG_DETAILS.load(Ordering::Relaxed) {
                    tracing::error!(code, detail = %detail, "request failed");
                } else {
                    tracing::error!(code, "request failed");
                }
            }
            _ => tracing::debug!(code, status = status.as_u16(), "request rejected"),
        }
        json_error(status, code, message)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(m) => ApiError::Validation(m),
            DomainError::InvalidId(m) => ApiError::Validation(format!("invalid identifier: {m}")),
            DomainError::InvariantViolation(m) => ApiError::Invariant(m),
            DomainError::NotFound => ApiError::NotFound("not found".to_string()),
            DomainError::Conflict(m) => ApiError::Conflict(m),
            DomainError::Unauthorized => ApiError::Forbidden("not allowed".to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("not found".to_string()),
            StoreError::Conflict(m) => ApiError::Conflict(m),
            StoreError::Rejected(d) => d.into(),
            StoreError::Backend(m) => ApiError::Internal(m),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<TokenValidationError> for ApiError {
    fn from(err: TokenValidationError) -> Self {
        match err {
            TokenValidationError::Expired => ApiError::Unauthorized { code: "token_expired", message: err.to_string() },
            _ => ApiError::unauthorized("invalid token"),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Hash(m) => ApiError::Internal(m),
            other => ApiError::Validation(other.to_string()),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::RateLimited => ApiError::RateLimited,
            GatewayError::PaymentRequired => ApiError::PaymentRequired,
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<TranslationError> for ApiError {
    fn from(err: TranslationError) -> Self {
        match err {
            TranslationError::Invalid(d) => d.into(),
            TranslationError::Gateway(g) => g.into(),
            TranslationError::Store(s) => s.into(),
        }
    }
}

impl From<ShopifyError> for ApiError {
    fn from(err: ShopifyError) -> Self {
        match err {
            ShopifyError::Invalid(d) => d.into(),
            ShopifyError::Store(s) => s.into(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(_: SessionError) -> Self {
        ApiError::session_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_messages_hide_details() {
        let (status, code, msg) = ApiError::internal("db password is hunter2").category();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "internal_error");
        assert_eq!(msg, INTERNAL_MESSAGE);

        let (status, _, msg) = ApiError::from(GatewayError::Status { status: 500, body: "trace".into() }).category();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!msg.contains("trace"));
    }

    #[test]
    fn gateway_limits_propagate() {
        assert_eq!(ApiError::from(GatewayError::RateLimited).category().0, StatusCode::TOO_MANY_REQUESTS);
        let (status, _, msg) = ApiError::from(GatewayError::PaymentRequired).category();
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(msg, PAYMENT_REQUIRED_MESSAGE);
    }

    #[test]
    fn store_and_domain_errors_map_to_categories() {
        assert_eq!(ApiError::from(StoreError::Conflict("dup".into())).category().0, StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(StoreError::Rejected(DomainError::invariant("stock cannot go negative"))).category().0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::from(DomainError::validation("bad")).category().2, "bad");
        assert_eq!(ApiError::from(PasswordError::Mismatch).category().0, StatusCode::BAD_REQUEST);
    }
}
