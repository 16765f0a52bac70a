//! Outbound HTTP collaborators: AI gateway (chat, translation) and mail relay.

use thiserror::Error;

pub mod chat;
pub mod mailer;
pub mod translator;

pub use chat::{ChatGateway, ChatMessage, ChatRole, ChatStream, HttpChatGateway};
pub use mailer::{HttpMailer, LogMailer, Mailer, OutboundEmail};
pub use translator::{ChatTranslator, Translator};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Upstream answered 429.
    #[error("rate limited by upstream")]
    RateLimited,

    /// Upstream answered 402 (usage credits exhausted).
    #[error("upstream requires payment")]
    PaymentRequired,

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected upstream payload: {0}")]
    Decode(String),

    #[error("not configured: {0}")]
    NotConfigured(&'static str),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

/// Map a non-success upstream response to a gateway error.
pub(crate) async fn status_error(response: reqwest::Response) -> GatewayError {
    let status = response.status().as_u16();
    match status {
        429 => GatewayError::RateLimited,
        402 => GatewayError::PaymentRequired,
        _ => {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(512).collect();
            GatewayError::Status { status, body }
        }
    }
}
