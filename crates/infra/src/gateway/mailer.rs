use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use super::{GatewayError, status_error};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), GatewayError>;
}

/// JSON mail relay (`POST {url}` with a bearer key).
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    url: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, from: impl Into<String>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self { client, url: url.into(), api_key: api_key.into(), from: from.into() })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), GatewayError> {
        let payload = RelayPayload {
            from: &self.from,
            to: [&email.to],
            reply_to: email.reply_to.as_deref(),
            subject: &email.subject,
            text: &email.text,
        };
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        info!(to = %email.to, subject = %email.subject, "email relayed");
        Ok(())
    }
}

/// Logs instead of sending; used when no relay is configured.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), GatewayError> {
        info!(to = %email.to, subject = %email.subject, bytes = email.text.len(), "mail relay not configured; email logged");
        Ok(())
    }
}
