use std::sync::Arc;

use async_trait::async_trait;

use super::{ChatGateway, ChatMessage, GatewayError};

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, GatewayError>;
}

/// Translation through the chat model.
#[derive(Clone)]
pub struct ChatTranslator {
    chat: Arc<dyn ChatGateway>,
}

impl ChatTranslator {
    pub fn new(chat: Arc<dyn ChatGateway>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl Translator for ChatTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, GatewayError> {
        let prompt = format!(
            "Translate the user's text into the language with code '{target_lang}'. \
             Keep formatting and product codes unchanged. Reply with the translation only."
        );
        let reply = self
            .chat
            .complete(vec![ChatMessage::system(prompt), ChatMessage::user(text)])
            .await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(GatewayError::Decode("empty translation".to_string()));
        }
        Ok(reply.to_string())
    }
}
