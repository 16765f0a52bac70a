//! OpenAI-compatible chat completions client.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GatewayError, status_error};
use crate::sse::{SseEvent, SseLineDecoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

/// Stream of content deltas, in order.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<String, GatewayError>> + Send>>;

#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn stream(&self, messages: Vec<ChatMessage>) -> Result<ChatStream, GatewayError>;

    /// Collect a full reply.
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, GatewayError> {
        let mut stream = self.stream(messages).await?;
        let mut out = String::new();
        while let Some(delta) = stream.next().await {
            out.push_str(&delta?);
        }
        Ok(out)
    }
}

#[derive(Debug, Clone)]
pub struct HttpChatGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpChatGateway {
    /// `base_url` is the API root; `/chat/completions` is appended.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>;

struct DeltaState {
    body: ByteStream,
    decoder: SseLineDecoder,
    pending: VecDeque<Result<String, GatewayError>>,
    finished: bool,
}

impl DeltaState {
    fn absorb(&mut self, events: impl IntoIterator<Item = SseEvent>) {
        for event in events {
            match event {
                SseEvent::Done => self.finished = true,
                SseEvent::Data(payload) => match serde_json::from_str::<CompletionChunk>(&payload) {
                    Ok(chunk) => {
                        let text: String = chunk
                            .choices
                            .into_iter()
                            .filter_map(|c| c.delta.content)
                            .collect();
                        if !text.is_empty() {
                            self.pending.push_back(Ok(text));
                        }
                    }
                    Err(e) => self.pending.push_back(Err(GatewayError::Decode(e.to_string()))),
                },
            }
        }
    }
}

fn deltas(body: ByteStream) -> ChatStream {
    let state = DeltaState {
        body,
        decoder: SseLineDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };
    Box::pin(futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.finished {
                return None;
            }
            match st.body.next().await {
                Some(Ok(chunk)) => match st.decoder.push(&chunk) {
                    Ok(events) => st.absorb(events),
                    Err(e) => {
                        st.finished = true;
                        return Some((Err(e), st));
                    }
                },
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(GatewayError::from(e)), st));
                }
                None => {
                    let tail = st.decoder.finish();
                    st.absorb(tail);
                    st.finished = true;
                }
            }
        }
    }))
}

#[async_trait]
impl ChatGateway for HttpChatGateway {
    async fn stream(&self, messages: Vec<ChatMessage>) -> Result<ChatStream, GatewayError> {
        debug!(model = %self.model, messages = messages.len(), "chat completion request");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest { model: &self.model, messages: &messages, stream: true })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        let body = response.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec()));
        Ok(deltas(Box::pin(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn chunked(parts: &[&'static [u8]]) -> ByteStream {
        let items: Vec<Result<Vec<u8>, reqwest::Error>> = parts.iter().map(|p| Ok(p.to_vec())).collect();
        Box::pin(futures::stream::iter(items))
    }

    #[tokio::test]
    async fn deltas_survive_split_chunks() {
        let body = chunked(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\ndata: {\"choi",
            b"ces\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            b"data: [DONE]\n\n",
        ]);
        let got: Vec<_> = deltas(body).collect().await;
        assert_eq!(got, vec![Ok("Hel".to_string()), Ok("lo".to_string())]);
    }

    #[tokio::test]
    async fn role_only_chunks_are_skipped() {
        let body = chunked(&[b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\ndata: [DONE]\n"]);
        let got: Vec<_> = deltas(body).collect().await;
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn streams_from_upstream() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer k")
                    .json_body_partial(r#"{"model":"m","stream":true}"#);
                then.status(200)
                    .header("content-type", "text/event-stream")
                    .body("data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n\n");
            })
            .await;

        let gw = HttpChatGateway::new(&server.url("/v1"), "k", "m").unwrap();
        let reply = gw.complete(vec![ChatMessage::user("hello")]).await.unwrap();

        assert_eq!(reply, "Hi");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn maps_rate_limit_and_credit_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/a/chat/completions");
                then.status(429);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/b/chat/completions");
                then.status(402);
            })
            .await;

        let limited = HttpChatGateway::new(&server.url("/a"), "k", "m").unwrap();
        let broke = HttpChatGateway::new(&server.url("/b"), "k", "m").unwrap();

        assert_eq!(
            limited.stream(vec![ChatMessage::user("x")]).await.err(),
            Some(GatewayError::RateLimited)
        );
        assert_eq!(
            broke.stream(vec![ChatMessage::user("x")]).await.err(),
            Some(GatewayError::PaymentRequired)
        );
    }
}
