//! Streaming chat proxy.
//!
//! Upstream deltas are re-framed as `data: {"content": ...}` events and the
//! stream always ends with `data: [DONE]`. A failure after the stream has
//! started is reported as an `error` event.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::Extension,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{stream, Stream, StreamExt};
use serde_json::json;

use crate::app::dto::{self, JsonBody};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::services::AppServices;

/// POST /chat
pub async fn chat(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<dto::ChatRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let deltas = services.chat(body.into_messages()).await?;

    let events = deltas
        .map(|delta| {
            let event = match delta {
                Ok(content) => Event::default().data(json!({ "content": content }).to_string()),
                Err(err) => {
                    let (_, code, message) = ApiError::from(err).category();
                    tracing::warn!(code, "chat stream failed mid-response");
                    Event::default()
                        .event("error")
                        .data(json!({ "error": code, "message": message }).to_string())
                }
            };
            Ok::<_, Infallible>(event)
        })
        .chain(stream::once(async { Ok(Event::default().data("[DONE]")) }));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
