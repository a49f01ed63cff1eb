//! `POST /v1/chat/completions`: OpenAI-like request in, OpenAI-compatible
//! response out, SSE-streamed when `stream=true`.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::json;

use node_core::reasoning::{ReasoningMessage, Role};

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    model: Option<String>,
    messages: Vec<ChatMessage>,
    #[serde(default)]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatChoice {
    index: u32,
    message: ChatResponseMessage,
    finish_reason: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatResponseMessage {
    role: &'static str,
    content: String,
}

fn to_reasoning_role(role: &str) -> Role {
    match role {
        "system" => Role::System,
        "assistant" => Role::Assistant,
        "tool" => Role::Tool,
        _ => Role::User,
    }
}

pub async fn completions(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Response {
    let messages: Vec<ReasoningMessage> = req
        .messages
        .iter()
        .map(|m| ReasoningMessage {
            role: to_reasoning_role(&m.role),
            content: m.content.clone(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        })
        .collect();

    let model = req.model.unwrap_or_else(|| state.node_name.clone());

    let outcome = match state
        .reasoning
        .run(state.provider.as_ref(), messages, Vec::new())
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return ApiError::server_error(e.to_string()).into_response(),
    };

    if req.stream {
        return stream_response(model, outcome.final_text).into_response();
    }

    let id = format!("chatcmpl-{}", uuid::Uuid::new_v4());
    Json(json!({
        "id": id,
        "object": "chat.completion",
        "created": chrono::Utc::now().timestamp(),
        "model": model,
        "choices": [ChatChoice {
            index: 0,
            message: ChatResponseMessage { role: "assistant", content: outcome.final_text },
            finish_reason: "stop",
        }],
    }))
    .into_response()
}

/// Incremental chunks are emulated by splitting the completed text on
/// whitespace: the reasoning loop only exposes a final result, not a live
/// per-token stream, so this reproduces the wire shape without a token-level
/// passthrough.
fn stream_response(model: String, text: String) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let id = format!("chatcmpl-{}", uuid::Uuid::new_v4());
    let created = chrono::Utc::now().timestamp();
    let mut words: Vec<String> = text.split_inclusive(' ').map(|w| w.to_string()).collect();
    if words.is_empty() {
        words.push(String::new());
    }

    let chunks: Vec<Event> = words
        .into_iter()
        .map(|piece| {
            Event::default().json_data(json!({
                "id": id,
                "object": "chat.completion.chunk",
                "created": created,
                "model": model,
                "choices": [{"index": 0, "delta": {"content": piece}, "finish_reason": null}],
            }))
            .unwrap()
        })
        .chain(std::iter::once(
            Event::default().json_data(json!({
                "id": id,
                "object": "chat.completion.chunk",
                "created": created,
                "model": model,
                "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}],
            }))
            .unwrap(),
        ))
        .chain(std::iter::once(Event::default().data("[DONE]")))
        .collect();

    Sse::new(stream::iter(chunks.into_iter().map(Ok)))
}
