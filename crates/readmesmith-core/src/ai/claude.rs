use reqwest::Client;
use serde::Serialize;

use super::{check_status, parse_json, sse_text_stream, ChunkOutcome};
use crate::error::GenerationError;
use crate::prompt::ChatRequest;
use crate::stream::TextStream;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

#[derive(Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ClaudeMessage>,
    stream: bool,
}

#[derive(Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn stream(&self, model: &str, request: &ChatRequest) -> Result<TextStream, GenerationError> {
        let body = ClaudeRequest {
            model: model.to_string(),
            max_tokens: 8192,
            system: request.system.clone(),
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: request.user.clone(),
            }],
            stream: true,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(sse_text_stream(response, |_, data| parse_claude_event(data)))
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "claude-sonnet-4-20250514".to_string(),
            "claude-3-5-sonnet-20241022".to_string(),
            "claude-3-5-haiku-20241022".to_string(),
            "claude-3-opus-20240229".to_string(),
        ]
    }
}

/// Decode one Messages API stream event. The payload's own `type` field is
/// used rather than the SSE event name.
pub fn parse_claude_event(data: &str) -> Result<ChunkOutcome, GenerationError> {
    let Some(json) = parse_json(data) else {
        return Ok(ChunkOutcome::Skip);
    };

    match json.get("type").and_then(|t| t.as_str()) {
        Some("content_block_delta") => Ok(json
            .pointer("/delta/text")
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .map(|t| ChunkOutcome::Text(t.to_string()))
            .unwrap_or(ChunkOutcome::Skip)),
        Some("message_delta") => {
            match json.pointer("/delta/stop_reason").and_then(|r| r.as_str()) {
                Some("refusal") => Err(GenerationError::Blocked("refusal".to_string())),
                _ => Ok(ChunkOutcome::Skip),
            }
        }
        Some("message_stop") => Ok(ChunkOutcome::Done),
        Some("error") => Err(GenerationError::Api(
            json.pointer("/error/message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string(),
        )),
        _ => Ok(ChunkOutcome::Skip),
    }
}
