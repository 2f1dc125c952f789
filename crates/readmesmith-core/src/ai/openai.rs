use reqwest::Client;
use serde::Serialize;

use super::{check_status, parse_json, sse_text_stream, ChunkOutcome};
use crate::error::GenerationError;
use crate::prompt::ChatRequest;
use crate::stream::TextStream;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    stream: bool,
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
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
        let body = OpenAIRequest {
            model: model.to_string(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            stream: true,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(sse_text_stream(response, |_, data| parse_openai_event(data)))
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gpt-4o".to_string(),
            "gpt-4o-mini".to_string(),
            "gpt-4-turbo".to_string(),
            "gpt-3.5-turbo".to_string(),
        ]
    }
}

/// Decode one chat-completions stream payload.
pub fn parse_openai_event(data: &str) -> Result<ChunkOutcome, GenerationError> {
    // OpenAI Chat streaming sends a literal "[DONE]" when finished.
    if data.trim() == "[DONE]" {
        return Ok(ChunkOutcome::Done);
    }

    let Some(json) = parse_json(data) else {
        return Ok(ChunkOutcome::Skip);
    };

    if let Some(message) = json.pointer("/error/message").and_then(|m| m.as_str()) {
        return Err(GenerationError::Api(message.to_string()));
    }

    let choice = json.pointer("/choices/0");

    if choice
        .and_then(|c| c.get("finish_reason"))
        .and_then(|r| r.as_str())
        == Some("content_filter")
    {
        return Err(GenerationError::Blocked("content_filter".to_string()));
    }

    Ok(choice
        .and_then(|c| c.pointer("/delta/content"))
        .and_then(|c| c.as_str())
        .filter(|c| !c.is_empty())
        .map(|c| ChunkOutcome::Text(c.to_string()))
        .unwrap_or(ChunkOutcome::Skip))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_delta() {
        let data = r#"{"choices":[{"index":0,"delta":{"content":"abc"},"finish_reason":null}]}"#;
        assert_eq!(parse_openai_event(data).unwrap(), ChunkOutcome::Text("abc".to_string()));
    }

    #[test]
    fn test_done_marker() {
        assert_eq!(parse_openai_event(" [DONE] ").unwrap(), ChunkOutcome::Done);
    }

    #[test]
    fn test_role_only_delta_skipped() {
        let data = r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_openai_event(data).unwrap(), ChunkOutcome::Skip);
    }

    #[test]
    fn test_content_filter() {
        let data = r#"{"choices":[{"index":0,"delta":{},"finish_reason":"content_filter"}]}"#;
        assert!(matches!(parse_openai_event(data), Err(GenerationError::Blocked(_))));
    }
}
