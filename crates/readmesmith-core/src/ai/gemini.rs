use reqwest::Client;
use serde::Serialize;

use super::{check_status, parse_json, sse_text_stream, ChunkOutcome};
use crate::error::GenerationError;
use crate::prompt::ChatRequest;
use crate::stream::TextStream;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Finish reasons that mean the candidate was withheld for policy reasons.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "RECITATION",
];

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
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
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, model
        );

        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: request.system.clone(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: request.user.clone(),
                }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(sse_text_stream(response, |_, data| parse_gemini_event(data)))
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gemini-2.0-flash".to_string(),
            "gemini-2.0-flash-lite".to_string(),
            "gemini-1.5-pro".to_string(),
            "gemini-1.5-flash".to_string(),
        ]
    }
}

/// Decode one `streamGenerateContent` SSE payload.
pub fn parse_gemini_event(data: &str) -> Result<ChunkOutcome, GenerationError> {
    let Some(json) = parse_json(data) else {
        return Ok(ChunkOutcome::Skip);
    };

    if let Some(message) = json.pointer("/error/message").and_then(|m| m.as_str()) {
        return Err(GenerationError::Api(message.to_string()));
    }

    if let Some(reason) = json.pointer("/promptFeedback/blockReason").and_then(|r| r.as_str()) {
        return Err(GenerationError::Blocked(reason.to_string()));
    }

    let Some(candidate) = json.pointer("/candidates/0") else {
        return Ok(ChunkOutcome::Skip);
    };

    if let Some(reason) = candidate.get("finishReason").and_then(|r| r.as_str()) {
        if BLOCKING_FINISH_REASONS.contains(&reason) {
            return Err(GenerationError::Blocked(reason.to_string()));
        }
    }

    let text: String = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        Ok(ChunkOutcome::Skip)
    } else {
        Ok(ChunkOutcome::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_parts_joined() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"Hel"},{"text":"lo"}],"role":"model"}}]}"#;
        assert_eq!(parse_gemini_event(data).unwrap(), ChunkOutcome::Text("Hello".to_string()));
    }

    #[test]
    fn test_prompt_blocked() {
        let data = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(matches!(parse_gemini_event(data), Err(GenerationError::Blocked(r)) if r == "SAFETY"));
    }

    #[test]
    fn test_candidate_blocked() {
        let data = r#"{"candidates":[{"finishReason":"PROHIBITED_CONTENT"}]}"#;
        assert!(matches!(parse_gemini_event(data), Err(GenerationError::Blocked(_))));
    }

    #[test]
    fn test_normal_stop_with_text() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"end"}]},"finishReason":"STOP"}]}"#;
        assert_eq!(parse_gemini_event(data).unwrap(), ChunkOutcome::Text("end".to_string()));
    }

    #[test]
    fn test_error_payload() {
        let data = r#"{"error":{"code":400,"message":"API key not valid"}}"#;
        assert!(matches!(parse_gemini_event(data), Err(GenerationError::Api(m)) if m.contains("API key")));
    }

    #[test]
    fn test_garbage_skipped() {
        assert_eq!(parse_gemini_event("not json").unwrap(), ChunkOutcome::Skip);
        assert_eq!(parse_gemini_event(r#"{"usageMetadata":{}}"#).unwrap(), ChunkOutcome::Skip);
    }
}
