use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{check_status, parse_json, ChunkOutcome};
use crate::error::GenerationError;
use crate::prompt::ChatRequest;
use crate::stream::TextStream;

#[derive(Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn stream(&self, model: &str, request: &ChatRequest) -> Result<TextStream, GenerationError> {
        let url = format!("{}/api/chat", self.base_url);

        let body = OllamaChatRequest {
            model: model.to_string(),
            messages: vec![
                OllamaMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                OllamaMessage {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            stream: true,
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let response = check_status(response).await?;

        // Newline-delimited JSON; a line may span several network chunks.
        let stream = async_stream::stream! {
            let mut bytes = Box::pin(response.bytes_stream());
            let mut buf: Vec<u8> = Vec::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(GenerationError::Transport(e));
                        return;
                    }
                };
                buf.extend_from_slice(&chunk);
                while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    match parse_ollama_line(line.trim()) {
                        Ok(ChunkOutcome::Text(text)) => yield Ok(text),
                        Ok(ChunkOutcome::Skip) => {}
                        Ok(ChunkOutcome::Done) => return,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
            let rest = String::from_utf8_lossy(&buf).trim().to_string();
            if !rest.is_empty() {
                match parse_ollama_line(&rest) {
                    Ok(ChunkOutcome::Text(text)) => yield Ok(text),
                    Ok(_) => {}
                    Err(e) => yield Err(e),
                }
            }
        };

        Ok(Box::pin(stream))
    }

    pub async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await?;
        let response = check_status(response).await?;

        let models_response: OllamaModelsResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;
        let model_names: Vec<String> = models_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect();

        Ok(model_names)
    }
}

/// Decode one line of an `/api/chat` stream.
pub fn parse_ollama_line(line: &str) -> Result<ChunkOutcome, GenerationError> {
    if line.is_empty() {
        return Ok(ChunkOutcome::Skip);
    }
    let Some(json) = parse_json(line) else {
        return Ok(ChunkOutcome::Skip);
    };

    if let Some(message) = json.get("error").and_then(|e| e.as_str()) {
        return Err(GenerationError::Api(message.to_string()));
    }

    let text = json
        .pointer("/message/content")
        .and_then(|c| c.as_str())
        .unwrap_or_default();

    let done = json.get("done").and_then(|d| d.as_bool()).unwrap_or(false);

    match (text.is_empty(), done) {
        (false, _) => Ok(ChunkOutcome::Text(text.to_string())),
        (true, true) => Ok(ChunkOutcome::Done),
        (true, false) => Ok(ChunkOutcome::Skip),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_line() {
        let line = r#"{"model":"llama3.2","message":{"role":"assistant","content":"hey"},"done":false}"#;
        assert_eq!(parse_ollama_line(line).unwrap(), ChunkOutcome::Text("hey".to_string()));
    }

    #[test]
    fn test_done_line() {
        let line = r#"{"model":"llama3.2","message":{"role":"assistant","content":""},"done":true}"#;
        assert_eq!(parse_ollama_line(line).unwrap(), ChunkOutcome::Done);
    }

    #[test]
    fn test_error_line() {
        let line = r#"{"error":"model 'nope' not found"}"#;
        assert!(matches!(parse_ollama_line(line), Err(GenerationError::Api(m)) if m.contains("not found")));
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(parse_ollama_line("").unwrap(), ChunkOutcome::Skip);
    }
}
