pub mod claude;
pub mod gemini;
pub mod ollama;
pub mod openai;

pub use claude::ClaudeClient;
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

use eventsource_stream::Eventsource;
use futures_util::StreamExt;

use crate::config::Config;
use crate::error::GenerationError;
use crate::prompt::ChatRequest;
use crate::provider::Provider;
use crate::stream::TextStream;

/// What one decoded wire chunk contributes to the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Text(String),
    Skip,
    Done,
}

#[derive(Clone)]
pub enum AiClient {
    Gemini(GeminiClient),
    Claude(ClaudeClient),
    OpenAI(OpenAIClient),
    Ollama(OllamaClient),
}

impl AiClient {
    /// Build the client for `provider`, failing when it needs a key and none
    /// is available from the environment or the config file.
    pub fn from_config(provider: Provider, config: &Config) -> Result<Self, GenerationError> {
        let key = || config.api_key(provider).ok_or(GenerationError::MissingKey(provider));
        Ok(match provider {
            Provider::Gemini => AiClient::Gemini(GeminiClient::new(&key()?)),
            Provider::Claude => AiClient::Claude(ClaudeClient::new(&key()?)),
            Provider::OpenAI => AiClient::OpenAI(OpenAIClient::new(&key()?)),
            Provider::Ollama => AiClient::Ollama(OllamaClient::new(&config.ollama_url())),
        })
    }

    pub fn provider(&self) -> Provider {
        match self {
            AiClient::Gemini(_) => Provider::Gemini,
            AiClient::Claude(_) => Provider::Claude,
            AiClient::OpenAI(_) => Provider::OpenAI,
            AiClient::Ollama(_) => Provider::Ollama,
        }
    }

    pub async fn stream(&self, model: &str, request: &ChatRequest) -> Result<TextStream, GenerationError> {
        tracing::debug!(provider = self.provider().as_str(), model, "starting stream");
        match self {
            AiClient::Gemini(client) => client.stream(model, request).await,
            AiClient::Claude(client) => client.stream(model, request).await,
            AiClient::OpenAI(client) => client.stream(model, request).await,
            AiClient::Ollama(client) => client.stream(model, request).await,
        }
    }
}

/// Models offered for a provider. Only Ollama is asked; the hosted services
/// use a fixed list.
pub async fn list_models(provider: Provider, config: &Config) -> Result<Vec<String>, GenerationError> {
    match provider {
        Provider::Gemini => Ok(GeminiClient::list_models()),
        Provider::Claude => Ok(ClaudeClient::list_models()),
        Provider::OpenAI => Ok(OpenAIClient::list_models()),
        Provider::Ollama => OllamaClient::new(&config.ollama_url()).list_models().await,
    }
}

/// Turn a non-success response into an error carrying its body.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), "provider returned an error status");
    Err(GenerationError::Http {
        status: status.as_u16(),
        body,
    })
}

/// Decode a server-sent-events body. `parse` receives each event's type and
/// data payload.
pub(crate) fn sse_text_stream<F>(response: reqwest::Response, parse: F) -> TextStream
where
    F: Fn(&str, &str) -> Result<ChunkOutcome, GenerationError> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut events = Box::pin(response.bytes_stream().eventsource());
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    yield Err(GenerationError::Stream(e.to_string()));
                    return;
                }
            };
            match parse(&event.event, &event.data) {
                Ok(ChunkOutcome::Text(text)) => yield Ok(text),
                Ok(ChunkOutcome::Skip) => {}
                Ok(ChunkOutcome::Done) => return,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
    };
    Box::pin(stream)
}

/// Parse a JSON payload, treating garbage as an ignorable chunk.
pub(crate) fn parse_json(data: &str) -> Option<serde_json::Value> {
    match serde_json::from_str(data) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "skipping undecodable chunk");
            None
        }
    }
}
