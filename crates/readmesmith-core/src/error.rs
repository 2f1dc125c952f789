use thiserror::Error;

use crate::provider::Provider;

/// Everything that can go wrong between submitting a description and
/// receiving an extracted artifact. None of these are fatal to the app;
/// they are surfaced inline via [`GenerationError::user_message`].
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("description is empty")]
    EmptyPrompt,

    #[error("no API key configured for {}", .0.display_name())]
    MissingKey(Provider),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("provider error: {0}")]
    Api(String),

    #[error("response blocked by content safety filter: {0}")]
    Blocked(String),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("stream interrupted after {} characters: {source}", .partial.chars().count())]
    Interrupted {
        partial: String,
        source: Box<GenerationError>,
    },
}

impl GenerationError {
    /// Short, human-readable text shown next to the conversation.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::EmptyPrompt => "Describe what you want to generate first.".to_string(),
            GenerationError::MissingKey(provider) => format!(
                "{} API key not configured. Set {} or press 'P' to add one.",
                provider.display_name(),
                provider.key_env_var().unwrap_or("a key"),
            ),
            GenerationError::Transport(e) if e.is_connect() => {
                "Could not reach the model service. Check your network connection.".to_string()
            }
            GenerationError::Transport(e) if e.is_timeout() => {
                "The model service timed out. Try again.".to_string()
            }
            GenerationError::Transport(e) => format!("Network error: {}", e),
            GenerationError::Http { status, body } => match *status {
                401 | 403 => "The API key was rejected. Check your credentials.".to_string(),
                429 => "Rate limited by the model service. Wait a moment and retry.".to_string(),
                _ => format!("Model service returned HTTP {}: {}", status, truncate(body, 200)),
            },
            GenerationError::Api(message) => format!("Model service error: {}", message),
            GenerationError::Blocked(reason) => format!(
                "The response was blocked by the safety filter ({}). Try rephrasing.",
                reason
            ),
            GenerationError::Decode(message) => format!("Unexpected response format: {}", message),
            GenerationError::Stream(message) => format!("Streaming failed: {}", message),
            GenerationError::Interrupted { source, .. } => {
                format!("Response cut short. {}", source.user_message())
            }
        }
    }

    /// Partial response text carried by an interrupted stream.
    pub fn partial_text(&self) -> Option<&str> {
        match self {
            GenerationError::Interrupted { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_names_env_var() {
        let msg = GenerationError::MissingKey(Provider::Gemini).user_message();
        assert!(msg.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_http_auth_message() {
        let err = GenerationError::Http {
            status: 401,
            body: "nope".to_string(),
        };
        assert!(err.user_message().contains("rejected"));
    }

    #[test]
    fn test_interrupted_keeps_partial() {
        let err = GenerationError::Interrupted {
            partial: "half a readme".to_string(),
            source: Box::new(GenerationError::Stream("reset".to_string())),
        };
        assert_eq!(err.partial_text(), Some("half a readme"));
        assert!(err.user_message().starts_with("Response cut short."));
    }

    #[test]
    fn test_long_body_is_truncated() {
        let err = GenerationError::Http {
            status: 500,
            body: "x".repeat(500),
        };
        assert!(err.user_message().ends_with("..."));
    }
}
