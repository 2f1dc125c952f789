pub mod ai;
pub mod config;
pub mod error;
pub mod extract;
pub mod history;
pub mod prompt;
pub mod provider;
pub mod session;
pub mod stream;
pub mod variant;

// Re-export main types for convenience
pub use ai::{AiClient, ClaudeClient, GeminiClient, OllamaClient, OpenAIClient};
pub use config::Config;
pub use error::GenerationError;
pub use extract::{extract, extract_streaming, Extraction, ExtractionMethod};
pub use history::{Role, Snapshot, SnapshotLog, Transcript, Turn, UndoStack};
pub use prompt::ChatRequest;
pub use provider::Provider;
pub use session::{SessionState, SessionStore};
pub use stream::{Completion, ResponseAccumulator, StreamEvent, TextStream};
pub use variant::{
    AnimationDirection, AnimationSpeed, DesignStyle, GenerationOptions, TargetLanguage, Variant,
};
