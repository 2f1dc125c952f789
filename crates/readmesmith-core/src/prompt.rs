use crate::error::GenerationError;
use crate::history::{Role, Transcript};
use crate::variant::{GenerationOptions, Variant, CLOSE_TAG, OPEN_TAG};

/// How many earlier turns are replayed to the model.
const HISTORY_TURNS: usize = 6;
/// Per-turn cap when replaying history, in characters.
const HISTORY_TURN_CHARS: usize = 2000;

/// A single request: the persona as system instruction plus the user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
}

impl ChatRequest {
    pub fn for_variant(
        variant: Variant,
        options: &GenerationOptions,
        description: &str,
        current_code: Option<&str>,
        transcript: &Transcript,
    ) -> Result<Self, GenerationError> {
        Ok(Self {
            system: variant.persona(),
            user: build_user_message(variant, options, description, current_code, transcript)?,
        })
    }
}

/// Build the per-request user message. `transcript` holds the turns before
/// this request; `current_code` is the artifact being refined, if any.
pub fn build_user_message(
    variant: Variant,
    options: &GenerationOptions,
    description: &str,
    current_code: Option<&str>,
    transcript: &Transcript,
) -> Result<String, GenerationError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(GenerationError::EmptyPrompt);
    }

    let mut prompt = String::new();

    prompt.push_str(&format!("Task: generate a {}.\n\n", variant.display_name().to_lowercase()));

    let preferences = options.describe(variant);
    if !preferences.is_empty() {
        prompt.push_str("Preferences:\n");
        for (label, value) in preferences {
            prompt.push_str(&format!("- {}: {}\n", label, value));
        }
        prompt.push('\n');
    }

    if let Some(code) = current_code.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("Current version:\n");
        prompt.push_str(OPEN_TAG);
        prompt.push('\n');
        prompt.push_str(code.trim());
        prompt.push('\n');
        prompt.push_str(CLOSE_TAG);
        prompt.push_str("\n\nApply the requested changes to the current version and return the full updated result.\n\n");
    }

    let recent = transcript.recent(HISTORY_TURNS);
    if !recent.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for turn in recent {
            let speaker = match turn.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            let mut text = truncate_chars(turn.text.trim(), HISTORY_TURN_CHARS);
            if let Some(code) = &turn.code {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(&format!("[generated {} lines, omitted]", code.lines().count()));
            }
            prompt.push_str(&format!("{}: {}\n", speaker, text));
        }
        prompt.push('\n');
    }

    prompt.push_str("Request: ");
    prompt.push_str(description);
    prompt.push_str(&format!(
        "\n\nRemember to wrap the complete result in {} and {}.",
        OPEN_TAG, CLOSE_TAG
    ));

    Ok(prompt)
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}…", cut)
    }
}
