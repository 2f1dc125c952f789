//! One-shot commands: generate, history, models, reset.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use colored::*;
use readmesmith_core::stream::drive_while;
use readmesmith_core::{
    ai, extract, AiClient, AnimationDirection, AnimationSpeed, ChatRequest, Config, DesignStyle,
    Extraction, Provider, SessionState, SessionStore, TargetLanguage, Transcript, Variant,
};

// clap value parsers over the inherent `from_str` constructors

pub fn parse_variant(s: &str) -> Result<Variant, String> {
    Variant::from_str(s).ok_or_else(|| {
        format!("unknown variant '{}' (expected profile-readme, code-snippet or animated-svg)", s)
    })
}

pub fn parse_provider(s: &str) -> Result<Provider, String> {
    Provider::from_str(s)
        .ok_or_else(|| format!("unknown provider '{}' (expected gemini, claude, openai or ollama)", s))
}

pub fn parse_style(s: &str) -> Result<DesignStyle, String> {
    DesignStyle::from_str(s).ok_or_else(|| format!("unknown design style '{}'", s))
}

pub fn parse_speed(s: &str) -> Result<AnimationSpeed, String> {
    AnimationSpeed::from_str(s).ok_or_else(|| format!("unknown animation speed '{}'", s))
}

pub fn parse_direction(s: &str) -> Result<AnimationDirection, String> {
    AnimationDirection::from_str(s).ok_or_else(|| format!("unknown animation direction '{}'", s))
}

pub fn parse_language(s: &str) -> Result<TargetLanguage, String> {
    TargetLanguage::from_str(s).ok_or_else(|| format!("unknown language '{}'", s))
}

pub struct GenerateArgs {
    pub description: String,
    pub variant: Variant,
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub style: Option<DesignStyle>,
    pub speed: Option<AnimationSpeed>,
    pub direction: Option<AnimationDirection>,
    pub language: Option<TargetLanguage>,
    pub output: Option<PathBuf>,
    pub raw: bool,
    pub fresh: bool,
    pub snapshot: Option<Option<String>>,
}

/// Write an artifact to disk, ending it with a newline.
pub fn write_artifact(path: &Path, code: &str) -> std::io::Result<()> {
    let mut content = code.to_string();
    if !content.ends_with('\n') {
        content.push('\n');
    }
    std::fs::write(path, content)
}

/// Fold a finished exchange into the session. Returns whether it produced a
/// new version.
pub fn record_generation(session: &mut SessionState, description: &str, extraction: &Extraction) -> bool {
    session.last_prompt = description.to_string();
    session.transcript.push_user(description);
    session.transcript.push_assistant(extraction);
    match &extraction.code {
        Some(code) => session.undo.push(code.clone()),
        None => false,
    }
}

pub async fn generate(args: GenerateArgs) -> Result<()> {
    let config = Config::load()?;
    let store = SessionStore::default_location()?;
    let mut session = store.load(args.variant)?;

    let options = &mut session.options;
    if let Some(style) = args.style {
        options.design_style = style;
    }
    if let Some(speed) = args.speed {
        options.animation_speed = speed;
    }
    if let Some(direction) = args.direction {
        options.animation_direction = direction;
    }
    if let Some(language) = args.language {
        options.target_language = language;
    }

    let provider = args.provider.unwrap_or_else(|| config.provider());
    let model = args.model.unwrap_or_else(|| config.model_for(provider));

    let empty = Transcript::new();
    let (current_code, transcript) = if args.fresh {
        (None, &empty)
    } else {
        (session.current_code(), &session.transcript)
    };
    let request = ChatRequest::for_variant(
        args.variant,
        &session.options,
        &args.description,
        current_code,
        transcript,
    )
    .map_err(|e| anyhow!(e.user_message()))?;

    let client = AiClient::from_config(provider, &config).map_err(|e| anyhow!(e.user_message()))?;

    if !args.raw {
        eprintln!(
            "{} {} with {}\n",
            "Generating".bold().blue(),
            args.variant.display_name().bold(),
            format!("{}:{}", provider.short_name(), model).magenta()
        );
    }

    let stream = client
        .stream(&model, &request)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    let raw = args.raw;
    let mut stdout = std::io::stdout();
    let mut output_closed = false;
    let outcome = drive_while(stream, |delta, _| {
        if raw {
            output_closed = !echo_delta(&mut stdout, delta);
            !output_closed
        } else {
            eprint!("{}", ".".dimmed());
            true
        }
    })
    .await;

    if output_closed {
        // Reader went away (e.g. `| head`), nothing left to show
        tracing::warn!("stdout closed, stopped streaming");
    }

    if !raw {
        eprintln!();
    }

    let (extraction, failure) = match outcome {
        Ok(completion) => (completion.extraction, None),
        Err(e) => {
            tracing::error!(error = %e, "generation failed");
            let partial = e.partial_text().map(extract);
            (partial.unwrap_or_default(), Some(e))
        }
    };

    if !raw {
        print_extraction(&extraction, args.variant, &session);
    }

    if let Some(e) = &failure {
        eprintln!("{}: {}", "Error".red().bold(), e.user_message());
    }

    if extraction.has_code() || !extraction.chat.is_empty() {
        let new_version = record_generation(&mut session, &args.description, &extraction);

        if let Some(code) = extraction.code.as_deref() {
            if let Some(name) = &args.snapshot {
                session.snapshots.record(
                    name.as_deref(),
                    args.variant,
                    &args.description,
                    code,
                    session.options,
                );
            }
            if let Some(path) = &args.output {
                write_artifact(path, code).with_context(|| format!("writing {}", path.display()))?;
                eprintln!("{} {}", "Wrote".green(), path.display().to_string().bold());
            }
            if !raw && new_version {
                eprintln!(
                    "{}",
                    format!("Saved as version {} of {}", session.undo.position() + 1, session.undo.len()).dimmed()
                );
            }
        }
        store.save(&session)?;
    }

    match failure {
        Some(e) => Err(anyhow!(e.user_message())),
        None => Ok(()),
    }
}

/// Echo one raw delta. Returns false once the output can no longer be written.
fn echo_delta(out: &mut impl Write, delta: &str) -> bool {
    out.write_all(delta.as_bytes()).and_then(|_| out.flush()).is_ok()
}

fn print_extraction(extraction: &Extraction, variant: Variant, session: &SessionState) {
    if !extraction.chat.is_empty() {
        println!("{}", extraction.chat.green());
        println!();
    }
    match &extraction.code {
        Some(code) => {
            let name = variant.default_file_name(&session.options);
            println!("{}", format!("── {} ──", name).bold().cyan());
            println!("{}", code);
            println!("{}", "─".repeat(name.chars().count() + 6).cyan());
        }
        None => println!("{}", "The response did not contain a code block.".yellow()),
    }
}

pub fn history(variant: Variant, show: Option<u64>) -> Result<()> {
    let store = SessionStore::default_location()?;
    let session = store.load(variant)?;

    if let Some(id) = show {
        let Some(snapshot) = session.snapshots.get(id) else {
            bail!("no snapshot #{} for {}", id, variant.display_name());
        };
        // Bare artifact so it can be piped
        println!("{}", snapshot.code);
        return Ok(());
    }

    println!("\n{}", format!("{} snapshots", variant.display_name()).bold().blue());
    println!("{}", "=".repeat(30).dimmed());

    if session.snapshots.is_empty() {
        println!("{}", "No snapshots yet. Save one with S in the interactive mode or generate --snapshot.".yellow());
    } else {
        for snapshot in session.snapshots.iter() {
            println!(
                "  {} {}  {} {}",
                format!("#{}", snapshot.id).yellow(),
                snapshot.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                snapshot.name,
                format!("({} lines)", snapshot.code.lines().count()).dimmed()
            );
        }
    }

    if !session.undo.is_empty() {
        println!(
            "\n{} {}/{}",
            "Current version:".dimmed(),
            session.undo.position() + 1,
            session.undo.len()
        );
    }
    Ok(())
}

pub async fn models(provider: Option<Provider>) -> Result<()> {
    let config = Config::load()?;
    let provider = provider.unwrap_or_else(|| config.provider());

    println!("\n{}", format!("{} models", provider.display_name()).bold().blue());
    println!("{}", "=".repeat(30).dimmed());

    match ai::list_models(provider, &config).await {
        Ok(models) if models.is_empty() => {
            println!("{}", "No models found. Pull a model with: ollama pull llama3.2".yellow());
        }
        Ok(models) => {
            let current = config.model_for(provider);
            for model in models {
                if model == current {
                    println!("  • {} {}", model.green().bold(), "(default)".dimmed());
                } else {
                    println!("  • {}", model.green());
                }
            }
        }
        Err(e) => {
            println!("{}: {}", "Error listing models".red(), e.user_message());
            if provider == Provider::Ollama {
                println!("Make sure Ollama is running: {}", "ollama serve".bold());
            }
        }
    }
    Ok(())
}

pub fn reset(variant: Option<Variant>) -> Result<()> {
    let store = SessionStore::default_location()?;
    let variants = match variant {
        Some(v) => vec![v],
        None => Variant::all(),
    };
    for variant in variants {
        store.clear(variant)?;
        println!("{} {}", "Cleared".green(), variant.display_name());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use readmesmith_core::ExtractionMethod;
    use tempfile::TempDir;

    #[test]
    fn test_value_parsers() {
        assert_eq!(parse_variant("svg"), Ok(Variant::AnimatedSvg));
        assert!(parse_variant("poem").unwrap_err().contains("poem"));
        assert_eq!(parse_provider("anthropic"), Ok(Provider::Claude));
        assert_eq!(parse_language("python"), Ok(TargetLanguage::Python));
    }

    #[test]
    fn test_record_generation_pushes_version() {
        let mut session = SessionState::new(Variant::CodeSnippet);
        let extraction = Extraction {
            chat: "Here it is".to_string(),
            code: Some("print('hi')".to_string()),
            method: ExtractionMethod::Tagged,
        };

        assert!(record_generation(&mut session, "say hi", &extraction));
        assert_eq!(session.last_prompt, "say hi");
        assert_eq!(session.transcript.len(), 2);
        assert_eq!(session.current_code(), Some("print('hi')"));

        // Same artifact again is not a new version
        assert!(!record_generation(&mut session, "say hi again", &extraction));
        assert_eq!(session.undo.len(), 1);
        assert_eq!(session.transcript.len(), 4);
    }

    #[test]
    fn test_chat_only_reply_keeps_versions() {
        let mut session = SessionState::new(Variant::ProfileReadme);
        let extraction = Extraction {
            chat: "Could you tell me your name?".to_string(),
            code: None,
            method: ExtractionMethod::ChatOnly,
        };
        assert!(!record_generation(&mut session, "make a readme", &extraction));
        assert!(session.undo.is_empty());
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_echo_delta_reports_closed_output() {
        let mut buf = Vec::new();
        assert!(echo_delta(&mut buf, "# Hi"));
        assert!(echo_delta(&mut buf, " there"));
        assert_eq!(buf, b"# Hi there");

        assert!(!echo_delta(&mut ClosedPipe, "lost"));
    }

    #[tokio::test]
    async fn test_raw_echo_stops_stream_on_closed_output() {
        use futures_util::stream;
        use readmesmith_core::stream::TextStream;

        let deltas: TextStream = Box::pin(stream::iter(vec![
            Ok("one".to_string()),
            Ok("two".to_string()),
            Ok("three".to_string()),
        ]));
        let mut out = ClosedPipe;
        let mut calls = 0;
        let completion = drive_while(deltas, |delta, _| {
            calls += 1;
            echo_delta(&mut out, delta)
        })
        .await
        .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(completion.text, "one");
    }

    #[test]
    fn test_write_artifact_adds_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("animation.svg");
        write_artifact(&path, "<svg/>").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<svg/>\n");
        write_artifact(&path, "<svg></svg>\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<svg></svg>\n");
    }
}
