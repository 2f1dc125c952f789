use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use readmesmith_core::{AnimationDirection, AnimationSpeed, DesignStyle, Provider, TargetLanguage, Variant};

mod app;
mod cli;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use cli::{parse_direction, parse_language, parse_provider, parse_speed, parse_style, parse_variant};
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "readmesmith")]
#[command(version, about = "Generate GitHub profile READMEs, code snippets and animated SVG banners with an LLM")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Generator to open: profile-readme, code-snippet or animated-svg
    #[arg(short, long, value_parser = parse_variant, default_value = "profile-readme")]
    variant: Variant,

    /// Model provider: gemini, claude, openai or ollama
    #[arg(short, long, value_parser = parse_provider)]
    provider: Option<Provider>,

    /// Model name (defaults to the configured or provider default)
    #[arg(short, long)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate (or refine) an artifact without the interactive UI
    Generate {
        /// What to generate, or how to change the current version
        description: String,
        #[arg(short, long, value_parser = parse_variant, default_value = "profile-readme")]
        variant: Variant,
        #[arg(short, long, value_parser = parse_provider)]
        provider: Option<Provider>,
        #[arg(short, long)]
        model: Option<String>,
        /// Design style: minimal, professional, creative, playful, terminal
        #[arg(long, value_parser = parse_style)]
        style: Option<DesignStyle>,
        /// Animation speed: slow, normal, fast
        #[arg(long, value_parser = parse_speed)]
        speed: Option<AnimationSpeed>,
        /// Animation direction: left-to-right, right-to-left, top-to-bottom, bottom-to-top
        #[arg(long, value_parser = parse_direction)]
        direction: Option<AnimationDirection>,
        /// Snippet language
        #[arg(long, value_parser = parse_language)]
        language: Option<TargetLanguage>,
        /// Write the extracted artifact to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the raw model output as it streams
        #[arg(long)]
        raw: bool,
        /// Ignore the saved conversation and current version
        #[arg(long)]
        fresh: bool,
        /// Also save the result as a snapshot, optionally named
        #[arg(long, num_args = 0..=1)]
        snapshot: Option<Option<String>>,
    },
    /// List saved snapshots, or print one
    History {
        #[arg(short, long, value_parser = parse_variant, default_value = "profile-readme")]
        variant: Variant,
        /// Print the snapshot with this id
        #[arg(long)]
        show: Option<u64>,
    },
    /// List available models
    Models {
        #[arg(short, long, value_parser = parse_provider)]
        provider: Option<Provider>,
    },
    /// Clear a generator's saved session (all generators when omitted)
    Reset {
        #[arg(short, long, value_parser = parse_variant)]
        variant: Option<Variant>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return run_interactive(cli.variant, cli.provider, cli.model).await;
    };

    logging::init_stderr_logging();

    match command {
        Commands::Generate {
            description,
            variant,
            provider,
            model,
            style,
            speed,
            direction,
            language,
            output,
            raw,
            fresh,
            snapshot,
        } => {
            cli::generate(cli::GenerateArgs {
                description,
                variant,
                provider,
                model,
                style,
                speed,
                direction,
                language,
                output,
                raw,
                fresh,
                snapshot,
            })
            .await?
        }
        Commands::History { variant, show } => cli::history(variant, show)?,
        Commands::Models { provider } => cli::models(provider).await?,
        Commands::Reset { variant } => cli::reset(variant)?,
    }

    Ok(())
}

async fn run_interactive(variant: Variant, provider: Option<Provider>, model: Option<String>) -> Result<()> {
    let _guard = logging::init_file_logging()?;
    let mut app = App::new(variant, provider, model)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    // Save before surfacing a terminal error so the session survives it
    let restored = tui::restore();
    app.shutdown();
    tracing::info!("exiting");
    restored?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    let tx = events.sender();
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event, &tx).await?;
    }
    Ok(())
}
