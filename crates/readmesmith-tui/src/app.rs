use std::path::PathBuf;

use futures_util::StreamExt;
use ratatui::widgets::ListState;
use readmesmith_core::variant::OptionKind;
use readmesmith_core::{
    ai, AiClient, ChatRequest, Config, Provider, ResponseAccumulator, SessionState, SessionStore,
    StreamEvent, Variant,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::cli::write_artifact;
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub variant: Variant,
    pub session: SessionState,
    pub store: SessionStore,
    pub config: Config,
    pub status: Option<Status>,

    // Description input
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // In-flight generation
    pub streaming: Option<ResponseAccumulator>,
    pub generation_task: Option<tokio::task::JoinHandle<()>>,

    // Scrolling (updated during render)
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub preview_scroll: u16,
    pub preview_height: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Snapshot browser
    pub show_snapshots: bool,
    pub snapshot_state: ListState,

    // Model picker state
    pub show_model_picker: bool,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,

    // Provider state
    pub current_provider: Provider,
    pub selected_model: String,
    pub show_provider_picker: bool,
    pub provider_picker_state: ListState,

    // API key input state
    pub show_api_key_input: bool,
    pub api_key_input: String,
    pub api_key_input_cursor: usize,
    pub api_key_target_provider: Option<Provider>,

    /// Directory the apply action writes into.
    pub output_dir: PathBuf,
}

impl App {
    pub fn new(variant: Variant, provider: Option<Provider>, model: Option<String>) -> anyhow::Result<Self> {
        let config = Config::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read config, using defaults");
            Config::new()
        });
        let store = SessionStore::default_location()?;
        let output_dir = std::env::current_dir()?;
        let mut app = Self::with_parts(config, store, variant, output_dir)?;

        if let Some(provider) = provider {
            app.current_provider = provider;
            app.selected_model = app.config.model_for(provider);
        }
        if let Some(model) = model {
            app.selected_model = model;
        }
        Ok(app)
    }

    pub fn with_parts(
        config: Config,
        store: SessionStore,
        variant: Variant,
        output_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        let session = store.load(variant)?;
        let current_provider = config.provider();
        let selected_model = config.model_for(current_provider);

        Ok(Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            variant,
            input: session.last_prompt.clone(),
            cursor: session.last_prompt.chars().count(),
            session,
            store,
            config,
            status: None,

            streaming: None,
            generation_task: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            preview_scroll: 0,
            preview_height: 0,

            animation_frame: 0,

            show_snapshots: false,
            snapshot_state: ListState::default(),

            show_model_picker: false,
            available_models: Vec::new(),
            model_picker_state: ListState::default(),

            current_provider,
            selected_model,
            show_provider_picker: false,
            provider_picker_state: ListState::default(),

            show_api_key_input: false,
            api_key_input: String::new(),
            api_key_input_cursor: 0,
            api_key_target_provider: None,

            output_dir,
        })
    }

    pub fn is_generating(&self) -> bool {
        self.streaming.is_some()
    }

    pub fn set_info(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            kind: StatusKind::Info,
            text: text.into(),
        });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            kind: StatusKind::Error,
            text: text.into(),
        });
    }

    /// Code shown in the preview: the live stream while generating, otherwise
    /// the current undo position.
    pub fn preview_code(&self) -> Option<&str> {
        if let Some(acc) = &self.streaming {
            if let Some(code) = acc.latest().code.as_deref() {
                return Some(code);
            }
        }
        self.session.current_code()
    }

    /// Submit the description in the input box.
    pub fn start_generation(&mut self, tx: UnboundedSender<AppEvent>) {
        if self.is_generating() {
            return;
        }
        let description = self.input.trim().to_string();
        if description.is_empty() {
            self.set_error("Describe what you want to generate first.");
            return;
        }

        let request = match ChatRequest::for_variant(
            self.variant,
            &self.session.options,
            &description,
            self.session.current_code(),
            &self.session.transcript,
        ) {
            Ok(request) => request,
            Err(e) => {
                self.set_error(e.user_message());
                return;
            }
        };

        let client = match AiClient::from_config(self.current_provider, &self.config) {
            Ok(client) => client,
            Err(e) => {
                self.set_error(e.user_message());
                return;
            }
        };

        self.session.transcript.push_user(&description);
        self.session.last_prompt = description;
        self.input.clear();
        self.cursor = 0;
        self.input_mode = InputMode::Normal;
        self.streaming = Some(ResponseAccumulator::new());
        self.set_info(format!("Generating with {}...", self.selected_model));
        self.scroll_chat_to_bottom();

        let model = self.selected_model.clone();
        tracing::info!(variant = self.variant.as_str(), provider = self.current_provider.as_str(), %model, "generation started");

        self.generation_task = Some(tokio::spawn(async move {
            let send = |event: StreamEvent| tx.send(AppEvent::Generation(event)).is_ok();
            let mut stream = match client.stream(&model, &request).await {
                Ok(stream) => stream,
                Err(e) => {
                    send(StreamEvent::Error(e));
                    return;
                }
            };
            while let Some(item) = stream.next().await {
                let delivered = match item {
                    Ok(delta) => send(StreamEvent::Delta(delta)),
                    Err(e) => {
                        send(StreamEvent::Error(e));
                        return;
                    }
                };
                if !delivered {
                    return;
                }
            }
            send(StreamEvent::Done);
        }));
    }

    pub fn on_generation_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Delta(delta) => {
                if let Some(acc) = self.streaming.as_mut() {
                    acc.push(&delta);
                }
                self.scroll_chat_to_bottom();
            }
            StreamEvent::Done => {
                if let Some(acc) = self.streaming.take() {
                    self.finish_generation(acc);
                }
                self.generation_task = None;
            }
            StreamEvent::Error(e) => {
                tracing::error!(error = %e, "generation failed");
                if let Some(acc) = self.streaming.take() {
                    if !acc.is_empty() {
                        self.finish_generation(acc);
                    }
                }
                let message = e.user_message();
                self.session.transcript.push_error(&message);
                self.set_error(message);
                self.generation_task = None;
                self.scroll_chat_to_bottom();
                self.persist();
            }
        }
    }

    fn finish_generation(&mut self, acc: ResponseAccumulator) {
        let completion = acc.finish();
        let extraction = completion.extraction;
        self.session.transcript.push_assistant(&extraction);

        match &extraction.code {
            Some(code) => {
                let lines = code.lines().count();
                if self.session.undo.push(code.clone()) {
                    self.preview_scroll = 0;
                }
                self.set_info(format!("Generated {} lines", lines));
            }
            None => self.set_info("No code block in the response"),
        }
        self.scroll_chat_to_bottom();
        self.persist();
    }

    /// Save the session; failures are reported but never fatal.
    pub fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.session) {
            tracing::warn!(error = %e, "could not save session");
            self.set_error(format!("Could not save session: {}", e));
        }
    }

    pub fn undo(&mut self) {
        if self.is_generating() {
            return;
        }
        if self.session.undo.undo().is_some() {
            self.preview_scroll = 0;
            self.set_info(self.history_position_label());
            self.persist();
        } else {
            self.set_info("Nothing to undo");
        }
    }

    pub fn redo(&mut self) {
        if self.is_generating() {
            return;
        }
        if self.session.undo.redo().is_some() {
            self.preview_scroll = 0;
            self.set_info(self.history_position_label());
            self.persist();
        } else {
            self.set_info("Nothing to redo");
        }
    }

    pub fn history_position_label(&self) -> String {
        if self.session.undo.is_empty() {
            "no versions".to_string()
        } else {
            format!(
                "version {}/{}",
                self.session.undo.position() + 1,
                self.session.undo.len()
            )
        }
    }

    /// Switch to the next variant, saving this one and loading the other's session.
    pub fn cycle_variant(&mut self) {
        if self.is_generating() {
            return;
        }
        self.session.last_prompt = self.input.clone();
        self.persist();

        let next = self.variant.next();
        match self.store.load(next) {
            Ok(session) => {
                self.variant = next;
                self.input = session.last_prompt.clone();
                self.cursor = self.input.chars().count();
                self.session = session;
                self.chat_scroll = 0;
                self.preview_scroll = 0;
                self.show_snapshots = false;
                self.set_info(format!("Switched to {}", next.display_name()));
            }
            Err(e) => self.set_error(format!("Could not load {} session: {}", next.display_name(), e)),
        }
    }

    pub fn has_control(&self, kind: OptionKind) -> bool {
        self.variant.controls().contains(&kind)
    }

    pub fn cycle_style(&mut self) {
        let options = &mut self.session.options;
        options.design_style = options.design_style.next();
        let label = options.design_style.label();
        self.set_info(format!("Style: {}", label));
        self.persist();
    }

    pub fn cycle_speed(&mut self) {
        let options = &mut self.session.options;
        options.animation_speed = options.animation_speed.next();
        let label = options.animation_speed.label();
        self.set_info(format!("Speed: {}", label));
        self.persist();
    }

    pub fn cycle_direction(&mut self) {
        let options = &mut self.session.options;
        options.animation_direction = options.animation_direction.next();
        let label = options.animation_direction.label();
        self.set_info(format!("Direction: {}", label));
        self.persist();
    }

    pub fn cycle_language(&mut self) {
        let options = &mut self.session.options;
        options.target_language = options.target_language.next();
        let label = options.target_language.label();
        self.set_info(format!("Language: {}", label));
        self.persist();
    }

    /// Write the current artifact to the variant's default file.
    pub fn apply_to_file(&mut self) {
        let Some(code) = self.session.current_code().map(str::to_string) else {
            self.set_error("Nothing to apply yet");
            return;
        };
        let file_name = self.variant.default_file_name(&self.session.options);
        let path = self.output_dir.join(&file_name);
        match write_artifact(&path, &code) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "applied artifact");
                self.set_info(format!("Wrote {}", path.display()));
            }
            Err(e) => self.set_error(format!("Could not write {}: {}", file_name, e)),
        }
    }

    pub fn save_snapshot(&mut self) {
        let Some(code) = self.session.current_code().map(str::to_string) else {
            self.set_error("Nothing to snapshot yet");
            return;
        };
        let id = self.session.snapshots.record(
            None,
            self.variant,
            &self.session.last_prompt,
            &code,
            self.session.options,
        );
        let name = self
            .session
            .snapshots
            .get(id)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        self.set_info(format!("Saved snapshot \"{}\"", name));
        self.persist();
    }

    pub fn toggle_snapshots(&mut self) {
        self.show_snapshots = !self.show_snapshots;
        if self.show_snapshots {
            let select = if self.session.snapshots.is_empty() { None } else { Some(0) };
            self.snapshot_state.select(select);
        }
    }

    pub fn snapshot_nav_down(&mut self) {
        let len = self.session.snapshots.len();
        if len > 0 {
            let i = self.snapshot_state.selected().unwrap_or(0);
            self.snapshot_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn snapshot_nav_up(&mut self) {
        let i = self.snapshot_state.selected().unwrap_or(0);
        self.snapshot_state.select(Some(i.saturating_sub(1)));
    }

    /// Bring the selected snapshot back as the newest version.
    pub fn restore_selected_snapshot(&mut self) {
        let Some(idx) = self.snapshot_state.selected() else {
            return;
        };
        let Some(snapshot) = self.session.snapshots.nth_recent(idx).cloned() else {
            return;
        };
        self.session.undo.push(snapshot.code);
        self.session.options = snapshot.options;
        self.preview_scroll = 0;
        self.show_snapshots = false;
        self.set_info(format!("Restored \"{}\"", snapshot.name));
        self.persist();
    }

    pub fn delete_selected_snapshot(&mut self) {
        let Some(idx) = self.snapshot_state.selected() else {
            return;
        };
        let Some(id) = self.session.snapshots.nth_recent(idx).map(|s| s.id) else {
            return;
        };
        self.session.snapshots.remove(id);
        let len = self.session.snapshots.len();
        if len == 0 {
            self.snapshot_state.select(None);
        } else if idx >= len {
            self.snapshot_state.select(Some(len - 1));
        }
        self.persist();
    }

    pub fn clear_conversation(&mut self) {
        if self.is_generating() {
            return;
        }
        self.session.transcript.clear();
        self.chat_scroll = 0;
        self.set_info("Conversation cleared");
        self.persist();
    }

    /// Stop any in-flight generation and save the session before exit.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.generation_task.take() {
            task.abort();
        }
        if self.streaming.take().is_some() {
            // The reply never arrived, so the request must not be replayed as context
            if let Some(prompt) = self.session.transcript.pop_unanswered() {
                tracing::info!(chars = prompt.len(), "generation aborted on exit");
            }
        }
        if !self.input.trim().is_empty() {
            self.session.last_prompt = self.input.clone();
        }
        self.persist();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_generating() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Scrolling
    pub fn preview_scroll_down(&mut self) {
        let total = self.preview_code().map(|c| c.lines().count()).unwrap_or(0) as u16;
        if self.preview_scroll < total.saturating_sub(self.preview_height) {
            self.preview_scroll = self.preview_scroll.saturating_add(1);
        }
    }

    pub fn preview_scroll_up(&mut self) {
        self.preview_scroll = self.preview_scroll.saturating_sub(1);
    }

    pub fn chat_scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn chat_scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    /// Scroll chat so the newest message (or the live stream) is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let count_lines = |text: &str| -> u16 {
            let mut total = 0u16;
            for line in text.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                total = total.saturating_add(((char_count / wrap_width) + 1) as u16);
            }
            total
        };

        let mut total_lines: u16 = 0;
        for turn in self.session.transcript.turns() {
            total_lines = total_lines.saturating_add(1); // role line
            total_lines = total_lines.saturating_add(count_lines(&turn.text));
            if turn.code.is_some() {
                total_lines = total_lines.saturating_add(1); // artifact marker
            }
            total_lines = total_lines.saturating_add(1); // blank line after message
        }

        if let Some(acc) = &self.streaming {
            total_lines = total_lines.saturating_add(2 + count_lines(&acc.latest().chat));
        }

        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    // Model picker methods
    pub fn model_picker_nav_down(&mut self) {
        let len = self.available_models.len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub async fn open_model_picker(&mut self) {
        match ai::list_models(self.current_provider, &self.config).await {
            Ok(models) if !models.is_empty() => {
                let selected = models.iter().position(|m| *m == self.selected_model).unwrap_or(0);
                self.available_models = models;
                self.model_picker_state.select(Some(selected));
                self.show_model_picker = true;
            }
            Ok(_) => self.set_error("No models available. Pull one with: ollama pull llama3.2"),
            Err(e) => self.set_error(e.user_message()),
        }
    }

    pub fn select_model(&mut self) {
        if let Some(i) = self.model_picker_state.selected() {
            if let Some(model) = self.available_models.get(i) {
                self.selected_model = model.clone();
                self.show_model_picker = false;
                self.config.default_model = Some(self.selected_model.clone());
                if let Err(e) = Config::save_default_model(&self.selected_model) {
                    tracing::warn!(error = %e, "could not save default model");
                }
                self.set_info(format!("Model: {}", self.selected_model));
            }
        }
    }

    // Provider picker methods
    pub fn open_provider_picker(&mut self) {
        let idx = Provider::all()
            .iter()
            .position(|p| *p == self.current_provider)
            .unwrap_or(0);
        self.provider_picker_state.select(Some(idx));
        self.show_provider_picker = true;
    }

    pub fn provider_picker_nav_down(&mut self) {
        let len = Provider::all().len();
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn provider_picker_nav_up(&mut self) {
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some(i.saturating_sub(1)));
    }

    /// Switch to the highlighted provider, or ask for its key first.
    pub fn select_provider(&mut self) {
        let Some(provider) = self
            .provider_picker_state
            .selected()
            .and_then(|i| Provider::all().get(i).copied())
        else {
            return;
        };
        self.show_provider_picker = false;

        if self.config.key_source(provider).is_none() {
            self.api_key_target_provider = Some(provider);
            self.api_key_input.clear();
            self.api_key_input_cursor = 0;
            self.show_api_key_input = true;
            return;
        }
        self.switch_provider(provider);
    }

    fn switch_provider(&mut self, provider: Provider) {
        self.current_provider = provider;
        self.selected_model = provider.default_model().to_string();
        self.config.provider = Some(provider.as_str().to_string());
        self.config.default_model = None;
        if let Err(e) = Config::save_provider(provider) {
            tracing::warn!(error = %e, "could not save provider");
        }
        self.set_info(format!("Provider: {}", provider.display_name()));
    }

    pub fn submit_api_key(&mut self) {
        let Some(provider) = self.api_key_target_provider.take() else {
            self.show_api_key_input = false;
            return;
        };
        let key = self.api_key_input.trim().to_string();
        self.show_api_key_input = false;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
        if key.is_empty() {
            return;
        }

        self.config.set_api_key(provider, &key);
        if let Err(e) = Config::save_api_key(provider, &key) {
            tracing::warn!(error = %e, "could not save API key");
            self.set_error(format!("Key kept for this run only: {}", e));
        }
        self.switch_provider(provider);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readmesmith_core::GenerationError;
    use tempfile::TempDir;

    fn test_app(dir: &TempDir) -> App {
        let config = Config {
            provider: Some("ollama".to_string()),
            ..Config::new()
        };
        let store = SessionStore::new(dir.path().join("sessions"));
        App::with_parts(config, store, Variant::ProfileReadme, dir.path().to_path_buf()).unwrap()
    }

    fn stream_text(app: &mut App, text: &str) {
        app.streaming = Some(ResponseAccumulator::new());
        for chunk in text.as_bytes().chunks(7) {
            app.on_generation_event(StreamEvent::Delta(String::from_utf8_lossy(chunk).to_string()));
        }
        app.on_generation_event(StreamEvent::Done);
    }

    #[test]
    fn test_stream_done_pushes_version_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        stream_text(&mut app, "Sure!\n<markdown_code>\n# Hello\n</markdown_code>");

        assert!(!app.is_generating());
        assert_eq!(app.session.current_code(), Some("# Hello"));
        assert_eq!(app.session.transcript.turns().last().unwrap().text, "Sure!");

        let reloaded = app.store.load(Variant::ProfileReadme).unwrap();
        assert_eq!(reloaded.current_code(), Some("# Hello"));
    }

    #[test]
    fn test_shutdown_mid_stream_drops_unanswered_turn() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        stream_text(&mut app, "<markdown_code># v1</markdown_code>");
        app.session.transcript.push_user("make it louder");
        app.session.last_prompt = "make it louder".to_string();
        app.streaming = Some(ResponseAccumulator::new());
        app.on_generation_event(StreamEvent::Delta("Sure, <markdown_code># V".to_string()));

        app.shutdown();

        assert!(!app.is_generating());
        let reloaded = app.store.load(Variant::ProfileReadme).unwrap();
        assert_eq!(reloaded.transcript.len(), 1);
        assert_eq!(reloaded.transcript.turns()[0].code.as_deref(), Some("# v1"));
        assert_eq!(reloaded.last_prompt, "make it louder");
        assert_eq!(reloaded.current_code(), Some("# v1"));
    }

    #[test]
    fn test_shutdown_keeps_typed_prompt() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.input = "a cat in a terminal".to_string();

        app.shutdown();

        let reloaded = app.store.load(Variant::ProfileReadme).unwrap();
        assert_eq!(reloaded.last_prompt, "a cat in a terminal");
        assert!(reloaded.transcript.is_empty());
    }

    #[test]
    fn test_undo_redo_through_app() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        stream_text(&mut app, "<markdown_code>v1</markdown_code>");
        stream_text(&mut app, "<markdown_code>v2</markdown_code>");

        app.undo();
        assert_eq!(app.preview_code(), Some("v1"));
        app.undo();
        assert_eq!(app.status.as_ref().unwrap().text, "Nothing to undo");
        app.redo();
        assert_eq!(app.preview_code(), Some("v2"));
        assert_eq!(app.history_position_label(), "version 2/2");
    }

    #[test]
    fn test_error_after_partial_keeps_text() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.streaming = Some(ResponseAccumulator::new());
        app.on_generation_event(StreamEvent::Delta("<markdown_code>partial".to_string()));
        app.on_generation_event(StreamEvent::Error(GenerationError::Stream("reset".to_string())));

        assert!(!app.is_generating());
        assert_eq!(app.session.current_code(), Some("partial"));
        let last = app.session.transcript.turns().last().unwrap();
        assert!(last.text.starts_with("Error: Streaming failed"));
        assert_eq!(app.status.as_ref().unwrap().kind, StatusKind::Error);
    }

    #[test]
    fn test_live_preview_while_streaming() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.streaming = Some(ResponseAccumulator::new());
        app.on_generation_event(StreamEvent::Delta("ok <markdown_code>\n<svg>".to_string()));
        assert_eq!(app.preview_code(), Some("<svg>"));
    }

    #[test]
    fn test_apply_writes_default_file() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.apply_to_file();
        assert_eq!(app.status.as_ref().unwrap().kind, StatusKind::Error);

        stream_text(&mut app, "<markdown_code># Me</markdown_code>");
        app.apply_to_file();
        let written = std::fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert_eq!(written, "# Me\n");
    }

    #[test]
    fn test_cycle_variant_loads_separate_session() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.input = "readme prompt".to_string();
        stream_text(&mut app, "<markdown_code># Me</markdown_code>");

        app.cycle_variant();
        assert_eq!(app.variant, Variant::CodeSnippet);
        assert!(app.preview_code().is_none());

        app.cycle_variant();
        app.cycle_variant();
        assert_eq!(app.variant, Variant::ProfileReadme);
        assert_eq!(app.preview_code(), Some("# Me"));
        assert_eq!(app.input, "readme prompt");
    }

    #[test]
    fn test_snapshot_restore() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        stream_text(&mut app, "<markdown_code>first</markdown_code>");
        app.save_snapshot();
        stream_text(&mut app, "<markdown_code>second</markdown_code>");

        app.toggle_snapshots();
        assert_eq!(app.snapshot_state.selected(), Some(0));
        app.restore_selected_snapshot();
        assert_eq!(app.preview_code(), Some("first"));
        assert_eq!(app.session.undo.len(), 3);
        assert!(!app.show_snapshots);
    }

    #[test]
    fn test_empty_input_not_submitted() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        app.input = "   ".to_string();
        app.start_generation(tx);
        assert!(!app.is_generating());
        assert!(app.session.transcript.is_empty());
    }
}
