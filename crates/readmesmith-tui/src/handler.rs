use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use readmesmith_core::variant::OptionKind;
use tokio::sync::mpsc::UnboundedSender;

use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent, tx: &UnboundedSender<AppEvent>) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key, tx).await?,
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
        AppEvent::Generation(event) => app.on_generation_event(event),
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    if app.show_api_key_input {
        handle_api_key_input(app, key);
        return Ok(());
    }
    if app.show_provider_picker {
        handle_provider_picker(app, key);
        return Ok(());
    }
    if app.show_model_picker {
        handle_model_picker(app, key);
        return Ok(());
    }
    if app.show_snapshots {
        handle_snapshot_browser(app, key);
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key).await,
        InputMode::Editing => handle_editing_mode(app, key, tx),
    }
    Ok(())
}

fn handle_paste(app: &mut App, text: &str) {
    if app.show_api_key_input {
        let byte_pos = char_to_byte_index(&app.api_key_input, app.api_key_input_cursor);
        let text = text.trim();
        app.api_key_input.insert_str(byte_pos, text);
        app.api_key_input_cursor += text.chars().count();
        return;
    }
    if app.input_mode == InputMode::Editing {
        let byte_pos = char_to_byte_index(&app.input, app.cursor);
        app.input.insert_str(byte_pos, text);
        app.cursor += text.chars().count();
    }
}

async fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Enter => {
            if !app.is_generating() {
                app.input_mode = InputMode::Editing;
            }
        }

        // History
        KeyCode::Char('u') => app.undo(),
        KeyCode::Char('r') => app.redo(), // plain or Ctrl-r

        // Variant and options
        KeyCode::Char('v') | KeyCode::Tab => app.cycle_variant(),
        KeyCode::Char('s') if app.has_control(OptionKind::Style) => app.cycle_style(),
        KeyCode::Char('p') if app.has_control(OptionKind::Speed) => app.cycle_speed(),
        KeyCode::Char('d') if app.has_control(OptionKind::Direction) => app.cycle_direction(),
        KeyCode::Char('l') if app.has_control(OptionKind::Language) => app.cycle_language(),

        // Artifact actions
        KeyCode::Char('w') => app.apply_to_file(),
        KeyCode::Char('S') => app.save_snapshot(),
        KeyCode::Char('h') => app.toggle_snapshots(),
        KeyCode::Char('c') => app.clear_conversation(),

        // Scrolling
        KeyCode::Char('j') | KeyCode::Down => app.preview_scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.preview_scroll_up(),
        KeyCode::Char('J') | KeyCode::PageDown => app.chat_scroll_down(),
        KeyCode::Char('K') | KeyCode::PageUp => app.chat_scroll_up(),

        // Provider and model
        KeyCode::Char('P') => app.open_provider_picker(),
        KeyCode::Char('m') => app.open_model_picker().await,

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        // Alt+Enter inserts a newline, plain Enter submits
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, '\n');
            app.cursor += 1;
        }
        KeyCode::Enter => app.start_generation(tx.clone()),
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

fn handle_api_key_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.show_api_key_input = false;
            app.api_key_input.clear();
            app.api_key_input_cursor = 0;
            app.api_key_target_provider = None;
        }
        KeyCode::Enter => app.submit_api_key(),
        KeyCode::Backspace => {
            if app.api_key_input_cursor > 0 {
                app.api_key_input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.api_key_input, app.api_key_input_cursor);
                app.api_key_input.remove(byte_pos);
            }
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.api_key_input, app.api_key_input_cursor);
            app.api_key_input.insert(byte_pos, c);
            app.api_key_input_cursor += 1;
        }
        KeyCode::Left => {
            app.api_key_input_cursor = app.api_key_input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.api_key_input.chars().count();
            app.api_key_input_cursor = (app.api_key_input_cursor + 1).min(char_count);
        }
        _ => {}
    }
}

fn handle_provider_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.show_provider_picker = false;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.provider_picker_nav_down();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.provider_picker_nav_up();
        }
        KeyCode::Enter => app.select_provider(),
        _ => {}
    }
}

fn handle_model_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.show_model_picker = false;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.model_picker_nav_down();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.model_picker_nav_up();
        }
        KeyCode::Enter => {
            app.select_model();
        }
        _ => {}
    }
}

fn handle_snapshot_browser(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('q') => {
            app.show_snapshots = false;
        }
        KeyCode::Char('j') | KeyCode::Down => app.snapshot_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.snapshot_nav_up(),
        KeyCode::Enter => app.restore_selected_snapshot(),
        KeyCode::Char('x') | KeyCode::Delete => app.delete_selected_snapshot(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readmesmith_core::{Config, SessionStore, StreamEvent, Variant};
    use tempfile::TempDir;

    fn test_app(dir: &TempDir) -> App {
        let config = Config {
            provider: Some("ollama".to_string()),
            ..Config::new()
        };
        let store = SessionStore::new(dir.path().join("sessions"));
        App::with_parts(config, store, Variant::AnimatedSvg, dir.path().to_path_buf()).unwrap()
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    async fn type_str(app: &mut App, tx: &UnboundedSender<AppEvent>, s: &str) {
        for c in s.chars() {
            handle_event(app, key(KeyCode::Char(c)), tx).await.unwrap();
        }
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("héllo", 0), 0);
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("héllo", 10), 6);
    }

    #[tokio::test]
    async fn test_editing_handles_multibyte_input() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

        type_str(&mut app, &tx, "naïve").await;
        handle_event(&mut app, key(KeyCode::Left), &tx).await.unwrap();
        handle_event(&mut app, key(KeyCode::Left), &tx).await.unwrap();
        handle_event(&mut app, key(KeyCode::Backspace), &tx).await.unwrap();
        assert_eq!(app.input, "nave");
        assert_eq!(app.cursor, 2);
    }

    #[tokio::test]
    async fn test_option_keys_respect_variant_controls() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        handle_event(&mut app, key(KeyCode::Esc), &tx).await.unwrap();

        let before = app.session.options;
        handle_event(&mut app, key(KeyCode::Char('p')), &tx).await.unwrap();
        assert_ne!(app.session.options.animation_speed, before.animation_speed);

        // Language is not a control of the SVG variant
        handle_event(&mut app, key(KeyCode::Char('l')), &tx).await.unwrap();
        assert_eq!(app.session.options.target_language, before.target_language);
    }

    #[tokio::test]
    async fn test_paste_inserts_at_cursor() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        type_str(&mut app, &tx, "ab").await;
        handle_event(&mut app, key(KeyCode::Left), &tx).await.unwrap();
        handle_event(&mut app, AppEvent::Paste("XY".to_string()), &tx).await.unwrap();
        assert_eq!(app.input, "aXYb");
        assert_eq!(app.cursor, 3);
    }

    #[tokio::test]
    async fn test_generation_events_reach_app() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        app.streaming = Some(Default::default());

        let delta = StreamEvent::Delta("<markdown_code><svg/></markdown_code>".to_string());
        handle_event(&mut app, AppEvent::Generation(delta), &tx).await.unwrap();
        handle_event(&mut app, AppEvent::Generation(StreamEvent::Done), &tx).await.unwrap();
        assert_eq!(app.preview_code(), Some("<svg/>"));
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_from_editing() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let ctrl_c = AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        handle_event(&mut app, ctrl_c, &tx).await.unwrap();
        assert!(app.should_quit);
    }
}
