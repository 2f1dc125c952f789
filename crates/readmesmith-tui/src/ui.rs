use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};
use readmesmith_core::variant::OptionKind;
use readmesmith_core::{Provider, Role};

use crate::app::{App, InputMode, StatusKind};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                if !current_text.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut current_text)));
                }
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Centered popup of the given size, clamped to the frame.
fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, options bar, body, footer
    let [header_area, options_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_options(app, frame, options_area);
    render_body(app, frame, body_area);
    render_footer(app, frame, footer_area);

    // Render popups (in order of priority)
    if app.show_api_key_input {
        render_api_key_input(app, frame, area);
    } else if app.show_provider_picker {
        render_provider_picker(app, frame, area);
    } else if app.show_model_picker {
        render_model_picker(app, frame, area);
    } else if app.show_snapshots {
        render_snapshot_browser(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" readmesmith ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!(" {} ", app.variant.display_name()),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        Span::raw("  "),
        Span::styled(
            format!("{}: {}", app.current_provider.short_name(), app.selected_model),
            Style::default().fg(Color::White),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_options(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().fg(Color::Yellow);
    let value_style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
    let label_style = Style::default().fg(Color::Gray);

    let hotkey = |kind: &OptionKind| match kind {
        OptionKind::Style => "s",
        OptionKind::Speed => "p",
        OptionKind::Direction => "d",
        OptionKind::Language => "l",
    };

    let mut spans = vec![Span::raw(" ")];
    let controls = app.variant.controls().iter();
    for (kind, (label, value)) in controls.zip(app.session.options.describe(app.variant)) {
        spans.push(Span::styled(format!("[{}] ", hotkey(kind)), key_style));
        spans.push(Span::styled(format!("{}: ", label), label_style));
        spans.push(Span::styled(value, value_style));
        spans.push(Span::raw("   "));
    }
    spans.push(Span::styled(
        format!("-> {}", app.variant.default_file_name(&app.session.options)),
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_body(app: &mut App, frame: &mut Frame, area: Rect) {
    // Chat and input on the left, generated artifact on the right
    let [left_area, preview_area] = Layout::horizontal([
        Constraint::Percentage(40),
        Constraint::Percentage(60),
    ])
    .areas(area);

    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(5),
    ])
    .areas(left_area);

    // Store dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);
    app.preview_height = preview_area.height.saturating_sub(2);

    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_preview(app, frame, preview_area);
}

fn render_chat(app: &App, frame: &mut Frame, area: Rect) {
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let you_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let ai_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let marker_style = Style::default().fg(Color::Green).add_modifier(Modifier::ITALIC);

    let chat_text = if app.session.transcript.is_empty() && !app.is_generating() {
        Text::from(vec![
            Line::from(Span::styled(
                format!("Describe the {} you want.", app.variant.display_name().to_lowercase()),
                Style::default().fg(Color::DarkGray),
            )),
            Line::default(),
            Line::from(Span::styled(
                app.variant.placeholder(),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )),
        ])
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for turn in app.session.transcript.turns() {
            match turn.role {
                Role::User => {
                    lines.push(Line::from(Span::styled("You:", you_style)));
                    for line in turn.text.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
                Role::Assistant => {
                    lines.push(Line::from(Span::styled("AI:", ai_style)));
                    let error_style = turn.text.starts_with("Error: ");
                    for line in turn.text.lines() {
                        if error_style {
                            lines.push(Line::from(Span::styled(
                                line.to_string(),
                                Style::default().fg(Color::Red),
                            )));
                        } else {
                            lines.push(parse_markdown_line(line));
                        }
                    }
                    if let Some(code) = &turn.code {
                        lines.push(Line::from(Span::styled(
                            format!("[generated {} lines]", code.lines().count()),
                            marker_style,
                        )));
                    }
                }
            }
            lines.push(Line::default());
        }

        if let Some(acc) = &app.streaming {
            lines.push(Line::from(Span::styled("AI:", ai_style)));
            let live = acc.latest();
            for line in live.chat.lines() {
                lines.push(parse_markdown_line(line));
            }
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            let label = match &live.code {
                Some(code) => format!("Writing {} lines{}", code.lines().count(), dots),
                None => format!("Generating{}", dots),
            };
            lines.push(Line::from(Span::styled(
                label,
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.input_mode == InputMode::Editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let title = if app.session.current_code().is_some() {
        " Refine (Enter to send) "
    } else {
        " Describe (Enter to send) "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;

    // Newlines shown as a single glyph so char positions stay aligned with the cursor
    let flat: String = app.input.chars().map(|c| if c == '\n' { '⏎' } else { c }).collect();

    // Scroll by whole rows to keep the cursor visible
    let cursor_row = if inner_width == 0 { 0 } else { app.cursor / inner_width };
    let first_row = cursor_row.saturating_sub(inner_height.saturating_sub(1));
    let visible: Vec<Line> = flat
        .chars()
        .collect::<Vec<_>>()
        .chunks(inner_width.max(1))
        .skip(first_row)
        .take(inner_height)
        .map(|row| Line::from(row.iter().collect::<String>()))
        .collect();

    let input = Paragraph::new(visible)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    // Show cursor when editing
    if app.input_mode == InputMode::Editing && inner_width > 0 {
        let cursor_x = (app.cursor % inner_width) as u16;
        let cursor_y = (cursor_row - first_row) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + cursor_y + 1));
    }
}

fn render_preview(app: &App, frame: &mut Frame, area: Rect) {
    let file_name = app.variant.default_file_name(&app.session.options);
    let position = if app.is_generating() {
        "(streaming)".to_string()
    } else if app.session.undo.is_empty() {
        String::new()
    } else {
        format!("{}/{}", app.session.undo.position() + 1, app.session.undo.len())
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.is_generating() { Color::Yellow } else { Color::Cyan }))
        .title(format!(" {} {} ", file_name, position));

    let Some(code) = app.preview_code() else {
        let empty = Paragraph::new("Nothing generated yet.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let total = code.lines().count();
    let gutter = total.to_string().len();
    let lines: Vec<Line> = code
        .lines()
        .enumerate()
        .map(|(i, line)| {
            Line::from(vec![
                Span::styled(
                    format!("{:>width$} ", i + 1, width = gutter),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(line.to_string()),
            ])
        })
        .collect();

    let preview = Paragraph::new(lines)
        .block(block)
        .scroll((app.preview_scroll, 0));

    frame.render_widget(preview, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " EDIT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];

    if let Some(status) = &app.status {
        let style = match status.kind {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        };
        spans.push(Span::styled(format!("{} ", status.text), style));
    }

    let hints: &[(&str, &str)] = match app.input_mode {
        InputMode::Editing => &[("Enter", "send"), ("Alt+Enter", "newline"), ("Esc", "done")],
        InputMode::Normal => &[
            ("i", "edit"),
            ("u/r", "undo/redo"),
            ("v", "variant"),
            ("w", "write"),
            ("S", "snapshot"),
            ("h", "history"),
            ("P/m", "provider/model"),
            ("q", "quit"),
        ],
    };
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_snapshot_browser(app: &mut App, frame: &mut Frame, area: Rect) {
    let count = app.session.snapshots.len() as u16;
    let popup = popup_area(area, 70, count.max(1) + 2);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Snapshots (Enter restore, x delete, Esc close) ");

    if app.session.snapshots.is_empty() {
        let empty = Paragraph::new(" No snapshots yet. Press S to save one.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, popup);
        return;
    }

    let items: Vec<ListItem> = app
        .session
        .snapshots
        .iter()
        .map(|snapshot| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!(" {} ", snapshot.created_at.format("%Y-%m-%d %H:%M")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(snapshot.name.clone()),
                Span::styled(
                    format!("  ({} lines)", snapshot.code.lines().count()),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup, &mut app.snapshot_state);
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let popup = popup_area(area, 44, app.available_models.len() as u16 + 2);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Model (Enter to select, Esc to cancel) ");

    let items: Vec<ListItem> = app
        .available_models
        .iter()
        .map(|model| {
            let style = if model == &app.selected_model {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup, &mut app.model_picker_state);
}

fn render_provider_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let providers = Provider::all();
    let popup = popup_area(area, 45, providers.len() as u16 + 2);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Provider ");

    let items: Vec<ListItem> = providers
        .iter()
        .map(|provider| {
            let key_source = app.config.key_source(*provider);
            let is_current = *provider == app.current_provider;

            let status = match key_source {
                Some("env") => "(env var)",
                Some("config") => "(configured)",
                Some("local") => "(local)",
                _ => "(needs key)",
            };
            let prefix = if is_current { "* " } else { "  " };

            let style = if is_current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else if key_source.is_some() {
                Style::default()
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(format!("{}{} {}", prefix, provider.display_name(), status)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup, &mut app.provider_picker_state);
}

fn render_api_key_input(app: &App, frame: &mut Frame, area: Rect) {
    let provider_name = app
        .api_key_target_provider
        .map(|p| p.display_name())
        .unwrap_or("Provider");

    let popup = popup_area(area, 60, 7);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(format!(" Enter API Key for {} ", provider_name));

    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let instructions = Paragraph::new("Paste your API key below. Press Enter to save, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    // Mask the key, showing the last 4 chars
    let char_count = app.api_key_input.chars().count();
    let display_text = if char_count <= 4 {
        "*".repeat(char_count)
    } else {
        let masked_len = char_count - 4;
        let last_four: String = app.api_key_input.chars().skip(masked_len).collect();
        format!("{}...{}", "*".repeat(masked_len.min(20)), last_four)
    };

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    frame.render_widget(
        Paragraph::new(display_text).style(Style::default().fg(Color::Cyan)),
        input_area,
    );

    let cursor_x = app.api_key_input_cursor.min(input_area.width as usize) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));

    let status = Paragraph::new(format!("{} characters", char_count))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(status, Rect::new(inner.x, inner.y + 4, inner.width, 1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};
    use readmesmith_core::{Config, ResponseAccumulator, SessionStore, StreamEvent, Variant};
    use tempfile::TempDir;

    fn screen_text(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn test_app(dir: &TempDir) -> App {
        let config = Config {
            provider: Some("ollama".to_string()),
            ..Config::new()
        };
        let store = SessionStore::new(dir.path().join("sessions"));
        App::with_parts(config, store, Variant::CodeSnippet, dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_bold_markdown() {
        let line = parse_markdown_line("a **b** c");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "b");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));

        let literal = parse_markdown_line("a **b");
        assert_eq!(literal.spans.len(), 1);
        assert_eq!(literal.spans[0].content, "a **b");
    }

    #[test]
    fn test_renders_empty_state() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        let screen = screen_text(&mut app);
        assert!(screen.contains("Code Snippet"));
        assert!(screen.contains("Nothing generated yet."));
        assert!(screen.contains("snippet.rs"));
    }

    #[test]
    fn test_renders_streaming_preview() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.streaming = Some(ResponseAccumulator::new());
        app.on_generation_event(StreamEvent::Delta("On it <markdown_code>\nfn main() {}".to_string()));

        let screen = screen_text(&mut app);
        assert!(screen.contains("(streaming)"));
        assert!(screen.contains("fn main() {}"));
        assert!(screen.contains("Writing 1 lines"));
    }
}
