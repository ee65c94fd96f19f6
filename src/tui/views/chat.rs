// ABOUTME: Chat panel: conversation with partial reveal and inline carousels, suggestions and input box
// ABOUTME: Builds the conversation as styled lines and scrolls it so the newest message stays visible

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use shopchat_core::{segment, Message, Sender};

use super::carousel::carousel_lines;
use crate::render::sender_label;
use crate::tui::app::{InputMode, TuiApp};
use crate::tui::markdown::markdown_lines;
use crate::tui::theme;

const CURSOR: &str = "▌";

/// Render the chat panel inside `area`
pub fn render_chat(frame: &mut Frame, area: Rect, app: &TuiApp) {
    frame.render_widget(Clear, area);

    let title = match &app.user_name {
        Some(name) => format!(" {} · chatting with {} ", app.bot_name, name),
        None => format!(" {} ", app.bot_name),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            title,
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(theme::BORDER_COLOR));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let suggestion_rows = if app.suggestions.is_empty() { 0 } else { 3 };
    let staged_rows = u16::from(app.staged_image.is_some());
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(suggestion_rows),
            Constraint::Length(staged_rows),
            Constraint::Length(3),
        ])
        .split(inner);

    render_conversation(frame, layout[0], app);
    if suggestion_rows > 0 {
        render_suggestions(frame, layout[1], app);
    }
    if let Some(path) = &app.staged_image {
        let line = Line::from(vec![
            Span::styled("[img] ", Style::default().fg(theme::LINK_COLOR)),
            Span::styled(
                path.display().to_string(),
                Style::default().fg(theme::TEXT_COLOR),
            ),
            Span::styled(
                if app.image_uploaded {
                    "  (uploaded, Esc removes)"
                } else {
                    "  (uploading, Esc removes)"
                },
                Style::default().fg(theme::DIM_TEXT),
            ),
        ]);
        frame.render_widget(Paragraph::new(line), layout[2]);
    }
    render_input(frame, layout[3], app);
}

/// All conversation lines for the current snapshot
pub fn conversation_lines(app: &TuiApp, width: u16) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (index, message) in app.history.iter().enumerate() {
        lines.push(Line::from(Span::styled(
            sender_label(message.sender, &app.bot_name).to_string(),
            Style::default()
                .fg(theme::sender_color(message.sender))
                .add_modifier(Modifier::BOLD),
        )));
        match message.sender {
            Sender::User => lines.extend(user_lines(message)),
            Sender::Bot => lines.extend(bot_lines(app, index, message, width)),
        }
        lines.push(Line::default());
    }

    if app.pending {
        lines.push(Line::from(Span::styled(
            format!("{} is typing…", app.bot_name),
            Style::default()
                .fg(theme::DIM_TEXT)
                .add_modifier(Modifier::ITALIC),
        )));
    }
    lines
}

fn user_lines(message: &Message) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = message
        .text
        .lines()
        .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(theme::TEXT_COLOR))))
        .collect();
    if let Some(url) = &message.image {
        lines.push(Line::from(Span::styled(
            format!("[img] {}", url),
            Style::default().fg(theme::LINK_COLOR),
        )));
    }
    lines
}

fn bot_lines(app: &TuiApp, index: usize, message: &Message, width: u16) -> Vec<Line<'static>> {
    let visible = app.reveal.visible_text(index, &message.text);
    let typing = app.reveal.is_typing(index);

    let mut lines = match segment(&message.text, &message.products) {
        Some(point) => {
            let (before, after) = point.apply(visible);
            let mut lines = markdown_lines(before.trim_end());
            if point.carousel_visible(visible.len(), typing) {
                lines.extend(carousel_lines(
                    &message.products,
                    app.carousel_position(index),
                    width,
                ));
            }
            lines.extend(markdown_lines(after));
            lines
        }
        None => markdown_lines(visible),
    };

    if typing {
        let cursor = Span::styled(CURSOR, Style::default().fg(theme::BOT_COLOR));
        match lines.last_mut() {
            Some(last) => last.spans.push(cursor),
            None => lines.push(Line::from(cursor)),
        }
    }
    lines
}

/// Rows the lines occupy once wrapped to `width`
fn wrapped_height(lines: &[Line<'_>], width: u16) -> usize {
    let width = usize::from(width.max(1));
    lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum()
}

fn render_conversation(frame: &mut Frame, area: Rect, app: &TuiApp) {
    let lines = conversation_lines(app, area.width);
    let total = wrapped_height(&lines, area.width);
    let bottom = total.saturating_sub(usize::from(area.height));
    let offset = bottom.saturating_sub(usize::from(app.scroll_from_bottom));
    let offset = u16::try_from(offset).unwrap_or(u16::MAX);

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    frame.render_widget(paragraph, area);
}

fn render_suggestions(frame: &mut Frame, area: Rect, app: &TuiApp) {
    let mut spans = Vec::new();
    for (i, question) in app.suggestions.iter().enumerate() {
        let style = if i == app.selected_suggestion {
            Style::default()
                .fg(theme::SELECTED_FG)
                .bg(theme::SELECTED_BG)
        } else {
            Style::default().fg(theme::ACCENT)
        };
        spans.push(Span::styled(format!(" {} ", question), style));
        spans.push(Span::raw(" "));
    }

    let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(
            "Try asking (Tab to pick, Enter to send):",
            Style::default().fg(theme::DIM_TEXT),
        )),
        Line::from(spans),
    ])
    .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_input(frame: &mut Frame, area: Rect, app: &TuiApp) {
    let (buffer, border) = match app.mode {
        InputMode::Chat => (&app.input_buffer, theme::BORDER_COLOR),
        InputMode::NamePrompt | InputMode::ImagePath => (&app.prompt_buffer, theme::ACCENT),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(app.mode.title())
        .border_style(Style::default().fg(border));

    let content = if buffer.is_empty() && app.mode == InputMode::Chat && app.pending {
        Line::from(Span::styled(
            "Waiting for a reply…",
            Style::default().fg(theme::DIM_TEXT),
        ))
    } else {
        Line::from(Span::styled(
            format!("{}\u{2588}", buffer),
            Style::default().fg(theme::TEXT_COLOR),
        ))
    };
    frame.render_widget(Paragraph::new(content).block(block), area);
}

// =============================================================================
// Tests
// =============================================================================
