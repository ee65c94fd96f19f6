// ABOUTME: Places the chat panel on screen from the computed panel layout and draws the status line
// ABOUTME: Pixel bounds are converted to terminal cells; the panel is anchored bottom-right

pub mod carousel;
pub mod chat;

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use shopchat_core::PanelLayout;

use super::app::{InputMode, TuiApp, CELL_HEIGHT_PX, CELL_WIDTH_PX};
use super::theme;

const MIN_PANEL_COLS: u16 = 24;
const MIN_PANEL_ROWS: u16 = 10;

fn px_to_cells(px: f64, cell: f64) -> u16 {
    let cells = (px / cell).floor();
    if cells <= 0.0 {
        0
    } else if cells >= f64::from(u16::MAX) {
        u16::MAX
    } else {
        cells as u16
    }
}

/// Screen rectangle for the chat panel within `area`
pub fn panel_rect(area: Rect, layout: &PanelLayout) -> Rect {
    let margin = px_to_cells(layout.bottom_margin, CELL_HEIGHT_PX).min(area.height);
    let available_rows = area.height - margin;

    let width = px_to_cells(layout.panel_width, CELL_WIDTH_PX)
        .max(MIN_PANEL_COLS)
        .min(area.width);
    let height = px_to_cells(layout.max_height, CELL_HEIGHT_PX)
        .max(MIN_PANEL_ROWS)
        .min(available_rows);

    Rect {
        x: area.x + area.width - width,
        y: area.y + available_rows - height,
        width,
        height,
    }
}

/// Draw the whole screen for the current app state
pub fn render(frame: &mut Frame, app: &TuiApp) {
    let area = frame.area();
    let panel = panel_rect(area, &app.layout.current());
    chat::render_chat(frame, panel, app);

    if area.height > panel.bottom() - area.y {
        let status_area = Rect {
            x: area.x,
            y: area.bottom() - 1,
            width: area.width,
            height: 1,
        };
        render_status_bar(frame, status_area, app);
    }
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &TuiApp) {
    let (text, fg) = match &app.status {
        Some(status) => (format!(" {} ", status), theme::ERROR_COLOR),
        None => {
            let hints = match app.mode {
                InputMode::Chat => {
                    "Ctrl+C: quit | Enter: send | Tab: suggestion | ←/→: products | ↑/↓: scroll | Ctrl+O: image | Ctrl+L: clear"
                }
                InputMode::NamePrompt => "Enter: save name | Esc: skip",
                InputMode::ImagePath => "Enter: attach | Esc: cancel",
            };
            (format!(" {} ", hints), Color::White)
        }
    };
    let status = Paragraph::new(text).style(Style::default().fg(fg).bg(theme::STATUS_BAR_BG));
    frame.render_widget(status, area);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::app::cells_to_viewport;
    use ratatui::backend::TestBackend;
    use shopchat_core::{compute_layout, Message, Product};

    #[test]
    fn test_regular_panel_is_right_anchored_above_margin() {
        let area = Rect::new(0, 0, 100, 40);
        let rect = panel_rect(area, &compute_layout(cells_to_viewport(100, 40)));
        // 420px / 8 = 52 cols, min(640 * 0.85, 750) / 16 = 34 rows
        assert_eq!(rect.width, 52);
        assert_eq!(rect.height, 34);
        assert_eq!(rect.right(), 100);
        assert_eq!(rect.bottom(), 39);
    }

    #[test]
    fn test_compact_panel_fills_narrow_terminal() {
        let area = Rect::new(0, 0, 40, 30);
        let rect = panel_rect(area, &compute_layout(cells_to_viewport(40, 30)));
        assert_eq!(rect.width, 40);
        assert_eq!(rect.x, 0);
        // min(480 * 0.9, 650) / 16 = 27 rows
        assert_eq!(rect.height, 27);
    }

    #[test]
    fn test_tiny_terminal_does_not_overflow() {
        let area = Rect::new(0, 0, 10, 5);
        let rect = panel_rect(area, &compute_layout(cells_to_viewport(10, 5)));
        assert!(rect.width <= 10);
        assert!(rect.bottom() <= 5);
    }

    #[test]
    fn test_render_shows_carousel_and_hints() {
        let mut app = TuiApp::new("Klassy AI Chatbot", cells_to_viewport(100, 40));
        app.history = vec![
            Message::bot("Hello! How can I help?", vec![]),
            Message::user("Dry skin", None),
            Message::bot(
                "Here are some recommendations: moisturize daily.",
                vec![Product {
                    id: "7".to_string(),
                    name: "Aloe Gel".to_string(),
                    price: Some("450TK".to_string()),
                    ..Default::default()
                }],
            ),
        ];

        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|frame| render(frame, &app)).unwrap();

        let buffer = terminal.backend().buffer();
        let screen: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(screen.contains("Recommended Products (1)"));
        assert!(screen.contains("Aloe Gel"));
        assert!(screen.contains("Ctrl+C: quit"));
    }
}
