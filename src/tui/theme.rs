// ABOUTME: TUI color theme for the chat panel, product cards and input area
// ABOUTME: Provides consistent styling for the terminal interface

use ratatui::prelude::Color;
use shopchat_core::Sender;

// =============================================================================
// Global theme colors
// =============================================================================

/// Main text color
pub const TEXT_COLOR: Color = Color::White;

/// Dimmed/secondary text
pub const DIM_TEXT: Color = Color::DarkGray;

/// Border color for panels
pub const BORDER_COLOR: Color = Color::Gray;

/// Status bar background
pub const STATUS_BAR_BG: Color = Color::DarkGray;

/// Selected/highlighted item
pub const SELECTED_BG: Color = Color::Magenta;

/// Selected item text
pub const SELECTED_FG: Color = Color::White;

/// Panel title and active prompt border
pub const ACCENT: Color = Color::Magenta;

/// Errors and fallback notices
pub const ERROR_COLOR: Color = Color::Red;

// =============================================================================
// Conversation colors
// =============================================================================

pub const USER_COLOR: Color = Color::Cyan;

pub const BOT_COLOR: Color = Color::Magenta;

pub const PRICE_COLOR: Color = Color::Yellow;

/// "Save N TK" badge
pub const SAVINGS_COLOR: Color = Color::Green;

pub const LINK_COLOR: Color = Color::Blue;

/// Get the label color for a message author
pub fn sender_color(sender: Sender) -> Color {
    match sender {
        Sender::User => USER_COLOR,
        Sender::Bot => BOT_COLOR,
    }
}
