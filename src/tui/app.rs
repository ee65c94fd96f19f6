// ABOUTME: TUI application state: input buffers, conversation snapshot, scroll and carousel positions
// ABOUTME: Translates key, resize and widget events into actions the run loop hands to the orchestrator

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use shopchat_core::{
    segment, AssetUploader, ChatBackend, LayoutTracker, Message, Orchestrator, RevealState,
    TurnOutcome, Viewport, WidgetEvent,
};
use std::collections::HashMap;
use std::path::PathBuf;

use super::event::TuiEvent;
use super::views;

/// Terminal cells are mapped to CSS-like pixels so the panel sizing rules apply unchanged
pub const CELL_WIDTH_PX: f64 = 8.0;
pub const CELL_HEIGHT_PX: f64 = 16.0;

const PAGE_SCROLL: u16 = 10;

pub fn cells_to_viewport(cols: u16, rows: u16) -> Viewport {
    Viewport::new(f64::from(cols) * CELL_WIDTH_PX, f64::from(rows) * CELL_HEIGHT_PX)
}

// =============================================================================
// Input mode: what the input box is editing
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Chat,
    /// Asking for the visitor's name before the first turn
    NamePrompt,
    /// Typing a path to an image to attach
    ImagePath,
}

impl InputMode {
    pub fn title(&self) -> &'static str {
        match self {
            InputMode::Chat => " Message ",
            InputMode::NamePrompt => " What should we call you? ",
            InputMode::ImagePath => " Image path ",
        }
    }
}

// =============================================================================
// Event handling result
// =============================================================================

/// Work the run loop performs against the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    Send {
        text: String,
    },
    SendSuggestion {
        text: String,
        suggestion: String,
    },
    /// Attach an image and start its upload
    AttachImage(PathBuf),
    DiscardImage,
    SetName(String),
    Clear,
}

#[derive(Debug, PartialEq)]
pub enum EventResult {
    Continue,
    Quit,
    Action(AppAction),
}

// =============================================================================
// TuiApp: main application state
// =============================================================================

pub struct TuiApp {
    pub mode: InputMode,
    pub input_buffer: String,
    /// Buffer for the name and image-path prompts
    pub prompt_buffer: String,
    pub staged_image: Option<PathBuf>,
    /// Upload of the staged image has finished
    pub image_uploaded: bool,
    pub history: Vec<Message>,
    pub reveal: RevealState,
    pub suggestions: Vec<String>,
    pub selected_suggestion: usize,
    pub pending: bool,
    pub user_name: Option<String>,
    pub bot_name: String,
    /// Rows scrolled up from the newest message
    pub scroll_from_bottom: u16,
    /// Carousel position per message index
    pub carousel_positions: HashMap<usize, usize>,
    pub layout: LayoutTracker,
    pub status: Option<String>,
}

impl TuiApp {
    pub fn new(bot_name: impl Into<String>, viewport: Viewport) -> Self {
        Self {
            mode: InputMode::Chat,
            input_buffer: String::new(),
            prompt_buffer: String::new(),
            staged_image: None,
            image_uploaded: false,
            history: Vec::new(),
            reveal: RevealState::Idle,
            suggestions: Vec::new(),
            selected_suggestion: 0,
            pending: false,
            user_name: None,
            bot_name: bot_name.into(),
            scroll_from_bottom: 0,
            carousel_positions: HashMap::new(),
            layout: LayoutTracker::new(viewport),
            status: None,
        }
    }

    /// Refresh the conversation snapshot from the orchestrator
    pub fn sync<B: ChatBackend, U: AssetUploader>(&mut self, orchestrator: &Orchestrator<B, U>) {
        let session = orchestrator.session();
        self.user_name = session.user_name().map(str::to_string);
        self.history = session.history().to_vec();
        self.reveal = orchestrator.reveal_state();
        self.pending = orchestrator.is_pending();
        self.image_uploaded = orchestrator.staged_image_url().is_some();
        let suggestions = orchestrator.suggestions();
        if suggestions != self.suggestions {
            self.suggestions = suggestions;
            self.selected_suggestion = 0;
        }
        self.carousel_positions.retain(|index, _| *index < self.history.len());
    }

    /// Ask for a name when none is stored yet
    pub fn prompt_for_name(&mut self) {
        self.mode = InputMode::NamePrompt;
        self.prompt_buffer.clear();
    }

    pub fn handle_event(&mut self, event: TuiEvent) -> EventResult {
        match event {
            TuiEvent::Key(key) => self.handle_key(key),
            TuiEvent::Resize { cols, rows } => {
                self.layout.on_viewport_change(cells_to_viewport(cols, rows));
                EventResult::Continue
            }
            TuiEvent::Tick => EventResult::Continue,
            TuiEvent::Widget(event) => {
                self.apply_widget_event(event);
                EventResult::Continue
            }
            TuiEvent::ImageRejected { path, error } => {
                if self.staged_image.as_ref() == Some(&path) {
                    self.staged_image = None;
                }
                self.status = Some(format!("Could not attach image: {}", error));
                EventResult::Continue
            }
            TuiEvent::TurnFinished(outcome) => {
                self.status = match outcome {
                    TurnOutcome::Failed => {
                        Some("The assistant could not be reached. Try again shortly.".to_string())
                    }
                    TurnOutcome::Rejected => {
                        Some("Still answering the previous message.".to_string())
                    }
                    TurnOutcome::Skipped | TurnOutcome::Answered { .. } => None,
                };
                EventResult::Continue
            }
        }
    }

    fn apply_widget_event(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::PendingChanged { pending } => self.pending = pending,
            WidgetEvent::SuggestionsReady { questions } => {
                self.suggestions = questions;
                self.selected_suggestion = 0;
            }
            WidgetEvent::HistoryChanged { .. } | WidgetEvent::ScrollToBottom => {
                self.scroll_from_bottom = 0;
            }
            WidgetEvent::Revealed { .. } => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> EventResult {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
            return EventResult::Quit;
        }

        match self.mode {
            InputMode::NamePrompt => self.handle_name_key(key),
            InputMode::ImagePath => self.handle_image_key(key),
            InputMode::Chat => self.handle_chat_key(key, ctrl),
        }
    }

    fn handle_name_key(&mut self, key: KeyEvent) -> EventResult {
        match key.code {
            KeyCode::Enter => {
                let name = self.prompt_buffer.trim().to_string();
                if name.is_empty() {
                    return EventResult::Continue;
                }
                self.prompt_buffer.clear();
                self.mode = InputMode::Chat;
                return EventResult::Action(AppAction::SetName(name));
            }
            KeyCode::Esc => {
                self.prompt_buffer.clear();
                self.mode = InputMode::Chat;
            }
            KeyCode::Backspace => {
                self.prompt_buffer.pop();
            }
            KeyCode::Char(c) => self.prompt_buffer.push(c),
            _ => {}
        }
        EventResult::Continue
    }

    fn handle_image_key(&mut self, key: KeyEvent) -> EventResult {
        match key.code {
            KeyCode::Enter => {
                let path = PathBuf::from(self.prompt_buffer.trim());
                self.prompt_buffer.clear();
                self.mode = InputMode::Chat;
                if !path.as_os_str().is_empty() {
                    self.staged_image = Some(path.clone());
                    self.image_uploaded = false;
                    self.status = None;
                    return EventResult::Action(AppAction::AttachImage(path));
                }
            }
            KeyCode::Esc => {
                self.prompt_buffer.clear();
                self.mode = InputMode::Chat;
            }
            KeyCode::Backspace => {
                self.prompt_buffer.pop();
            }
            KeyCode::Char(c) => self.prompt_buffer.push(c),
            _ => {}
        }
        EventResult::Continue
    }

    fn handle_chat_key(&mut self, key: KeyEvent, ctrl: bool) -> EventResult {
        if ctrl {
            match key.code {
                KeyCode::Char('l') => {
                    self.input_buffer.clear();
                    self.staged_image = None;
                    self.carousel_positions.clear();
                    self.scroll_from_bottom = 0;
                    return EventResult::Action(AppAction::Clear);
                }
                KeyCode::Char('o') => {
                    self.prompt_buffer.clear();
                    self.mode = InputMode::ImagePath;
                }
                _ => {}
            }
            return EventResult::Continue;
        }

        match key.code {
            KeyCode::Enter => return self.submit(),
            KeyCode::Tab => self.cycle_suggestion(true),
            KeyCode::BackTab => self.cycle_suggestion(false),
            KeyCode::Up => self.scroll_up(1),
            KeyCode::Down => self.scroll_down(1),
            KeyCode::PageUp => self.scroll_up(PAGE_SCROLL),
            KeyCode::PageDown => self.scroll_down(PAGE_SCROLL),
            KeyCode::Left => self.move_carousel(false),
            KeyCode::Right => self.move_carousel(true),
            KeyCode::Esc => {
                if self.staged_image.take().is_some() {
                    return EventResult::Action(AppAction::DiscardImage);
                }
                self.input_buffer.clear();
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) => self.input_buffer.push(c),
            _ => {}
        }
        EventResult::Continue
    }

    /// Typed text wins; an empty input sends the highlighted suggestion
    fn submit(&mut self) -> EventResult {
        if self.pending {
            self.status = Some("Still answering the previous message.".to_string());
            return EventResult::Continue;
        }

        if !self.input_buffer.trim().is_empty() {
            let text = std::mem::take(&mut self.input_buffer);
            self.staged_image = None;
            self.status = None;
            return EventResult::Action(AppAction::Send { text });
        }

        match self.suggestions.get(self.selected_suggestion) {
            Some(suggestion) => {
                let suggestion = suggestion.clone();
                self.input_buffer.clear();
                self.staged_image = None;
                self.status = None;
                EventResult::Action(AppAction::SendSuggestion {
                    text: String::new(),
                    suggestion,
                })
            }
            None => EventResult::Continue,
        }
    }

    fn cycle_suggestion(&mut self, forward: bool) {
        let count = self.suggestions.len();
        if count == 0 {
            return;
        }
        self.selected_suggestion = if forward {
            (self.selected_suggestion + 1) % count
        } else {
            (self.selected_suggestion + count - 1) % count
        };
    }

    fn scroll_up(&mut self, rows: u16) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(rows);
    }

    fn scroll_down(&mut self, rows: u16) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(rows);
    }

    /// Index of the newest bot message that embeds a carousel
    pub fn latest_carousel(&self) -> Option<usize> {
        self.history
            .iter()
            .enumerate()
            .rev()
            .find(|(_, m)| m.is_bot() && segment(&m.text, &m.products).is_some())
            .map(|(i, _)| i)
    }

    /// Current product position for a message's carousel
    pub fn carousel_position(&self, message_index: usize) -> usize {
        let count = self
            .history
            .get(message_index)
            .map(|m| m.products.len())
            .unwrap_or(0);
        if count == 0 {
            return 0;
        }
        self.carousel_positions.get(&message_index).copied().unwrap_or(0) % count
    }

    fn move_carousel(&mut self, forward: bool) {
        let Some(index) = self.latest_carousel() else {
            return;
        };
        let count = self.history[index].products.len();
        let current = self.carousel_position(index);
        let next = if forward {
            (current + 1) % count
        } else {
            (current + count - 1) % count
        };
        self.carousel_positions.insert(index, next);
    }

    pub fn render(&self, frame: &mut Frame) {
        views::render(frame, self);
    }
}

// =============================================================================
// Tests
// =============================================================================
