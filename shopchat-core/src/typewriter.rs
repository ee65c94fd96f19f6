// ABOUTME: Progressive character-by-character reveal of bot replies
// ABOUTME: Tokened state machine plus a frame-driven tokio task; a newer reveal supersedes older ones

use crate::events::{EventSender, WidgetEvent};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Minimum time between two revealed characters
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(2);
/// Cadence of the driver task, standing in for a paint callback
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);
/// Delay between finishing a reveal and scrolling the view
pub const DEFAULT_SCROLL_DELAY: Duration = Duration::from_millis(100);

/// Identifies one reveal. Ticks carrying an older token are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RevealToken(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealState {
    Idle,
    Typing {
        token: RevealToken,
        message_index: usize,
        /// Characters shown so far
        revealed: usize,
        /// Characters in the full text
        total: usize,
    },
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The token no longer names the active reveal; nothing changed
    Stale,
    /// Not enough time has passed since the last character
    Waiting,
    /// One more character is visible
    Advanced(usize),
    /// Reveal complete, state is back to idle
    Finished { scroll_after: Duration },
}

#[derive(Debug)]
pub struct Typewriter {
    state: RevealState,
    last_advance: Option<Instant>,
    next_token: u64,
    min_interval: Duration,
    scroll_delay: Duration,
}

impl Default for Typewriter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL, DEFAULT_SCROLL_DELAY)
    }
}

impl Typewriter {
    pub fn new(min_interval: Duration, scroll_delay: Duration) -> Self {
        Self {
            state: RevealState::Idle,
            last_advance: None,
            next_token: 0,
            min_interval,
            scroll_delay,
        }
    }

    /// Begin revealing `text` for the message at `message_index`.
    ///
    /// Overwrites any reveal in progress; its remaining characters are
    /// abandoned and its token goes stale. Empty text starts nothing.
    pub fn start(&mut self, message_index: usize, text: &str) -> Option<RevealToken> {
        if text.is_empty() {
            return None;
        }
        if let RevealState::Typing {
            message_index: previous,
            revealed,
            total,
            ..
        } = self.state
        {
            tracing::debug!(
                previous,
                revealed,
                total,
                next = message_index,
                "Superseding unfinished reveal"
            );
        }

        self.next_token += 1;
        let token = RevealToken(self.next_token);
        self.state = RevealState::Typing {
            token,
            message_index,
            revealed: 0,
            total: text.chars().count(),
        };
        self.last_advance = None;
        Some(token)
    }

    /// Advance the reveal identified by `token` if the interval has elapsed
    pub fn tick(&mut self, token: RevealToken, now: Instant) -> Tick {
        let RevealState::Typing {
            token: active,
            revealed,
            total,
            ..
        } = &mut self.state
        else {
            return Tick::Stale;
        };
        if *active != token {
            return Tick::Stale;
        }
        if let Some(last) = self.last_advance {
            if now.saturating_duration_since(last) < self.min_interval {
                return Tick::Waiting;
            }
        }

        if *revealed < *total {
            *revealed += 1;
            self.last_advance = Some(now);
            Tick::Advanced(*revealed)
        } else {
            self.state = RevealState::Idle;
            self.last_advance = None;
            Tick::Finished {
                scroll_after: self.scroll_delay,
            }
        }
    }

    /// Abandon any reveal in progress; its driver exits on the next frame
    pub fn stop(&mut self) {
        self.state = RevealState::Idle;
        self.last_advance = None;
    }

    pub fn state(&self) -> &RevealState {
        &self.state
    }

    pub fn is_typing(&self) -> bool {
        matches!(self.state, RevealState::Typing { .. })
    }

    /// Index of the message currently being revealed
    pub fn active_index(&self) -> Option<usize> {
        match self.state {
            RevealState::Typing { message_index, .. } => Some(message_index),
            RevealState::Idle => None,
        }
    }

    /// Text to display for a message: a prefix while it is being revealed,
    /// the full stored text otherwise
    pub fn visible_text<'a>(&self, message_index: usize, full: &'a str) -> &'a str {
        self.state.visible_text(message_index, full)
    }
}

impl RevealState {
    /// Whether `message_index` is the message currently being typed
    pub fn is_typing(&self, message_index: usize) -> bool {
        matches!(self, RevealState::Typing { message_index: active, .. } if *active == message_index)
    }

    pub fn visible_text<'a>(&self, message_index: usize, full: &'a str) -> &'a str {
        match *self {
            RevealState::Typing {
                message_index: active,
                revealed,
                ..
            } if active == message_index => match full.char_indices().nth(revealed) {
                Some((byte, _)) => &full[..byte],
                None => full,
            },
            _ => full,
        }
    }
}

pub type SharedTypewriter = Arc<Mutex<Typewriter>>;

/// Drive a reveal at `frame_interval` until it finishes or is superseded.
///
/// Emits `Revealed` per character and `ScrollToBottom` once, after the
/// configured delay, when the reveal completes.
pub fn spawn_reveal(
    typewriter: SharedTypewriter,
    token: RevealToken,
    message_index: usize,
    frame_interval: Duration,
    events: EventSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut frames = tokio::time::interval(frame_interval);
        frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            let now = frames.tick().await;
            let outcome = match typewriter.lock() {
                Ok(mut tw) => tw.tick(token, now),
                Err(e) => {
                    tracing::error!(error = %e, "Typewriter mutex poisoned, stopping reveal");
                    return;
                }
            };

            match outcome {
                Tick::Stale => {
                    tracing::trace!(message_index, "Reveal superseded");
                    return;
                }
                Tick::Waiting => {}
                Tick::Advanced(revealed) => events.emit(WidgetEvent::Revealed {
                    message_index,
                    revealed,
                }),
                Tick::Finished { scroll_after } => {
                    tokio::time::sleep(scroll_after).await;
                    events.emit(WidgetEvent::ScrollToBottom);
                    return;
                }
            }
        }
    })
}
