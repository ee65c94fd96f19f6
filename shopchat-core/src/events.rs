// ABOUTME: Notifications the widget core pushes to whichever surface renders it.
// ABOUTME: Emitted over an unbounded channel so state code never waits on the UI.

use serde::Serialize;
use tokio::sync::mpsc;

/// Events the orchestrator and reveal driver emit for the rendering surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetEvent {
    /// History was appended to, replaced or cleared
    HistoryChanged { len: usize },
    /// A turn started or finished its primary request
    PendingChanged { pending: bool },
    /// The active reveal exposed one more character
    Revealed {
        message_index: usize,
        revealed: usize,
    },
    /// Conversation view should scroll to its end
    ScrollToBottom,
    /// Follow-up questions are ready for quick-reply buttons
    SuggestionsReady { questions: Vec<String> },
}

impl WidgetEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::HistoryChanged { .. } => "history_changed",
            Self::PendingChanged { .. } => "pending_changed",
            Self::Revealed { .. } => "revealed",
            Self::ScrollToBottom => "scroll_to_bottom",
            Self::SuggestionsReady { .. } => "suggestions_ready",
        }
    }
}

pub type EventReceiver = mpsc::UnboundedReceiver<WidgetEvent>;

/// Cloneable sending half. A missing or closed receiver is not an error.
#[derive(Debug, Clone, Default)]
pub struct EventSender {
    tx: Option<mpsc::UnboundedSender<WidgetEvent>>,
}

impl EventSender {
    /// A sender that drops every event, for headless use
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: WidgetEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                tracing::trace!("Widget event receiver closed");
            }
        }
    }
}

/// Create a connected sender/receiver pair
pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx: Some(tx) }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(WidgetEvent::PendingChanged { pending: true }).unwrap();
        assert_eq!(json["type"], "pending_changed");
        assert_eq!(json["pending"], true);
    }

    #[tokio::test]
    async fn test_channel_delivers_in_order() {
        let (tx, mut rx) = channel();
        tx.emit(WidgetEvent::ScrollToBottom);
        tx.emit(WidgetEvent::HistoryChanged { len: 2 });
        assert_eq!(rx.recv().await, Some(WidgetEvent::ScrollToBottom));
        assert_eq!(
            rx.recv().await.map(|e| e.event_type()),
            Some("history_changed")
        );
    }

    #[test]
    fn test_detached_sender_drops_events() {
        let tx = EventSender::detached();
        tx.emit(WidgetEvent::ScrollToBottom);
    }
}
