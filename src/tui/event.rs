// ABOUTME: TUI event system merging keyboard, resize, tick and widget core events
// ABOUTME: Three async event sources feed into a single mpsc channel

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use shopchat_core::{EventReceiver, TurnOutcome, WidgetEvent};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

// =============================================================================
// TuiEvent: unified event type for the TUI event loop
// =============================================================================

#[derive(Debug)]
pub enum TuiEvent {
    /// Keyboard input from crossterm
    Key(KeyEvent),
    /// Terminal resized to the given cell dimensions
    Resize { cols: u16, rows: u16 },
    /// Periodic render tick (250ms)
    Tick,
    /// Notification from the orchestrator or reveal driver
    Widget(WidgetEvent),
    /// A spawned turn returned
    TurnFinished(TurnOutcome),
    /// The picked image could not be read
    ImageRejected { path: PathBuf, error: String },
}

// =============================================================================
// Event source spawning
// =============================================================================

/// Spawn all event source tasks. Each task sends TuiEvents to the provided channel.
pub fn spawn_event_tasks(tx: mpsc::Sender<TuiEvent>, widget_events: EventReceiver) {
    spawn_terminal_task(tx.clone());
    spawn_widget_task(tx.clone(), widget_events);
    spawn_tick_task(tx);
}

/// Spawn keyboard and resize polling task
fn spawn_terminal_task(tx: mpsc::Sender<TuiEvent>) {
    tokio::spawn(async move {
        loop {
            // crossterm event polling is blocking, run in spawn_blocking
            let event = tokio::task::spawn_blocking(|| {
                if event::poll(Duration::from_millis(50)).unwrap_or(false) {
                    event::read().ok()
                } else {
                    None
                }
            })
            .await;

            let tui_event = match event {
                Ok(Some(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    TuiEvent::Key(key)
                }
                Ok(Some(Event::Resize(cols, rows))) => TuiEvent::Resize { cols, rows },
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(tui_event).await.is_err() {
                break;
            }
        }
    });
}

/// Forward widget core notifications into the TUI loop
fn spawn_widget_task(tx: mpsc::Sender<TuiEvent>, mut widget_events: EventReceiver) {
    tokio::spawn(async move {
        while let Some(event) = widget_events.recv().await {
            if tx.send(TuiEvent::Widget(event)).await.is_err() {
                break;
            }
        }
    });
}

/// Spawn tick task for periodic re-renders
fn spawn_tick_task(tx: mpsc::Sender<TuiEvent>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(250));
        loop {
            interval.tick().await;
            if tx.send(TuiEvent::Tick).await.is_err() {
                break;
            }
        }
    });
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tui_event_debug() {
        let event = TuiEvent::Tick;
        assert_eq!(format!("{:?}", event), "Tick");
    }

    #[tokio::test]
    async fn test_widget_events_are_forwarded() {
        let (tx, mut rx) = mpsc::channel(8);
        let (widget_tx, widget_rx) = shopchat_core::events::channel();
        spawn_widget_task(tx, widget_rx);

        widget_tx.emit(WidgetEvent::ScrollToBottom);
        match rx.recv().await {
            Some(TuiEvent::Widget(WidgetEvent::ScrollToBottom)) => {}
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
