// ABOUTME: TUI module entry point with terminal setup, teardown, and panic hook
// ABOUTME: Provides run_tui() which drives the chat panel for `shopchat tui`

pub mod app;
pub mod event;
pub mod markdown;
pub mod theme;
pub mod views;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use shopchat_core::{AssetUploader, ChatBackend, EventReceiver, ImageAttachment, Orchestrator};
use std::io;
use tokio::sync::mpsc;

use app::{AppAction, EventResult, TuiApp};
use event::TuiEvent;

/// Run the TUI application. Entry point for `shopchat tui`.
pub async fn run_tui<B, U>(orchestrator: Orchestrator<B, U>, widget_events: EventReceiver) -> Result<()>
where
    B: ChatBackend + 'static,
    U: AssetUploader + 'static,
{
    // Setup terminal
    let terminal = setup_terminal()?;

    // Run the app
    let result = run_app(terminal, orchestrator, widget_events).await;

    // Restore terminal regardless of result
    restore_terminal()?;

    result
}

/// Initialize the terminal for TUI rendering
fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    // Install panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;

    Ok(terminal)
}

/// Restore the terminal to its original state
fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// Main TUI application loop
async fn run_app<B, U>(
    mut terminal: Terminal<CrosstermBackend<io::Stdout>>,
    orchestrator: Orchestrator<B, U>,
    widget_events: EventReceiver,
) -> Result<()>
where
    B: ChatBackend + 'static,
    U: AssetUploader + 'static,
{
    let (event_tx, mut event_rx) = mpsc::channel(256);
    let (cols, rows) = crossterm::terminal::size()?;
    let mut app = TuiApp::new(
        orchestrator.store().bot_name(),
        app::cells_to_viewport(cols, rows),
    );
    app.sync(&orchestrator);
    if app.user_name.is_none() {
        app.prompt_for_name();
    }

    // Start event collection tasks
    event::spawn_event_tasks(event_tx.clone(), widget_events);

    loop {
        // Render
        terminal.draw(|frame| app.render(frame))?;

        // Handle events
        let Some(event) = event_rx.recv().await else {
            // All event senders dropped
            break;
        };
        match app.handle_event(event) {
            EventResult::Continue => {}
            EventResult::Quit => break,
            EventResult::Action(action) => {
                perform(&orchestrator, &mut app, action, &event_tx);
            }
        }
        app.sync(&orchestrator);
    }

    Ok(())
}

/// Hand an action to the orchestrator. Turns run in the background so the
/// panel keeps drawing while the reply streams in.
fn perform<B, U>(
    orchestrator: &Orchestrator<B, U>,
    app: &mut TuiApp,
    action: AppAction,
    event_tx: &mpsc::Sender<TuiEvent>,
) where
    B: ChatBackend + 'static,
    U: AssetUploader + 'static,
{
    match action {
        AppAction::Send { text } => {
            let orchestrator = orchestrator.clone();
            let tx = event_tx.clone();
            tokio::spawn(async move {
                let outcome = orchestrator.send_turn(&text).await;
                let _ = tx.send(TuiEvent::TurnFinished(outcome)).await;
            });
        }
        AppAction::AttachImage(path) => {
            let orchestrator = orchestrator.clone();
            let tx = event_tx.clone();
            tokio::spawn(async move {
                match ImageAttachment::from_path(&path).await {
                    Ok(image) => orchestrator.stage_image(image),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Could not read image");
                        let _ = tx
                            .send(TuiEvent::ImageRejected {
                                path,
                                error: format!("{:#}", e),
                            })
                            .await;
                    }
                }
            });
        }
        AppAction::DiscardImage => orchestrator.discard_image(),
        AppAction::SendSuggestion { text, suggestion } => {
            let orchestrator = orchestrator.clone();
            let tx = event_tx.clone();
            tokio::spawn(async move {
                let outcome = orchestrator.send_suggestion(&text, &suggestion).await;
                let _ = tx.send(TuiEvent::TurnFinished(outcome)).await;
            });
        }
        AppAction::SetName(name) => {
            if let Err(e) = orchestrator.set_user_name(&name) {
                tracing::warn!(error = %e, "Rejected user name");
                app.status = Some(e.to_string());
            }
        }
        AppAction::Clear => {
            orchestrator.discard_image();
            orchestrator.clear_history();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shopchat_core::testing::{MockChatBackend, MockUploader};
    use shopchat_core::{OrchestratorConfig, SessionStore};
    use std::sync::Arc;
    use std::time::Duration;

    fn orchestrator(backend: MockChatBackend) -> Orchestrator<MockChatBackend, MockUploader> {
        Orchestrator::new(
            Arc::new(backend),
            Arc::new(MockUploader::succeeding("https://cdn.example.com/x.png")),
            SessionStore::open_in_memory().unwrap(),
            OrchestratorConfig::default(),
            shopchat_core::EventSender::detached(),
        )
    }

    fn app() -> TuiApp {
        TuiApp::new("Klassy AI Chatbot", app::cells_to_viewport(100, 40))
    }

    #[tokio::test]
    async fn test_send_action_reports_outcome() {
        let backend = MockChatBackend::new()
            .on_query("sunscreen")
            .respond_text("Use SPF 50 daily.")
            .on_suggest()
            .respond_questions(&["Which SPF?"]);
        let orch = orchestrator(backend);
        let (tx, mut rx) = mpsc::channel(8);
        let mut app = app();

        perform(
            &orch,
            &mut app,
            AppAction::Send {
                text: "Best sunscreen?".to_string(),
            },
            &tx,
        );

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert!(matches!(
            event,
            Some(TuiEvent::TurnFinished(shopchat_core::TurnOutcome::Answered { message_index: 2 }))
        ));
        app.sync(&orch);
        assert_eq!(app.history.len(), 3);
    }

    #[tokio::test]
    async fn test_set_name_and_clear_actions() {
        let orch = orchestrator(MockChatBackend::new());
        let (tx, _rx) = mpsc::channel(8);
        let mut app = app();

        perform(&orch, &mut app, AppAction::SetName("Rumi".to_string()), &tx);
        app.sync(&orch);
        assert_eq!(app.user_name.as_deref(), Some("Rumi"));

        perform(&orch, &mut app, AppAction::Clear, &tx);
        app.sync(&orch);
        assert_eq!(app.history.len(), 1);
        assert!(app.history[0].text.contains("Rumi"));
    }

    #[tokio::test]
    async fn test_attach_image_starts_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skin.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let orch = orchestrator(MockChatBackend::new());
        let (tx, _rx) = mpsc::channel(8);
        let mut app = app();

        perform(&orch, &mut app, AppAction::AttachImage(path), &tx);
        for _ in 0..100 {
            if orch.staged_image_url().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        app.sync(&orch);
        assert!(app.image_uploaded);

        perform(&orch, &mut app, AppAction::DiscardImage, &tx);
        assert!(!orch.has_staged_image());
    }

    #[tokio::test]
    async fn test_attach_missing_image_is_reported() {
        let orch = orchestrator(MockChatBackend::new());
        let (tx, mut rx) = mpsc::channel(8);
        let mut app = app();

        let missing = std::path::PathBuf::from("/nonexistent/shopchat/face.png");
        perform(&orch, &mut app, AppAction::AttachImage(missing.clone()), &tx);

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        match event {
            Some(TuiEvent::ImageRejected { path, .. }) => assert_eq!(path, missing),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(!orch.has_staged_image());
    }

    #[tokio::test]
    async fn test_blank_name_sets_status() {
        let orch = orchestrator(MockChatBackend::new());
        let (tx, _rx) = mpsc::channel(8);
        let mut app = app();

        perform(&orch, &mut app, AppAction::SetName("   ".to_string()), &tx);
        assert!(app.status.is_some());
    }
}
