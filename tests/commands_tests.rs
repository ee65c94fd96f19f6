// ABOUTME: Tests for the headless subcommands against scripted backends
// ABOUTME: Verifies printed replies, suggestions, fallback output, history export and name handling

use shopchat::commands;
use shopchat_core::orchestrator::FALLBACK_REPLY;
use shopchat_core::testing::{MockChatBackend, MockUploader};
use shopchat_core::{
    EventSender, Message, Orchestrator, OrchestratorConfig, Product, SessionStore, TurnOutcome,
};
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;

fn orchestrator(
    backend: MockChatBackend,
    store: SessionStore,
) -> Orchestrator<MockChatBackend, MockUploader> {
    Orchestrator::new(
        Arc::new(backend),
        Arc::new(MockUploader::succeeding("https://cdn.example.com/upload.png")),
        store,
        OrchestratorConfig::default(),
        EventSender::detached(),
    )
}

fn output(buf: Vec<u8>) -> String {
    String::from_utf8(buf).unwrap()
}

#[tokio::test]
async fn test_send_prints_reply_and_suggestions() {
    let backend = MockChatBackend::new()
        .on_query("sunscreen")
        .respond_text("Use SPF 50 every morning.")
        .on_suggest()
        .respond_questions(&["Which SPF is best?", "Is it waterproof?"]);
    let orch = orchestrator(backend, SessionStore::open_in_memory().unwrap());

    let mut out = Vec::new();
    let outcome = commands::send(&orch, "Best sunscreen?", None, true, &mut out)
        .await
        .unwrap();

    assert_eq!(outcome, TurnOutcome::Answered { message_index: 2 });
    let text = output(out);
    assert!(text.starts_with("Klassy AI Chatbot: Use SPF 50 every morning.\n"));
    assert!(text.contains("Suggested questions:\n  - Which SPF is best?\n  - Is it waterproof?\n"));
}

#[tokio::test]
async fn test_send_without_waiting_skips_suggestions() {
    let backend = MockChatBackend::new()
        .on_query("toner")
        .respond_text("Try a rose toner.")
        .on_suggest()
        .respond_questions(&["How often?"]);
    let orch = orchestrator(backend, SessionStore::open_in_memory().unwrap());

    let mut out = Vec::new();
    commands::send(&orch, "toner?", None, false, &mut out)
        .await
        .unwrap();
    assert!(!output(out).contains("Suggested questions"));
}

#[tokio::test]
async fn test_send_failure_prints_fallback() {
    let backend = MockChatBackend::new()
        .on_query("hello")
        .respond_error("connection refused");
    let orch = orchestrator(backend, SessionStore::open_in_memory().unwrap());

    let mut out = Vec::new();
    let outcome = commands::send(&orch, "hello", None, true, &mut out)
        .await
        .unwrap();

    assert_eq!(outcome, TurnOutcome::Failed);
    assert_eq!(output(out), format!("Klassy AI Chatbot: {}\n", FALLBACK_REPLY));
}

#[tokio::test]
async fn test_send_blank_text_is_an_error() {
    let orch = orchestrator(MockChatBackend::new(), SessionStore::open_in_memory().unwrap());
    let mut out = Vec::new();
    let err = commands::send(&orch, "   ", None, true, &mut out)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("empty"));
    assert_eq!(orch.session().len(), 1);
}

#[tokio::test]
async fn test_send_with_image_uploads_and_attaches() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("skin.png");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(&[0x89, b'P', b'N', b'G'])
        .unwrap();

    let backend = MockChatBackend::new()
        .on_query("rash")
        .respond_text("That looks like mild irritation.")
        .on_suggest()
        .respond_questions(&[]);
    let orch = orchestrator(backend.clone(), SessionStore::open_in_memory().unwrap());

    let mut out = Vec::new();
    commands::send(&orch, "Is this rash normal?", Some(&path), false, &mut out)
        .await
        .unwrap();

    let requests = backend.chat_requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].image.is_some());
    assert_eq!(
        orch.session().history()[1].image.as_deref(),
        Some("https://cdn.example.com/upload.png")
    );
}

#[tokio::test]
async fn test_send_missing_image_file_is_an_error() {
    let orch = orchestrator(MockChatBackend::new(), SessionStore::open_in_memory().unwrap());
    let mut out = Vec::new();
    let missing = std::path::Path::new("/nonexistent/shopchat/image.png");
    assert!(commands::send(&orch, "look", Some(missing), true, &mut out)
        .await
        .is_err());
}

#[test]
fn test_history_prints_conversation_with_carousel() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path()).unwrap();
    let mut session = store.load();
    store.set_user_name(&mut session, "Nadia").unwrap();
    store.append(&mut session, Message::user("Dry skin help", None));
    store.append(
        &mut session,
        Message::bot(
            "Here are some recommendations: moisturize twice daily.",
            vec![Product {
                id: "9".to_string(),
                name: "Aloe Gel".to_string(),
                price: Some("450TK".to_string()),
                ..Default::default()
            }],
        ),
    );

    let mut out = Vec::new();
    commands::history(&store, false, &mut out).unwrap();
    let text = output(out);
    assert!(text.starts_with("# Conversation with Nadia\n"));
    assert!(text.contains("You: Dry skin help\n"));
    assert!(text.contains("[Recommended Products (1)]"));
    assert!(text.contains("1. Aloe Gel - 450TK"));
}

#[test]
fn test_history_json_round_trips() {
    let store = SessionStore::open_in_memory().unwrap();
    let mut session = store.load();
    store.append(&mut session, Message::user("hi", None));

    let mut out = Vec::new();
    commands::history(&store, true, &mut out).unwrap();
    let parsed: Vec<Message> = serde_json::from_slice(&out).unwrap();
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[1].text, "hi");
}

#[test]
fn test_clear_resets_to_welcome() {
    let store = SessionStore::open_in_memory().unwrap();
    let mut session = store.load();
    store.append(&mut session, Message::user("hi", None));

    let mut out = Vec::new();
    commands::clear(&store, &mut out).unwrap();
    assert_eq!(output(out), "Conversation cleared.\n");
    assert_eq!(store.load().len(), 1);
}

#[test]
fn test_set_name_prints_greeting() {
    let store = SessionStore::open_in_memory().unwrap();
    let mut out = Vec::new();
    commands::set_name(&store, "Rumi", &mut out).unwrap();
    assert!(output(out).contains("Hi Rumi!"));
    assert_eq!(store.load().user_name(), Some("Rumi"));
}

#[test]
fn test_set_blank_name_fails() {
    let store = SessionStore::open_in_memory().unwrap();
    let mut out = Vec::new();
    assert!(commands::set_name(&store, "  ", &mut out).is_err());
    assert!(store.load().user_name().is_none());
}

#[tokio::test]
async fn test_health_prints_status() {
    let mut out = Vec::new();
    commands::health(&MockChatBackend::new(), &mut out)
        .await
        .unwrap();
    assert_eq!(output(out), "status: healthy, version: mock\n");
}
