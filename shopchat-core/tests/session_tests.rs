// ABOUTME: Integration tests for session persistence
// ABOUTME: Covers round-trips, the non-empty history invariant and malformed stored state

use shopchat_core::session::{HISTORY_KEY, USER_NAME_KEY};
use shopchat_core::{Message, Product, Sender, SessionStore};

fn sample_products() -> Vec<Product> {
    vec![
        Product {
            id: "7".to_string(),
            name: "Green Tea Toner".to_string(),
            image_url: "https://cdn.example.com/toner.jpg".to_string(),
            highlights: Some("Soothing, alcohol free".to_string()),
            price: Some("950TK".to_string()),
            original_price: Some("1200TK".to_string()),
            buy_link: Some("https://shop.example.com/toner".to_string()),
        },
        Product {
            id: "8".to_string(),
            name: "Sunscreen".to_string(),
            ..Default::default()
        },
    ]
}

#[test]
fn test_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path()).unwrap();
    let mut session = store.load();
    store.set_user_name(&mut session, "Nadia").unwrap();
    store.append(
        &mut session,
        Message::user("Toner for oily skin?", Some("https://img.example.com/a.png".into())),
    );
    store.append(
        &mut session,
        Message::bot("Here are some recommendations: toner", sample_products()),
    );
    store.save(&session);

    let reopened = SessionStore::new(dir.path()).unwrap();
    let loaded = reopened.load();
    assert_eq!(loaded, session);
    assert_eq!(loaded.user_name(), Some("Nadia"));
    assert_eq!(loaded.history()[2].products[0].savings(), Some(250));
}

#[test]
fn test_clear_keeps_single_bot_message() {
    let store = SessionStore::open_in_memory().unwrap();
    let mut session = store.load();
    store.append(&mut session, Message::user("hi", None));
    store.append(&mut session, Message::bot("hello", Vec::new()));

    store.clear(&mut session);
    assert_eq!(session.len(), 1);
    assert_eq!(session.last().sender, Sender::Bot);
    assert_eq!(store.load(), session);
}

#[test]
fn test_clear_greets_known_user() {
    let store = SessionStore::open_in_memory().unwrap();
    let mut session = store.load();
    store.set_user_name(&mut session, "Imran").unwrap();
    store.append(&mut session, Message::user("hi", None));

    store.clear(&mut session);
    assert!(session.last().text.starts_with("👋 Hi Imran!"));
}

#[test]
fn test_replace_all_with_empty_history_keeps_welcome() {
    let store = SessionStore::open_in_memory().unwrap();
    let mut session = store.load();
    store.replace_all(&mut session, Vec::new());
    assert_eq!(session.len(), 1);
    assert!(session.last().is_bot());

    let history = vec![Message::bot("restored", Vec::new()), Message::user("q", None)];
    store.replace_all(&mut session, history.clone());
    assert_eq!(session.history(), history.as_slice());
}

#[test]
fn test_malformed_history_is_treated_as_absent() {
    let store = SessionStore::open_in_memory().unwrap();
    for raw in ["{not json", r#"{"sender":"bot"}"#, "[]", r#"[{"sender":"robot"}]"#] {
        store.set_value(HISTORY_KEY, raw).unwrap();
        let session = store.load();
        assert_eq!(session.len(), 1, "snapshot {:?} should fall back", raw);
        assert!(session.last().is_bot());
    }
}

#[test]
fn test_browser_snapshot_is_readable() {
    let store = SessionStore::open_in_memory().unwrap();
    let raw = r#"[
        {"sender":"bot","text":"👋 Hi! I'm Klassy AI Chatbot."},
        {"sender":"user","text":"Face wash?","image":""},
        {"sender":"bot","text":"These products work well","products":[
            {"id":12,"name":"Foam","image_url":"https://cdn.example.com/f.jpg","price":"500TK"}
        ]}
    ]"#;
    store.set_value(HISTORY_KEY, raw).unwrap();
    store.set_value(USER_NAME_KEY, "Sadia").unwrap();

    let session = store.load();
    assert_eq!(session.len(), 3);
    assert_eq!(session.user_name(), Some("Sadia"));
    assert!(session.history()[1].image.is_none());
    assert_eq!(session.history()[2].products[0].id, "12");
}

#[test]
fn test_append_persists_name_and_history() {
    let store = SessionStore::open_in_memory().unwrap();
    store.set_value(USER_NAME_KEY, "Old Name").unwrap();
    let mut session = store.load();
    assert_eq!(session.user_name(), Some("Old Name"));

    store.append(&mut session, Message::user("hi", None));
    assert_eq!(
        store.get_value(USER_NAME_KEY).unwrap().as_deref(),
        Some("Old Name")
    );
    assert!(store.get_value(HISTORY_KEY).unwrap().is_some());
}
