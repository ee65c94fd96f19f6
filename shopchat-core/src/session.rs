// ABOUTME: Persistent conversation state for the widget backed by a SQLite key-value table
// ABOUTME: Owns the non-empty message history invariant and the stored user name

use crate::message::Message;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Storage key for the JSON-serialized message history
pub const HISTORY_KEY: &str = "chatHistory";
/// Storage key for the plain user name string
pub const USER_NAME_KEY: &str = "userName";
/// Assistant name used in welcome messages unless configured otherwise
pub const DEFAULT_BOT_NAME: &str = "Klassy AI Chatbot";

/// Build the bot greeting that seeds every fresh or cleared history
pub fn welcome_message(bot_name: &str, user_name: Option<&str>) -> Message {
    let text = match user_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!(
            "👋 Hi {}! I'm {}. It's great to meet you! How can I assist you today?",
            name, bot_name
        ),
        None => format!(
            "👋 Hi! I'm {}. It's great to meet you! How can I assist you today?",
            bot_name
        ),
    };
    Message::bot(text, Vec::new())
}

/// The conversation as the widget sees it.
///
/// History is append-only and never empty. All mutations go through
/// [`SessionStore`], which persists after each one.
#[derive(Debug, Clone)]
pub struct Session {
    history: Vec<Message>,
    user_name: Option<String>,
    version: u64,
}

impl Session {
    fn fresh(bot_name: &str, user_name: Option<String>) -> Self {
        Self {
            history: vec![welcome_message(bot_name, user_name.as_deref())],
            user_name,
            version: 0,
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn last(&self) -> &Message {
        // Non-empty by construction
        &self.history[self.history.len() - 1]
    }

    /// Mutation counter used to skip redundant writes
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.history == other.history && self.user_name == other.user_name
    }
}

#[derive(Clone)]
pub struct SessionStore {
    db: Arc<Mutex<Connection>>,
    bot_name: String,
    versions: Arc<Mutex<VersionTracker>>,
}

#[derive(Debug, Default)]
struct VersionTracker {
    next: u64,
    persisted: Option<u64>,
}

impl SessionStore {
    /// Open (or create) `widget.db` inside the given data directory
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir).context("Failed to create data directory")?;

        let db_path = data_dir.join("widget.db");
        let conn = Connection::open(&db_path).context("Failed to open SQLite database")?;
        let store = Self::from_connection(conn)?;

        tracing::info!(db = %db_path.display(), "SessionStore initialized");
        Ok(store)
    }

    /// In-memory store, used by tests and the `--ephemeral` CLI flag
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS widget_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create widget_state table")?;

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            bot_name: DEFAULT_BOT_NAME.to_string(),
            versions: Arc::new(Mutex::new(VersionTracker::default())),
        })
    }

    /// Override the assistant name used in welcome messages
    pub fn with_bot_name(mut self, bot_name: impl Into<String>) -> Self {
        self.bot_name = bot_name.into();
        self
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    /// Restore the persisted session, falling back to a welcome-only history.
    /// Unreadable or malformed state is treated as absent.
    pub fn load(&self) -> Session {
        let user_name = match self.get_value(USER_NAME_KEY) {
            Ok(name) => name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored user name");
                None
            }
        };

        let history = match self.get_value(HISTORY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Message>>(&raw) {
                Ok(history) if !history.is_empty() => Some(history),
                Ok(_) => {
                    tracing::debug!("Stored history is empty, using welcome message");
                    None
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Stored history is malformed, ignoring it");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored history");
                None
            }
        };

        let mut session = match history {
            Some(history) => Session {
                history,
                user_name,
                version: 0,
            },
            None => Session::fresh(&self.bot_name, user_name),
        };
        session.version = self.bump_version();

        tracing::debug!(
            messages = session.len(),
            has_user_name = session.user_name.is_some(),
            "Session loaded"
        );
        session
    }

    /// Append a message and persist
    pub fn append(&self, session: &mut Session, message: Message) {
        session.history.push(message);
        session.version = self.bump_version();
        self.save(session);
    }

    /// Replace the whole history and persist. An empty replacement becomes
    /// the welcome message so the history is never empty.
    pub fn replace_all(&self, session: &mut Session, history: Vec<Message>) {
        session.history = if history.is_empty() {
            vec![welcome_message(&self.bot_name, session.user_name())]
        } else {
            history
        };
        session.version = self.bump_version();
        self.save(session);
    }

    /// Reset history to a single welcome message addressed to the known user
    pub fn clear(&self, session: &mut Session) {
        session.history = vec![welcome_message(&self.bot_name, session.user_name())];
        session.version = self.bump_version();
        self.save(session);
        tracing::info!("Conversation history cleared");
    }

    /// Store the user's name and restart the conversation with a personal greeting
    pub fn set_user_name(&self, session: &mut Session, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("User name cannot be empty");
        }
        session.user_name = Some(name.to_string());
        session.history = vec![welcome_message(&self.bot_name, Some(name))];
        session.version = self.bump_version();
        self.save(session);
        Ok(())
    }

    /// Persist the full session snapshot. Best effort: failures are logged
    /// and never reach the caller.
    pub fn save(&self, session: &Session) {
        if self.is_persisted(session.version) {
            tracing::trace!(version = session.version, "Session unchanged, skipping save");
            return;
        }
        match self.write_snapshot(session) {
            Ok(()) => {
                if let Ok(mut versions) = self.versions.lock() {
                    versions.persisted = Some(session.version);
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to persist session"),
        }
    }

    fn write_snapshot(&self, session: &Session) -> Result<()> {
        let history_json =
            serde_json::to_string(&session.history).context("Failed to serialize history")?;
        let now = chrono::Utc::now().to_rfc3339();

        let mut db = self
            .db
            .lock()
            .map_err(|e| anyhow::anyhow!("Database mutex poisoned: {}", e))?;
        let tx = db.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO widget_state (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![HISTORY_KEY, history_json, now],
        )?;
        match session.user_name() {
            Some(name) => {
                tx.execute(
                    "INSERT OR REPLACE INTO widget_state (key, value, updated_at) VALUES (?1, ?2, ?3)",
                    params![USER_NAME_KEY, name, now],
                )?;
            }
            None => {
                tx.execute(
                    "DELETE FROM widget_state WHERE key = ?1",
                    params![USER_NAME_KEY],
                )?;
            }
        }
        tx.commit().context("Failed to commit session snapshot")?;
        Ok(())
    }

    /// Read a raw stored value
    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        let db = self
            .db
            .lock()
            .map_err(|e| anyhow::anyhow!("Database mutex poisoned: {}", e))?;
        let value = db
            .query_row(
                "SELECT value FROM widget_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Write a raw stored value
    pub fn set_value(&self, key: &str, value: &str) -> Result<()> {
        let db = self
            .db
            .lock()
            .map_err(|e| anyhow::anyhow!("Database mutex poisoned: {}", e))?;
        db.execute(
            "INSERT OR REPLACE INTO widget_state (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, chrono::Utc::now().to_rfc3339()],
        )?;
        // Raw writes bypass the snapshot, so the next save must not be skipped
        if let Ok(mut versions) = self.versions.lock() {
            versions.persisted = None;
        }
        Ok(())
    }

    fn bump_version(&self) -> u64 {
        match self.versions.lock() {
            Ok(mut versions) => {
                versions.next += 1;
                versions.next
            }
            Err(e) => {
                let mut versions = e.into_inner();
                versions.next += 1;
                versions.next
            }
        }
    }

    fn is_persisted(&self, version: u64) -> bool {
        self.versions
            .lock()
            .map(|v| v.persisted == Some(version))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_message_variants() {
        let anon = welcome_message("Bot", None);
        assert!(anon.text.starts_with("👋 Hi! I'm Bot."));
        let named = welcome_message("Bot", Some("  Rafi "));
        assert!(named.text.starts_with("👋 Hi Rafi! I'm Bot."));
        assert!(named.is_bot());
    }

    #[test]
    fn test_load_defaults_when_empty() {
        let store = SessionStore::open_in_memory().unwrap();
        let session = store.load();
        assert_eq!(session.len(), 1);
        assert!(session.last().is_bot());
        assert!(session.user_name().is_none());
    }

    #[test]
    fn test_save_skips_unchanged_version() {
        let store = SessionStore::open_in_memory().unwrap();
        let mut session = store.load();
        assert!(!store.is_persisted(session.version()));

        store.append(&mut session, Message::user("hi", None));
        let first = session.version();
        assert!(store.is_persisted(first));

        store.append(&mut session, Message::bot("hello", vec![]));
        assert!(session.version() > first);
        assert!(!store.is_persisted(first));
        assert!(store.is_persisted(session.version()));

        store.set_value("unrelated", "x").unwrap();
        assert!(!store.is_persisted(session.version()));
    }
}
