// ABOUTME: Scripted chat backend and uploader for deterministic tests.
// ABOUTME: Fluent builders queue replies by query pattern and record every request made.
//!
//! # Example
//!
//! ```no_run
//! use shopchat_core::testing::{MockChatBackend, MockUploader};
//!
//! let backend = MockChatBackend::new()
//!     .on_query("glowing skin").respond_text("Try X")
//!     .on_query("price").respond_error("connection refused")
//!     .on_suggest().respond_questions(&["Is X gentle?", "How often?"]);
//! let uploader = MockUploader::failing("host unreachable");
//! ```

use crate::message::Product;
use crate::traits::{
    AssetUploader, ChatBackend, ChatReply, ChatRequest, HealthStatus, ImageAttachment,
    SuggestionRequest,
};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

struct ChatExpectation {
    pattern: String,
    delay: Option<Duration>,
    reply: std::result::Result<ChatReply, String>,
}

struct SuggestExpectation {
    delay: Option<Duration>,
    reply: std::result::Result<Vec<String>, String>,
}

/// Chat backend answering from a queue of scripted expectations
#[derive(Clone, Default)]
pub struct MockChatBackend {
    chats: Arc<Mutex<VecDeque<ChatExpectation>>>,
    suggestions: Arc<Mutex<VecDeque<SuggestExpectation>>>,
    chat_requests: Arc<Mutex<Vec<ChatRequest>>>,
    suggest_requests: Arc<Mutex<Vec<SuggestionRequest>>>,
}

impl MockChatBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect a chat request whose query contains `pattern`
    pub fn on_query(self, pattern: &str) -> ChatExpectationBuilder {
        ChatExpectationBuilder {
            backend: self,
            pattern: pattern.to_string(),
            delay: None,
        }
    }

    /// Expect the next suggestion request
    pub fn on_suggest(self) -> SuggestExpectationBuilder {
        SuggestExpectationBuilder {
            backend: self,
            delay: None,
        }
    }

    /// Chat requests received so far, in order
    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        lock(&self.chat_requests).clone()
    }

    pub fn suggest_requests(&self) -> Vec<SuggestionRequest> {
        lock(&self.suggest_requests).clone()
    }

    /// Expectations that were set up but never matched
    pub fn pending_expectations(&self) -> usize {
        lock(&self.chats).len() + lock(&self.suggestions).len()
    }

    fn take_chat(&self, query: &str) -> Option<ChatExpectation> {
        let mut chats = lock(&self.chats);
        // FIFO when the front matches, otherwise the first matching one
        if chats.front().is_some_and(|e| query.contains(&e.pattern)) {
            return chats.pop_front();
        }
        chats
            .iter()
            .position(|e| query.contains(&e.pattern))
            .and_then(|i| chats.remove(i))
    }
}

pub struct ChatExpectationBuilder {
    backend: MockChatBackend,
    pattern: String,
    delay: Option<Duration>,
}

impl ChatExpectationBuilder {
    /// Wait this long before answering
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond(self, reply: ChatReply) -> MockChatBackend {
        self.push(Ok(reply))
    }

    pub fn respond_text(self, text: &str) -> MockChatBackend {
        self.respond(ChatReply {
            response: text.to_string(),
            products: Vec::new(),
        })
    }

    pub fn respond_with_products(self, text: &str, products: Vec<Product>) -> MockChatBackend {
        self.respond(ChatReply {
            response: text.to_string(),
            products,
        })
    }

    pub fn respond_error(self, message: &str) -> MockChatBackend {
        self.push(Err(message.to_string()))
    }

    fn push(self, reply: std::result::Result<ChatReply, String>) -> MockChatBackend {
        lock(&self.backend.chats).push_back(ChatExpectation {
            pattern: self.pattern,
            delay: self.delay,
            reply,
        });
        self.backend
    }
}

pub struct SuggestExpectationBuilder {
    backend: MockChatBackend,
    delay: Option<Duration>,
}

impl SuggestExpectationBuilder {
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond_questions(self, questions: &[&str]) -> MockChatBackend {
        self.push(Ok(questions.iter().map(|q| q.to_string()).collect()))
    }

    pub fn respond_error(self, message: &str) -> MockChatBackend {
        self.push(Err(message.to_string()))
    }

    fn push(self, reply: std::result::Result<Vec<String>, String>) -> MockChatBackend {
        lock(&self.backend.suggestions).push_back(SuggestExpectation {
            delay: self.delay,
            reply,
        });
        self.backend
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply> {
        let query = request.query.clone();
        lock(&self.chat_requests).push(request);

        let Some(expectation) = self.take_chat(&query) else {
            anyhow::bail!("Mock: no expectation for '{}'", query);
        };
        if let Some(delay) = expectation.delay {
            tokio::time::sleep(delay).await;
        }
        expectation.reply.map_err(anyhow::Error::msg)
    }

    async fn suggest(&self, request: SuggestionRequest) -> Result<Vec<String>> {
        lock(&self.suggest_requests).push(request);

        let expectation = lock(&self.suggestions).pop_front();
        let Some(expectation) = expectation else {
            anyhow::bail!("Mock: no suggestion expectation");
        };
        if let Some(delay) = expectation.delay {
            tokio::time::sleep(delay).await;
        }
        expectation.reply.map_err(anyhow::Error::msg)
    }

    async fn health(&self) -> Result<HealthStatus> {
        Ok(HealthStatus {
            status: "healthy".to_string(),
            timestamp: None,
            version: Some("mock".to_string()),
        })
    }
}

/// Uploader that always succeeds with a fixed URL or always fails
#[derive(Clone)]
pub struct MockUploader {
    result: std::result::Result<String, String>,
    delay: Option<Duration>,
    uploads: Arc<Mutex<Vec<String>>>,
}

impl MockUploader {
    pub fn succeeding(url: &str) -> Self {
        Self {
            result: Ok(url.to_string()),
            delay: None,
            uploads: Arc::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            delay: None,
            uploads: Arc::default(),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// File names of every image passed to `upload`
    pub fn uploads(&self) -> Vec<String> {
        lock(&self.uploads).clone()
    }
}

#[async_trait]
impl AssetUploader for MockUploader {
    async fn upload(&self, image: &ImageAttachment) -> Result<String> {
        lock(&self.uploads).push(image.file_name.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone().map_err(anyhow::Error::msg)
    }
}
