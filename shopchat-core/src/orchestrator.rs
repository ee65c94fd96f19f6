// ABOUTME: Drives a user turn: background image upload, primary chat request, follow-up suggestions
// ABOUTME: A request state machine gates overlapping sends; every failure degrades to a message or a log line

use crate::{
    config::Config,
    events::{EventSender, WidgetEvent},
    message::Message,
    metrics,
    session::{Session, SessionStore},
    traits::{AssetUploader, ChatBackend, ChatReply, ChatRequest, ImageAttachment, SuggestionRequest},
    typewriter::{
        spawn_reveal, RevealState, SharedTypewriter, Typewriter, DEFAULT_FRAME_INTERVAL,
        DEFAULT_MIN_INTERVAL, DEFAULT_SCROLL_DELAY,
    },
};
use anyhow::Result;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Bot reply appended when the chat request fails
pub const FALLBACK_REPLY: &str =
    "An error occurred while connecting to the server. Please try again later.";
/// Bot reply used when the chat API answers with empty text
pub const EMPTY_REPLY: &str = "Sorry, I didn't understand that.";

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Storefront sent as `domain` with every chat request
    pub domain: String,
    /// userId sent when no user name is stored
    pub guest_id: String,
    /// Bound on the chat and suggestion requests (None = wait forever)
    pub request_timeout: Option<Duration>,
    pub upload_timeout: Option<Duration>,
    pub reveal_interval: Duration,
    pub frame_interval: Duration,
    pub scroll_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            domain: "https://klassy.com.bd/".to_string(),
            guest_id: "guest".to_string(),
            request_timeout: Some(Duration::from_secs(60)),
            upload_timeout: Some(Duration::from_secs(30)),
            reveal_interval: DEFAULT_MIN_INTERVAL,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            scroll_delay: DEFAULT_SCROLL_DELAY,
        }
    }
}

impl From<&Config> for OrchestratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            domain: config.api.domain.clone(),
            guest_id: config.api.guest_id.clone(),
            request_timeout: config.api.request_timeout(),
            upload_timeout: config.upload.timeout(),
            reveal_interval: config.widget.reveal_interval(),
            frame_interval: config.widget.frame_interval(),
            scroll_delay: config.widget.scroll_delay(),
        }
    }
}

/// Where the current turn is in its request pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    /// Primary chat request in flight; new turns are rejected
    Sending,
    /// Reply shown, follow-up suggestions still loading; a new turn may start
    AwaitingSuggestions,
}

impl RequestState {
    pub fn can_transition_to(self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Idle, Sending)
                | (AwaitingSuggestions, Sending)
                | (Sending, AwaitingSuggestions)
                | (Sending, Idle)
                | (AwaitingSuggestions, Idle)
        )
    }
}

/// Result of a send call. Failures are folded into the conversation, never returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing to send
    Skipped,
    /// Another turn's primary request is still in flight
    Rejected,
    /// Bot reply appended at `message_index` and being revealed
    Answered { message_index: usize },
    /// Chat request failed; the fallback reply was appended
    Failed,
}

impl TurnOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Rejected => "rejected",
            Self::Answered { .. } => "answered",
            Self::Failed => "failed",
        }
    }
}

struct TurnState {
    session: Session,
    request: RequestState,
    /// Incremented per accepted turn; suggestion results from older turns are dropped
    turn: u64,
    suggestions: Vec<String>,
}

impl TurnState {
    fn transition(&mut self, next: RequestState) -> bool {
        if !self.request.can_transition_to(next) {
            return false;
        }
        tracing::debug!(from = ?self.request, to = ?next, turn = self.turn, "Request state");
        self.request = next;
        true
    }
}

/// An attached image and the upload started when it was attached
struct StagedImage {
    image: ImageAttachment,
    url: Option<String>,
    upload: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct ImageSlot {
    /// Incremented per attach; late uploads for a replaced image are dropped
    generation: u64,
    staged: Option<StagedImage>,
}

impl ImageSlot {
    fn discard(&mut self) -> Option<StagedImage> {
        let mut staged = self.staged.take()?;
        if let Some(upload) = staged.upload.take() {
            upload.abort();
        }
        Some(staged)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

async fn with_timeout<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| anyhow::anyhow!("Timed out after {:?}", limit))?,
        None => fut.await,
    }
}

async fn upload_image_to_host<U: AssetUploader>(
    uploader: &U,
    image: &ImageAttachment,
    timeout: Option<Duration>,
) -> Option<String> {
    let started = Instant::now();
    let result = with_timeout(timeout, uploader.upload(image)).await;
    metrics::record_upload_duration(started.elapsed().as_secs_f64());
    match result {
        Ok(url) => {
            tracing::info!(file = %image.file_name, url = %url, "Image uploaded");
            Some(url)
        }
        Err(e) => {
            tracing::warn!(
                file = %image.file_name,
                error = %e,
                "Image upload failed, continuing without image URL"
            );
            metrics::record_request_error("upload");
            None
        }
    }
}

/// The query sent for a turn: typed text wins over a clicked suggestion
fn resolve_query(text: &str, suggestion: Option<&str>) -> Option<String> {
    if !text.trim().is_empty() {
        return Some(text.to_string());
    }
    suggestion
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Runs turns against the chat backend and keeps the session, reveal and
/// suggestion state in step
pub struct Orchestrator<B: ChatBackend, U: AssetUploader> {
    backend: Arc<B>,
    uploader: Arc<U>,
    store: SessionStore,
    state: Arc<Mutex<TurnState>>,
    typewriter: SharedTypewriter,
    suggestion_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    image: Arc<Mutex<ImageSlot>>,
    events: EventSender,
    config: OrchestratorConfig,
}

impl<B: ChatBackend, U: AssetUploader> Clone for Orchestrator<B, U> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            uploader: Arc::clone(&self.uploader),
            store: self.store.clone(),
            state: Arc::clone(&self.state),
            typewriter: Arc::clone(&self.typewriter),
            suggestion_task: Arc::clone(&self.suggestion_task),
            image: Arc::clone(&self.image),
            events: self.events.clone(),
            config: self.config.clone(),
        }
    }
}

impl<B: ChatBackend, U: AssetUploader> Orchestrator<B, U> {
    /// Create an orchestrator over the session restored from `store`
    pub fn new(
        backend: Arc<B>,
        uploader: Arc<U>,
        store: SessionStore,
        config: OrchestratorConfig,
        events: EventSender,
    ) -> Self {
        let session = store.load();
        let typewriter = Typewriter::new(config.reveal_interval, config.scroll_delay);
        Self {
            backend,
            uploader,
            store,
            state: Arc::new(Mutex::new(TurnState {
                session,
                request: RequestState::Idle,
                turn: 0,
                suggestions: Vec::new(),
            })),
            typewriter: Arc::new(Mutex::new(typewriter)),
            suggestion_task: Arc::new(Mutex::new(None)),
            image: Arc::new(Mutex::new(ImageSlot::default())),
            events,
            config,
        }
    }

    /// Attach an image to the next turn and start uploading it to the asset host.
    /// Replaces any image attached earlier.
    pub fn stage_image(&self, image: ImageAttachment) {
        let uploader = Arc::clone(&self.uploader);
        let slot = Arc::clone(&self.image);
        let timeout = self.config.upload_timeout;
        let upload_image = image.clone();

        let mut guard = lock(&self.image);
        if guard.discard().is_some() {
            tracing::debug!("Replacing previously attached image");
        }
        guard.generation += 1;
        let generation = guard.generation;

        let upload = tokio::spawn(async move {
            let url = upload_image_to_host(uploader.as_ref(), &upload_image, timeout).await;
            let mut guard = lock(&slot);
            if guard.generation != generation {
                tracing::debug!(file = %upload_image.file_name, "Dropping upload for replaced image");
                return;
            }
            if let Some(staged) = guard.staged.as_mut() {
                staged.url = url;
                staged.upload = None;
            }
        });
        guard.staged = Some(StagedImage {
            image,
            url: None,
            upload: Some(upload),
        });
    }

    /// Drop the attached image, cancelling its upload if still running
    pub fn discard_image(&self) {
        if let Some(staged) = lock(&self.image).discard() {
            tracing::debug!(file = %staged.image.file_name, "Attached image discarded");
        }
    }

    /// True when an image is attached to the next turn
    pub fn has_staged_image(&self) -> bool {
        lock(&self.image).staged.is_some()
    }

    /// Hosted URL of the attached image, once its upload has finished
    pub fn staged_image_url(&self) -> Option<String> {
        lock(&self.image)
            .staged
            .as_ref()
            .and_then(|staged| staged.url.clone())
    }

    /// Wait for the attached image's upload, if any, to finish
    pub async fn wait_for_upload(&self) {
        let upload = lock(&self.image)
            .staged
            .as_mut()
            .and_then(|staged| staged.upload.take());
        if let Some(upload) = upload {
            if let Err(e) = upload.await {
                if !e.is_cancelled() {
                    tracing::error!(error = %e, "Upload task panicked");
                }
            }
        }
    }

    /// Send typed text with the attached image, if any
    pub async fn send_turn(&self, text: &str) -> TurnOutcome {
        self.submit(text, None).await
    }

    /// Send a quick-reply suggestion. Non-blank typed text still takes precedence.
    pub async fn send_suggestion(&self, text: &str, suggestion: &str) -> TurnOutcome {
        self.submit(text, Some(suggestion)).await
    }

    async fn submit(&self, text: &str, suggestion: Option<&str>) -> TurnOutcome {
        let Some(query) = resolve_query(text, suggestion) else {
            tracing::debug!("Ignoring empty turn");
            metrics::record_turn("skipped");
            return TurnOutcome::Skipped;
        };

        let turn = {
            let mut state = lock(&self.state);
            let superseded = state.request == RequestState::AwaitingSuggestions;
            if !state.transition(RequestState::Sending) {
                tracing::info!(turn = state.turn, "Turn rejected, a request is already in flight");
                metrics::record_turn("rejected");
                return TurnOutcome::Rejected;
            }
            state.turn += 1;
            state.suggestions.clear();
            if superseded {
                if let Some(task) = lock(&self.suggestion_task).take() {
                    task.abort();
                }
            }
            state.turn
        };
        self.events.emit(WidgetEvent::PendingChanged { pending: true });

        // The image goes with this turn whether or not its upload has finished
        let (image, image_url) = match lock(&self.image).discard() {
            Some(staged) => (Some(staged.image), staged.url),
            None => (None, None),
        };

        tracing::info!(
            turn,
            query_len = query.len(),
            has_image = image.is_some(),
            has_image_url = image_url.is_some(),
            "Starting turn"
        );

        let (len, user_id) = {
            let mut state = lock(&self.state);
            self.store
                .append(&mut state.session, Message::user(query.clone(), image_url));
            let user_id = state
                .session
                .user_name()
                .unwrap_or(&self.config.guest_id)
                .to_string();
            (state.session.len(), user_id)
        };
        self.events.emit(WidgetEvent::HistoryChanged { len });

        let request = ChatRequest {
            query: query.clone(),
            user_id,
            domain: self.config.domain.clone(),
            image,
        };
        let started = Instant::now();
        let result = with_timeout(self.config.request_timeout, self.backend.chat(request)).await;
        metrics::record_request_duration(started.elapsed().as_secs_f64());

        let outcome = match result {
            Ok(reply) => self.finish_answered(turn, query, reply),
            Err(e) => self.finish_failed(turn, e),
        };
        metrics::record_turn(outcome.label());
        outcome
    }

    fn finish_answered(&self, turn: u64, query: String, reply: ChatReply) -> TurnOutcome {
        let ChatReply { response, products } = reply;
        let text = if response.is_empty() {
            EMPTY_REPLY.to_string()
        } else {
            response.clone()
        };
        let product_count = products.len();

        let message_index = {
            let mut state = lock(&self.state);
            self.store
                .append(&mut state.session, Message::bot(text.clone(), products));
            state.transition(RequestState::AwaitingSuggestions);
            state.session.len() - 1
        };
        tracing::info!(turn, message_index, product_count, "Bot reply appended");

        self.events.emit(WidgetEvent::HistoryChanged {
            len: message_index + 1,
        });
        self.start_reveal(message_index, &text);
        self.events.emit(WidgetEvent::PendingChanged { pending: false });

        self.spawn_suggestions(
            turn,
            SuggestionRequest {
                user_message: query,
                ai_response: response,
            },
        );
        TurnOutcome::Answered { message_index }
    }

    fn finish_failed(&self, turn: u64, error: anyhow::Error) -> TurnOutcome {
        tracing::warn!(turn, error = %error, "Chat request failed");
        metrics::record_request_error("chat");

        let len = {
            let mut state = lock(&self.state);
            self.store
                .append(&mut state.session, Message::bot(FALLBACK_REPLY, Vec::new()));
            state.transition(RequestState::Idle);
            state.session.len()
        };
        self.events.emit(WidgetEvent::HistoryChanged { len });
        self.events.emit(WidgetEvent::PendingChanged { pending: false });
        TurnOutcome::Failed
    }

    fn start_reveal(&self, message_index: usize, text: &str) {
        let token = lock(&self.typewriter).start(message_index, text);
        if let Some(token) = token {
            spawn_reveal(
                Arc::clone(&self.typewriter),
                token,
                message_index,
                self.config.frame_interval,
                self.events.clone(),
            );
        }
    }

    fn spawn_suggestions(&self, turn: u64, request: SuggestionRequest) {
        let backend = Arc::clone(&self.backend);
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let timeout = self.config.request_timeout;

        let task = tokio::spawn(async move {
            let result = with_timeout(timeout, backend.suggest(request)).await;

            let mut guard = lock(&state);
            if guard.turn != turn || guard.request != RequestState::AwaitingSuggestions {
                tracing::debug!(turn, current = guard.turn, "Dropping stale suggestions");
                return;
            }
            guard.transition(RequestState::Idle);
            match result {
                Ok(questions) => {
                    metrics::record_suggestions(questions.len());
                    tracing::debug!(turn, count = questions.len(), "Suggestions ready");
                    guard.suggestions = questions.clone();
                    drop(guard);
                    events.emit(WidgetEvent::SuggestionsReady { questions });
                }
                Err(e) => {
                    drop(guard);
                    tracing::warn!(turn, error = %e, "Suggestion request failed");
                    metrics::record_request_error("suggest");
                }
            }
        });

        if let Some(previous) = lock(&self.suggestion_task).replace(task) {
            previous.abort();
        }
    }

    /// Wait for the in-flight suggestion request, if any, to settle
    pub async fn settle(&self) {
        let task = lock(&self.suggestion_task).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::error!(error = %e, "Suggestion task panicked");
                }
            }
        }
    }

    /// Drop suggestions still loading for the conversation being replaced
    fn cancel_suggestions(&self, state: &mut TurnState) {
        state.turn += 1;
        state.suggestions.clear();
        if state.request == RequestState::AwaitingSuggestions {
            state.transition(RequestState::Idle);
        }
        if let Some(task) = lock(&self.suggestion_task).take() {
            task.abort();
        }
    }

    /// Reset the conversation to the welcome message
    pub fn clear_history(&self) {
        let len = {
            let mut state = lock(&self.state);
            self.store.clear(&mut state.session);
            self.cancel_suggestions(&mut state);
            state.session.len()
        };
        lock(&self.typewriter).stop();
        self.events.emit(WidgetEvent::HistoryChanged { len });
    }

    /// Store the user's name and restart the conversation with a personal greeting
    pub fn set_user_name(&self, name: &str) -> Result<()> {
        let len = {
            let mut state = lock(&self.state);
            self.store.set_user_name(&mut state.session, name)?;
            self.cancel_suggestions(&mut state);
            state.session.len()
        };
        lock(&self.typewriter).stop();
        tracing::info!("User name set");
        self.events.emit(WidgetEvent::HistoryChanged { len });
        Ok(())
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        lock(&self.state).session.clone()
    }

    pub fn suggestions(&self) -> Vec<String> {
        lock(&self.state).suggestions.clone()
    }

    pub fn request_state(&self) -> RequestState {
        lock(&self.state).request
    }

    /// True while a turn's primary request is in flight
    pub fn is_pending(&self) -> bool {
        self.request_state() == RequestState::Sending
    }

    /// Shared reveal state, for renderers that draw partial text
    pub fn typewriter(&self) -> SharedTypewriter {
        Arc::clone(&self.typewriter)
    }

    /// Copy of the reveal progress for one frame
    pub fn reveal_state(&self) -> RevealState {
        lock(&self.typewriter).state().clone()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }
}
