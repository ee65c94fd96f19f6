// ABOUTME: UI-agnostic core of the shopchat conversational widget
// ABOUTME: Session persistence, reveal scheduling, carousel segmentation and turn orchestration

pub mod client;
pub mod config;
pub mod events;
pub mod layout;
pub mod message;
pub mod metrics;
pub mod orchestrator;
pub mod paths;
pub mod segment;
pub mod session;
pub mod testing;
pub mod traits;
pub mod typewriter;

pub use client::{HttpAssetUploader, HttpChatBackend};
pub use config::Config;
pub use events::{EventReceiver, EventSender, WidgetEvent};
pub use layout::{compute_layout, LayoutTracker, PanelLayout, Viewport};
pub use message::{Message, Product, Sender};
pub use orchestrator::{Orchestrator, OrchestratorConfig, RequestState, TurnOutcome};
pub use segment::{segment, SplitPoint};
pub use session::{Session, SessionStore};

// Re-export collaborator traits and their data types
pub use traits::{
    AssetUploader, ChatBackend, ChatReply, ChatRequest, HealthStatus, ImageAttachment,
    SuggestionRequest,
};
pub use typewriter::{RevealState, RevealToken, SharedTypewriter, Tick, Typewriter};
