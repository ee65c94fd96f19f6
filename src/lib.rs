// ABOUTME: Root library module for the shopchat terminal host and CLI
// ABOUTME: Re-exports the widget core and exposes command, rendering and TUI modules

pub mod cli;
pub mod commands;
pub mod logging;
pub mod render;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export the widget core modules
pub use shopchat_core::config;
pub use shopchat_core::metrics;
pub use shopchat_core::orchestrator;
pub use shopchat_core::paths;
pub use shopchat_core::session;
pub use shopchat_core::traits;

pub use shopchat_core::{Config, Orchestrator, SessionStore, TurnOutcome};
