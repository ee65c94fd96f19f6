// ABOUTME: Headless subcommands: send a turn, print or clear history, set the user name, health check
// ABOUTME: Output goes to a caller-supplied writer so the commands are testable without a terminal

use crate::render::{plain_message, sender_label};
use anyhow::{Context, Result};
use shopchat_core::{
    AssetUploader, ChatBackend, Config, EventSender, HttpAssetUploader, HttpChatBackend,
    ImageAttachment, Message, Orchestrator, OrchestratorConfig, SessionStore, TurnOutcome,
};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub type HttpOrchestrator = Orchestrator<HttpChatBackend, HttpAssetUploader>;

/// Open the session store in the configured data directory, or in memory
pub fn open_store(config: &Config, ephemeral: bool) -> Result<SessionStore> {
    let store = if ephemeral {
        SessionStore::open_in_memory()?
    } else {
        SessionStore::new(&config.storage.path)
            .with_context(|| format!("Failed to open session store in {}", config.storage.path))?
    };
    Ok(store.with_bot_name(config.widget.bot_name.clone()))
}

/// Wire the HTTP backend and uploader into an orchestrator
pub fn build_orchestrator(
    config: &Config,
    store: SessionStore,
    events: EventSender,
) -> Result<HttpOrchestrator> {
    let backend = HttpChatBackend::new(&config.api)?;
    let uploader = HttpAssetUploader::new(&config.upload)?;
    Ok(Orchestrator::new(
        Arc::new(backend),
        Arc::new(uploader),
        store,
        OrchestratorConfig::from(config),
        events,
    ))
}

fn write_message(out: &mut impl Write, message: &Message, bot_name: &str) -> Result<()> {
    writeln!(out, "{}: {}", sender_label(message.sender, bot_name), plain_message(message))?;
    Ok(())
}

/// Send one turn and print the reply, then the follow-up suggestions unless skipped
pub async fn send<B: ChatBackend, U: AssetUploader>(
    orchestrator: &Orchestrator<B, U>,
    text: &str,
    image: Option<&Path>,
    wait_for_suggestions: bool,
    out: &mut impl Write,
) -> Result<TurnOutcome> {
    if text.trim().is_empty() {
        anyhow::bail!("Nothing to send: message text is empty");
    }
    // Attach and send happen in one command, so let the upload finish first
    if let Some(path) = image {
        orchestrator.stage_image(ImageAttachment::from_path(path).await?);
        orchestrator.wait_for_upload().await;
    }

    let outcome = orchestrator.send_turn(text).await;
    let session = orchestrator.session();
    let bot_name = orchestrator.store().bot_name().to_string();
    match outcome {
        TurnOutcome::Skipped => anyhow::bail!("Nothing to send: message text is empty"),
        TurnOutcome::Rejected => anyhow::bail!("Another message is still being answered"),
        TurnOutcome::Answered { message_index } => {
            write_message(out, &session.history()[message_index], &bot_name)?
        }
        TurnOutcome::Failed => write_message(out, session.last(), &bot_name)?,
    }

    if wait_for_suggestions && matches!(outcome, TurnOutcome::Answered { .. }) {
        orchestrator.settle().await;
        let suggestions = orchestrator.suggestions();
        if !suggestions.is_empty() {
            writeln!(out)?;
            writeln!(out, "Suggested questions:")?;
            for question in suggestions {
                writeln!(out, "  - {}", question)?;
            }
        }
    }
    Ok(outcome)
}

/// Print the stored conversation
pub fn history(store: &SessionStore, json: bool, out: &mut impl Write) -> Result<()> {
    let session = store.load();
    if json {
        let raw = serde_json::to_string_pretty(session.history())
            .context("Failed to serialize history")?;
        writeln!(out, "{}", raw)?;
        return Ok(());
    }

    if let Some(name) = session.user_name() {
        writeln!(out, "# Conversation with {}", name)?;
    }
    for message in session.history() {
        write_message(out, message, store.bot_name())?;
    }
    Ok(())
}

pub fn clear(store: &SessionStore, out: &mut impl Write) -> Result<()> {
    let mut session = store.load();
    store.clear(&mut session);
    writeln!(out, "Conversation cleared.")?;
    Ok(())
}

pub fn set_name(store: &SessionStore, name: &str, out: &mut impl Write) -> Result<()> {
    let mut session = store.load();
    store.set_user_name(&mut session, name)?;
    write_message(out, session.last(), store.bot_name())?;
    Ok(())
}

pub async fn health<B: ChatBackend>(backend: &B, out: &mut impl Write) -> Result<()> {
    let status = backend.health().await.context("Chat API is not reachable")?;
    write!(out, "status: {}", status.status)?;
    if let Some(version) = &status.version {
        write!(out, ", version: {}", version)?;
    }
    if let Some(timestamp) = &status.timestamp {
        write!(out, ", at: {}", timestamp)?;
    }
    writeln!(out)?;
    Ok(())
}
