// ABOUTME: Seams between the widget core and its remote collaborators
// ABOUTME: Chat/suggestion API and asset host are traits so tests can swap in mocks

use crate::message::Product;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// Data Types
// =============================================================================

/// An image the user picked, held in memory until the turn is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageAttachment {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read an image from disk, guessing its MIME type from the extension
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image: {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }
}

/// Primary chat request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub query: String,
    /// User name, or the guest identifier when none is known
    pub user_id: String,
    pub domain: String,
    pub image: Option<ImageAttachment>,
}

/// Primary chat response
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    #[serde(default, deserialize_with = "null_as_default")]
    pub response: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub products: Vec<Product>,
}

/// Missing and `null` fields both read as the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Follow-up question request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuggestionRequest {
    pub user_message: String,
    pub ai_response: String,
}

/// Backend liveness report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Split the suggestion API's comma-separated string into questions
pub fn parse_questions(raw: &str) -> Vec<String> {
    raw.split(", ")
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Collaborator Traits
// =============================================================================

/// Answer generation and follow-up suggestion API
#[async_trait]
pub trait ChatBackend: Send + Sync + 'static {
    /// Generate the bot reply for a user turn
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply>;

    /// Suggest follow-up questions for a completed exchange
    async fn suggest(&self, request: SuggestionRequest) -> Result<Vec<String>>;

    /// Check that the API is reachable
    async fn health(&self) -> Result<HealthStatus> {
        anyhow::bail!("Health check not supported by this backend")
    }
}

/// External image host
#[async_trait]
pub trait AssetUploader: Send + Sync + 'static {
    /// Upload an image and return its public HTTPS URL
    async fn upload(&self, image: &ImageAttachment) -> Result<String>;
}
