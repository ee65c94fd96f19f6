// ABOUTME: HTTP implementations of the chat backend and asset uploader over reqwest
// ABOUTME: Chat is a multipart form post; suggestions are JSON; uploads go to the image host

use crate::config::{ApiConfig, UploadConfig};
use crate::traits::{
    parse_questions, AssetUploader, ChatBackend, ChatReply, ChatRequest, HealthStatus,
    ImageAttachment, SuggestionRequest,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct QuestionsResponse {
    #[serde(default)]
    questions: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

fn image_part(image: &ImageAttachment) -> Result<multipart::Part> {
    multipart::Part::bytes(image.bytes.clone())
        .file_name(image.file_name.clone())
        .mime_str(&image.mime_type)
        .with_context(|| format!("Invalid MIME type for upload: {}", image.mime_type))
}

/// Turn a non-2xx response into an error carrying the status and body
async fn check_status(res: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    anyhow::bail!("{} failed with HTTP {}: {}", what, status, body.trim())
}

/// Chat and suggestion API client
#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    client: reqwest::Client,
    chat_url: String,
    suggest_url: String,
    health_url: String,
}

impl HttpChatBackend {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("shopchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: &ApiConfig) -> Self {
        Self {
            client,
            chat_url: config.endpoint(&config.chat_path),
            suggest_url: config.endpoint(&config.suggest_path),
            health_url: config.endpoint(&config.health_path),
        }
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply> {
        let mut form = multipart::Form::new()
            .text("query", request.query)
            .text("userId", request.user_id)
            .text("domain", request.domain);
        if let Some(image) = &request.image {
            form = form.part("image", image_part(image)?);
        }

        tracing::debug!(url = %self.chat_url, "Posting chat request");
        let res = self
            .client
            .post(&self.chat_url)
            .multipart(form)
            .send()
            .await
            .context("Chat request failed")?;
        let res = check_status(res, "Chat request").await?;
        res.json::<ChatReply>()
            .await
            .context("Failed to parse chat response")
    }

    async fn suggest(&self, request: SuggestionRequest) -> Result<Vec<String>> {
        let res = self
            .client
            .post(&self.suggest_url)
            .json(&request)
            .send()
            .await
            .context("Suggestion request failed")?;
        let res = check_status(res, "Suggestion request").await?;
        let body: QuestionsResponse = res
            .json()
            .await
            .context("Failed to parse suggestion response")?;
        Ok(body
            .questions
            .as_deref()
            .map(parse_questions)
            .unwrap_or_default())
    }

    async fn health(&self) -> Result<HealthStatus> {
        let res = self
            .client
            .get(&self.health_url)
            .send()
            .await
            .context("Health check failed")?;
        let res = check_status(res, "Health check").await?;
        res.json().await.context("Failed to parse health response")
    }
}

/// Unsigned multipart uploads to the hosted image store
#[derive(Debug, Clone)]
pub struct HttpAssetUploader {
    client: reqwest::Client,
    url: String,
    preset: String,
}

impl HttpAssetUploader {
    pub fn new(config: &UploadConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: config.url.clone(),
            preset: config.preset.clone(),
        })
    }
}

#[async_trait]
impl AssetUploader for HttpAssetUploader {
    async fn upload(&self, image: &ImageAttachment) -> Result<String> {
        let form = multipart::Form::new()
            .part("file", image_part(image)?)
            .text("upload_preset", self.preset.clone());

        let res = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .context("Upload request failed")?;
        let res = check_status(res, "Upload").await?;
        let body: UploadResponse = res.json().await.context("Failed to parse upload response")?;
        body.secure_url
            .filter(|url| !url.is_empty())
            .context("Upload response has no secure_url")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_builds_endpoint_urls() {
        let config = ApiConfig {
            base_url: "https://chat.example.com/".to_string(),
            ..ApiConfig::default()
        };
        let backend = HttpChatBackend::new(&config).unwrap();
        assert_eq!(backend.chat_url, "https://chat.example.com/chat");
        assert_eq!(
            backend.suggest_url,
            "https://chat.example.com/generate_questions"
        );
        assert_eq!(backend.health_url, "https://chat.example.com/health");
    }

    #[test]
    fn test_image_part_rejects_bad_mime() {
        let image = ImageAttachment::new("x.png", "not a mime", vec![1, 2]);
        assert!(image_part(&image).is_err());
        let image = ImageAttachment::new("x.png", "image/png", vec![1, 2]);
        assert!(image_part(&image).is_ok());
    }

    #[test]
    fn test_questions_response_tolerates_null() {
        let body: QuestionsResponse = serde_json::from_str(r#"{"questions":null}"#).unwrap();
        assert!(body.questions.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_error() {
        let config = ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..ApiConfig::default()
        };
        let backend = HttpChatBackend::new(&config).unwrap();
        let result = backend
            .suggest(SuggestionRequest {
                user_message: "hi".to_string(),
                ai_response: "hello".to_string(),
            })
            .await;
        assert!(result.is_err());
    }
}
