//! Client for the remote classification model (Anthropic Messages API).
//!
//! The classification pipeline only needs one capability from the provider: send a single,
//! non-conversational user turn made of text and base64 attachments, and read back the text of
//! the reply. [`ClassificationClient`] captures that seam so the pipeline can be exercised with
//! scripted clients in tests.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Errors surfaced while talking to the classification provider.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Setup(String),
    /// Request never produced a response (connection refused, timeout, TLS).
    #[error("Request to classification service failed: {0}")]
    Transport(String),
    /// Provider answered with a non-success status.
    #[error("Classification service returned {status}: {message}")]
    Api {
        /// HTTP status code reported by the provider.
        status: u16,
        /// Error message extracted from the provider body.
        message: String,
    },
    /// Provider response could not be decoded.
    #[error("Malformed classification response: {0}")]
    InvalidResponse(String),
}

/// Base64 payload attached to a content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaSource {
    #[serde(rename = "type")]
    kind: &'static str,
    /// IANA media type of the attachment.
    pub media_type: String,
    /// Base64 encoded bytes.
    pub data: String,
}

impl MediaSource {
    /// Wrap already-encoded content.
    pub fn base64(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            kind: "base64",
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

/// One item of the user message content list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// Plain text segment.
    Text {
        /// Text sent to the model.
        text: String,
    },
    /// Raster image attachment.
    Image {
        /// Encoded image bytes.
        source: MediaSource,
    },
    /// Full document attachment (PDF).
    Document {
        /// Encoded document bytes.
        source: MediaSource,
    },
}

impl ContentBlock {
    /// Convenience constructor for a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Text carried by the block, if it is a text block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Single-turn request issued for one classification batch.
#[derive(Debug, Clone)]
pub struct MessagesRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// Response length ceiling.
    pub max_tokens: u32,
    /// System prompt describing the classifier role.
    pub system: String,
    /// Content of the single user message.
    pub content: Vec<ContentBlock>,
}

/// Interface implemented by classification providers.
#[async_trait]
pub trait ClassificationClient: Send + Sync {
    /// Send the request and return the concatenated text of the reply.
    async fn complete(&self, request: MessagesRequest) -> Result<String, ClientError>;
}

/// Build the provider client for the current configuration.
///
/// Returns `Ok(None)` when no API key is configured; callers treat that as a configuration
/// error for every file in the request.
pub fn get_classification_client(
    config: &Config,
) -> Result<Option<Arc<dyn ClassificationClient>>, ClientError> {
    let Some(api_key) = config.anthropic_api_key.clone() else {
        tracing::warn!("ANTHROPIC_API_KEY is not set; classification requests will fail");
        return Ok(None);
    };
    let client = AnthropicClient::new(
        api_key,
        config.anthropic_base_url.clone(),
        Duration::from_secs(config.anthropic_timeout_secs),
    )?;
    Ok(Some(Arc::new(client)))
}

/// HTTP client for the Anthropic Messages API.
pub struct AnthropicClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl AnthropicClient {
    /// Construct a client with a per-call timeout.
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(concat!("rusty-classify/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|error| ClientError::Setup(error.to_string()))?;
        tracing::debug!(base_url = %base_url, ?timeout, "Initialized Anthropic HTTP client");
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [ApiMessage<'a>; 1],
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a [ContentBlock],
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl ClassificationClient for AnthropicClient {
    async fn complete(&self, request: MessagesRequest) -> Result<String, ClientError> {
        let body = ApiRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            system: &request.system,
            messages: [ApiMessage {
                role: "user",
                content: &request.content,
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|error| ClientError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|error| ClientError::InvalidResponse(error.to_string()))?;

        let text: String = body
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(ClientError::InvalidResponse(
                "response contained no text content".into(),
            ));
        }

        Ok(text)
    }
}
