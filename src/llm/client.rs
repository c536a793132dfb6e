//! Hosted completion API client.
//!
//! Implements the single call/response contract every generation stage
//! depends on: send a system prompt plus a user prompt (optionally with
//! binary document attachments) and get raw text back, along with token
//! usage and a truncation flag.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::error::CompletionError;

/// API version header value for the hosted messages endpoint.
const API_VERSION: &str = "2023-06-01";

/// Capability flag required when a request carries a PDF document.
const PDF_CAPABILITY: &str = "pdfs-2024-09-25";

/// Kind of binary attachment sent alongside a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    /// A PDF document. Requires the document capability flag on the call.
    Pdf,
    /// An image.
    Image,
}

/// A binary document attached to a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Kind of attachment.
    pub kind: AttachmentKind,
    /// Declared media type (e.g. "application/pdf", "image/png").
    pub media_type: String,
    /// Base64-encoded content.
    pub data: String,
}

impl Attachment {
    /// Creates a PDF attachment from raw bytes.
    pub fn pdf(bytes: &[u8]) -> Self {
        use base64::Engine as _;
        Self {
            kind: AttachmentKind::Pdf,
            media_type: "application/pdf".to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Creates an image attachment from raw bytes with the given media type.
    pub fn image(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        use base64::Engine as _;
        Self {
            kind: AttachmentKind::Image,
            media_type: media_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// A single completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt. May be empty; some stages fold all instructions into
    /// the user prompt.
    pub system_prompt: String,
    /// User prompt.
    pub user_prompt: String,
    /// Output-token ceiling for this call.
    pub max_output_tokens: u32,
    /// Binary documents accompanying the prompt.
    pub attachments: Vec<Attachment>,
}

impl CompletionRequest {
    /// Creates a new request with no attachments.
    pub fn new(
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            max_output_tokens,
            attachments: Vec::new(),
        }
    }

    /// Adds attachments to this request.
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Returns true if any attachment is a PDF document.
    pub fn has_pdf(&self) -> bool {
        self.attachments
            .iter()
            .any(|a| a.kind == AttachmentKind::Pdf)
    }
}

/// Token usage statistics for a completion call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Number of input tokens consumed.
    pub input_tokens: u32,
    /// Number of output tokens generated.
    pub output_tokens: u32,
}

/// Response from a completion call.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Raw generated text.
    pub text: String,
    /// Token usage for the call.
    pub usage: Usage,
    /// True when the response was cut off by the output-token ceiling.
    /// A truncated response will subsequently fail JSON parsing, so callers
    /// must surface this as a warning rather than swallow it.
    pub truncated: bool,
}

/// Trait for providers that can run a completion call.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Runs a single completion call. No implicit retries.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError>;
}

/// Client for the hosted messages endpoint.
pub struct HostedCompletionClient {
    api_base: String,
    api_key: Option<String>,
    model: String,
    http_client: Client,
}

impl HostedCompletionClient {
    /// Creates a new client with explicit configuration.
    ///
    /// # Arguments
    ///
    /// * `api_base` - Base URL for the API (e.g. "https://api.anthropic.com")
    /// * `api_key` - Optional API key for authentication
    /// * `model` - Model identifier to use for requests
    /// * `timeout` - Fixed per-call timeout
    pub fn new(
        api_base: String,
        api_key: Option<String>,
        model: String,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::RequestFailed(e.to_string()))?;

        Ok(Self {
            api_base,
            api_key,
            model,
            http_client,
        })
    }

    /// Creates a client from a [`PipelineConfig`].
    pub fn from_config(config: &PipelineConfig) -> Result<Self, CompletionError> {
        Self::new(
            config.api_base.clone(),
            config.api_key.clone(),
            config.model.clone(),
            config.completion_timeout,
        )
    }

    /// Creates a client from environment variables.
    ///
    /// Reads `ADFORGE_API_BASE` (required), `ADFORGE_API_KEY` (optional) and
    /// `ADFORGE_MODEL` (optional). The timeout defaults to 30 minutes.
    pub fn from_env() -> Result<Self, CompletionError> {
        let api_base = env::var("ADFORGE_API_BASE").map_err(|_| CompletionError::MissingApiBase)?;
        let api_key = env::var("ADFORGE_API_KEY").ok();
        let model = env::var("ADFORGE_MODEL")
            .unwrap_or_else(|_| PipelineConfig::default().model);

        Self::new(api_base, api_key, model, Duration::from_secs(1800))
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Get the configured model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Builds the wire-format message content for a request.
    fn build_content(request: &CompletionRequest) -> Vec<ApiContentBlock> {
        let mut blocks = Vec::with_capacity(request.attachments.len() + 1);

        for attachment in &request.attachments {
            let block_type = match attachment.kind {
                AttachmentKind::Pdf => "document",
                AttachmentKind::Image => "image",
            };
            blocks.push(ApiContentBlock::Source {
                block_type: block_type.to_string(),
                source: ApiSource {
                    source_type: "base64".to_string(),
                    media_type: attachment.media_type.clone(),
                    data: attachment.data.clone(),
                },
            });
        }

        blocks.push(ApiContentBlock::Text {
            block_type: "text".to_string(),
            text: request.user_prompt.clone(),
        });

        blocks
    }
}

/// Internal request structure for the messages API.
#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: Vec<ApiContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiContentBlock {
    Text {
        #[serde(rename = "type")]
        block_type: String,
        text: String,
    },
    Source {
        #[serde(rename = "type")]
        block_type: String,
        source: ApiSource,
    },
}

#[derive(Debug, Serialize)]
struct ApiSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

/// Internal response structure from the messages API.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// Error response from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl CompletionProvider for HostedCompletionClient {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        let has_pdf = request.has_pdf();
        let system = if request.system_prompt.is_empty() {
            None
        } else {
            Some(request.system_prompt.clone())
        };

        let api_request = ApiRequest {
            model: self.model.clone(),
            max_tokens: request.max_output_tokens,
            system,
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: Self::build_content(&request),
            }],
        };

        let url = format!("{}/v1/messages", self.api_base);
        let mut http_request = self
            .http_client
            .post(&url)
            .header("anthropic-version", API_VERSION)
            .json(&api_request);

        if let Some(api_key) = &self.api_key {
            http_request = http_request.header("x-api-key", api_key);
        }
        if has_pdf {
            http_request = http_request.header("anthropic-beta", PDF_CAPABILITY);
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| CompletionError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(CompletionError::ApiError {
                code: status.as_u16(),
                message,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::DecodeError(e.to_string()))?;

        let text: String = api_response
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .map(|block| block.text.as_str())
            .collect();

        if text.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }

        let truncated = api_response.stop_reason.as_deref() == Some("max_tokens");

        tracing::debug!(
            model = %self.model,
            input_tokens = api_response.usage.input_tokens,
            output_tokens = api_response.usage.output_tokens,
            truncated,
            "completion finished"
        );

        Ok(CompletionResponse {
            text,
            usage: Usage {
                input_tokens: api_response.usage.input_tokens,
                output_tokens: api_response.usage.output_tokens,
            },
            truncated,
        })
    }
}
