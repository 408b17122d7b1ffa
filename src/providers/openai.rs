//! OpenAI-compatible client for both stages: chat completions (vision) for
//! the description, image generations (gpt-image-1) for the synthesis.

use crate::config::{ApiKey, Config, DESCRIPTION_MAX_TOKENS, IMAGE_QUALITY};
use crate::error::{ReimagineError, Result, ServiceKind};
use crate::image::{GeneratedImage, GenerationMetadata};
use crate::service::{DescriptionRequest, DescriptionService, SynthesisRequest, SynthesisService};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DESCRIPTION_FALLBACK_ERROR: &str = "description request failed";
const SYNTHESIS_FALLBACK_ERROR: &str = "image generation request failed";

/// Builder for OpenAiClient.
#[derive(Debug, Clone, Default)]
pub struct OpenAiClientBuilder {
    config: Config,
    client: Option<reqwest::Client>,
}

impl OpenAiClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the API root (e.g., a proxy or a compatible server).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config = self.config.with_base_url(base_url);
        self
    }

    /// Sets the vision model used for the description.
    pub fn description_model(mut self, model: impl Into<String>) -> Self {
        self.config = self.config.with_description_model(model);
        self
    }

    /// Sets the image model used for the synthesis.
    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.config = self.config.with_image_model(model);
        self
    }

    /// Supplies a preconfigured HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds the client. The API key is not needed here; it is resolved
    /// per generation attempt.
    pub fn build(self) -> OpenAiClient {
        OpenAiClient {
            client: self.client.unwrap_or_default(),
            config: self.config,
        }
    }
}

/// HTTP client for the description and synthesis endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    config: Config,
}

impl OpenAiClient {
    /// Creates a new `OpenAiClientBuilder`.
    pub fn builder() -> OpenAiClientBuilder {
        OpenAiClientBuilder::new()
    }

    /// Current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        key: &ApiKey,
        body: &B,
    ) -> Result<(u16, String)> {
        let response = self
            .client
            .post(url)
            .bearer_auth(key.expose())
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok((status, text))
    }
}

#[async_trait]
impl DescriptionService for OpenAiClient {
    async fn describe(&self, key: &ApiKey, request: &DescriptionRequest) -> Result<String> {
        let body = ChatRequest::describe(&self.config.description_model, request);
        tracing::debug!(model = %self.config.description_model, "sending description request");

        let (status, text) = self
            .post_json(&self.config.chat_completions_url(), key, &body)
            .await?;
        parse_description_response(status, &text)
    }
}

#[async_trait]
impl SynthesisService for OpenAiClient {
    async fn synthesize(&self, key: &ApiKey, request: &SynthesisRequest) -> Result<GeneratedImage> {
        let body = ImageRequest::from_synthesis_request(&self.config.image_model, request);
        tracing::debug!(
            model = %self.config.image_model,
            size = body.size,
            "sending image generation request"
        );

        let (status, text) = self
            .post_json(&self.config.image_generations_url(), key, &body)
            .await?;

        let metadata = GenerationMetadata {
            model: Some(self.config.image_model.clone()),
            description: Some(request.description.clone()),
            duration_ms: None,
        };
        parse_image_response(status, &text, metadata)
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Extracts `error.message` from a body, if it has one.
fn error_message(text: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorEnvelope>(text)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.message)
        .filter(|message| !message.trim().is_empty())
}

fn parse_description_response(status: u16, text: &str) -> Result<String> {
    if !is_success(status) {
        let message = error_message(text).unwrap_or_else(|| DESCRIPTION_FALLBACK_ERROR.into());
        return Err(ReimagineError::service(
            ServiceKind::Description,
            Some(status),
            &message,
        ));
    }

    let response: ChatResponse = serde_json::from_str(text).map_err(|e| {
        ReimagineError::MissingData(format!("malformed description response: {e}"))
    })?;

    if let Some(error) = response.error {
        let message = error
            .message
            .unwrap_or_else(|| DESCRIPTION_FALLBACK_ERROR.into());
        return Err(ReimagineError::service(
            ServiceKind::Description,
            Some(status),
            &message,
        ));
    }

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| ReimagineError::MissingData("no description received".into()))
}

fn parse_image_response(
    status: u16,
    text: &str,
    metadata: GenerationMetadata,
) -> Result<GeneratedImage> {
    if !is_success(status) {
        let message = error_message(text).unwrap_or_else(|| SYNTHESIS_FALLBACK_ERROR.into());
        return Err(ReimagineError::service(
            ServiceKind::Synthesis,
            Some(status),
            &message,
        ));
    }

    let response: ImageResponse = serde_json::from_str(text)
        .map_err(|e| ReimagineError::MissingData(format!("malformed image response: {e}")))?;

    if let Some(error) = response.error {
        let message = error
            .message
            .unwrap_or_else(|| SYNTHESIS_FALLBACK_ERROR.into());
        return Err(ReimagineError::service(
            ServiceKind::Synthesis,
            Some(status),
            &message,
        ));
    }

    let payload = response
        .data
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|datum| datum.b64_json)
        .ok_or_else(|| ReimagineError::MissingData("no image data received".into()))?;

    GeneratedImage::from_base64(&payload, metadata)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

impl<'a> ChatRequest<'a> {
    fn describe(model: &'a str, request: &'a DescriptionRequest) -> Self {
        Self {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: request.instruction(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: &request.image_data_url,
                        },
                    },
                ],
            }],
            max_tokens: DESCRIPTION_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: String },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: String,
    size: &'static str,
    quality: &'static str,
}

impl<'a> ImageRequest<'a> {
    fn from_synthesis_request(model: &'a str, request: &SynthesisRequest) -> Self {
        Self {
            model,
            prompt: request.composed_prompt(),
            size: request.aspect.size(),
            quality: IMAGE_QUALITY,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Option<Vec<ImageDatum>>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    #[serde(default)]
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}
