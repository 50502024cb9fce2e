//! Gemini Developer API client (text generation + Veo video generation).

use crate::config::Settings;
use crate::error::{parse_retry_after, sanitize_error_message, Result, VeoGenError};
use crate::service::GenerativeService;
use crate::types::{
    ArtifactSource, DownloadedVideo, GeneratedArtifact, GenerationRequest, Operation,
    OperationResult, DEFAULT_VIDEO_MIME,
};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Default API root for the Gemini Developer API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Text model used to write prompts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextModel {
    /// Gemini 1.5 Flash.
    #[default]
    Gemini15Flash,
    /// Gemini 2.5 Flash.
    Gemini25Flash,
}

impl TextModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini15Flash => "gemini-1.5-flash",
            Self::Gemini25Flash => "gemini-2.5-flash",
        }
    }
}

/// Veo model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VideoModel {
    /// Veo 3 Fast - lower latency, lower cost.
    #[default]
    Veo3Fast,
    /// Veo 3 - full quality.
    Veo3,
    /// Veo 3.1 Preview.
    Veo31Preview,
}

impl VideoModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Veo3Fast => "veo-3.0-fast-generate-001",
            Self::Veo3 => "veo-3.0-generate-001",
            Self::Veo31Preview => "veo-3.1-generate-preview",
        }
    }
}

/// Builder for [`GeminiClient`].
#[derive(Debug, Clone, Default)]
pub struct GeminiClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    text_model: TextModel,
    video_model: VideoModel,
}

impl GeminiClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the builder with the API key and base URL from `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.clone(),
            ..Self::default()
        }
    }

    /// Sets the API key. Falls back to `GEMINI_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the API root. Falls back to `GEMINI_BASE_URL`, then the public endpoint.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model used for prompt writing.
    pub fn text_model(mut self, model: TextModel) -> Self {
        self.text_model = model;
        self
    }

    /// Sets the Veo model variant.
    pub fn video_model(mut self, model: VideoModel) -> Self {
        self.video_model = model;
        self
    }

    /// Builds the client, resolving the API key.
    pub fn build(self) -> Result<GeminiClient> {
        let env = Settings::from_env();
        let settings = Settings {
            api_key: self.api_key.filter(|k| !k.trim().is_empty()).or(env.api_key),
            base_url: self.base_url.or(env.base_url),
            ..env
        };
        let api_key = settings.require_api_key()?.to_string();

        let base_url = settings
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(GeminiClient {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            text_model: self.text_model,
            video_model: self.video_model,
        })
    }
}

/// Client for Gemini text generation and Veo video generation.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    text_model: TextModel,
    video_model: VideoModel,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("video_model", &self.video_model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a new `GeminiClientBuilder`.
    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::new()
    }

    /// Returns the configured video model.
    pub fn video_model(&self) -> VideoModel {
        self.video_model
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        self.check_status(response).await
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let headers = response.headers().clone();
        let text = response.text().await.unwrap_or_default();
        Err(self.parse_error(status.as_u16(), &text, &headers))
    }

    async fn download_remote(&self, uri: &str) -> Result<Vec<u8>> {
        if uri.starts_with("gs://") {
            return Err(VeoGenError::VideoGeneration(format!(
                "Veo returned a Google Cloud Storage URI ({}) which cannot be downloaded with an API key. \
                 Use `gsutil cp` or the Google Cloud Storage API to download the video.",
                uri
            )));
        }

        // File URIs need the key as a query parameter as well as the header
        let url = if uri.contains('?') {
            format!("{}&key={}", uri, self.api_key)
        } else {
            format!("{}?key={}", uri, self.api_key)
        };

        // The URL carries the key, so it is stripped from transport errors
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| VeoGenError::Network(e.without_url()))?;
        let response = self.check_status(response).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VeoGenError::Network(e.without_url()))?;
        Ok(bytes.to_vec())
    }

    fn parse_error(
        &self,
        status: u16,
        text: &str,
        headers: &reqwest::header::HeaderMap,
    ) -> VeoGenError {
        if status == 402 {
            return VeoGenError::Billing(
                "Veo billing issue: enable billing at https://aistudio.google.com".into(),
            );
        }
        let text = sanitize_error_message(text);
        if status == 404 {
            return VeoGenError::InvalidRequest(format!(
                "model or operation not found ({text}). Veo requires a paid-tier API key with billing enabled."
            ));
        }
        if status == 429 {
            let retry_after = parse_retry_after(headers).map(std::time::Duration::from_secs);
            return VeoGenError::RateLimited {
                retry_after,
                message: text,
            };
        }
        if status == 401 || status == 403 {
            return VeoGenError::Auth(text);
        }
        let lower = text.to_lowercase();
        if lower.contains("safety")
            || lower.contains("blocked")
            || lower.contains("content_policy")
            || lower.contains("prohibited")
        {
            return VeoGenError::ContentBlocked(text);
        }
        VeoGenError::Api {
            status,
            message: text,
        }
    }
}

#[async_trait]
impl GenerativeService for GeminiClient {
    async fn generate_text(&self, instruction: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url,
            self.text_model.as_str()
        );
        let body = TextRequest::new(instruction);

        tracing::debug!(model = self.text_model.as_str(), "requesting prompt text");
        let response: TextResponse = self.post_json(&url, &body).await?.json().await?;
        response.into_text()
    }

    async fn submit_video(&self, request: &GenerationRequest) -> Result<Operation> {
        let url = format!(
            "{}/models/{}:predictLongRunning",
            self.base_url,
            self.video_model.as_str()
        );
        let body = VeoRequest::from_request(request);

        let operation: VeoOperationResponse = self.post_json(&url, &body).await?.json().await?;
        tracing::debug!(operation = %operation.name, "submitted video generation request");
        operation.into_operation()
    }

    async fn refresh_operation(&self, operation: &Operation) -> Result<Operation> {
        let url = format!("{}/{}", self.base_url, operation.name);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;
        let refreshed: VeoOperationResponse = self.check_status(response).await?.json().await?;
        refreshed.into_operation()
    }

    async fn download(&self, artifact: &GeneratedArtifact) -> Result<DownloadedVideo> {
        let mime_type = artifact
            .mime_type
            .clone()
            .unwrap_or_else(|| DEFAULT_VIDEO_MIME.to_string());

        let data = match &artifact.source {
            ArtifactSource::Inline { data } => data.clone(),
            ArtifactSource::Remote { uri } => {
                tracing::debug!(uri = %uri, "downloading video");
                self.download_remote(uri).await?
            }
        };

        Ok(DownloadedVideo::new(data, mime_type))
    }
}

// ── Text generation wire format ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TextRequest {
    contents: Vec<TextContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TextContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TextPart {
    #[serde(default)]
    text: Option<String>,
}

impl TextRequest {
    fn new(instruction: &str) -> Self {
        Self {
            contents: vec![TextContent {
                parts: vec![TextPart {
                    text: Some(instruction.to_string()),
                }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextResponse {
    #[serde(default)]
    candidates: Vec<TextCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct TextCandidate {
    #[serde(default)]
    content: Option<TextContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl TextResponse {
    fn into_text(self) -> Result<String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(VeoGenError::ContentBlocked(format!(
                "prompt blocked: {reason}"
            )));
        }

        let content = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| {
                VeoGenError::UnexpectedResponse("no candidates in Gemini response".into())
            })?;

        Ok(content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<String>())
    }
}

// ── Veo wire format ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoRequest {
    instances: Vec<VeoInstance>,
    parameters: VeoParameters,
}

#[derive(Debug, Serialize)]
struct VeoInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoParameters {
    aspect_ratio: &'static str,
    resolution: &'static str,
    duration_seconds: u8,
    person_generation: &'static str,
    number_of_videos: u8,
}

impl VeoRequest {
    fn from_request(req: &GenerationRequest) -> Self {
        let config = &req.config;
        Self {
            instances: vec![VeoInstance {
                prompt: req.prompt.clone(),
            }],
            parameters: VeoParameters {
                aspect_ratio: config.aspect_ratio.as_str(),
                resolution: config.resolution.as_str(),
                duration_seconds: config.duration_seconds,
                person_generation: config.person_policy.as_str(),
                number_of_videos: config.video_count,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct VeoOperationResponse {
    name: String,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    response: Option<VeoVideoResponse>,
    #[serde(default)]
    error: Option<VeoError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeoVideoResponse {
    #[serde(default)]
    generate_video_response: Option<VeoGenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeoGenerateVideoResponse {
    #[serde(default)]
    generated_samples: Option<Vec<VeoGeneratedSample>>,
    #[serde(default)]
    rai_media_filtered_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct VeoGeneratedSample {
    #[serde(default)]
    video: Option<VeoVideo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeoVideo {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VeoError {
    #[serde(default)]
    message: Option<String>,
}

impl VeoOperationResponse {
    fn into_operation(self) -> Result<Operation> {
        let done = self.done.unwrap_or(false);

        if let Some(err) = self.error {
            let message = err.message.unwrap_or_else(|| "Unknown error".into());
            return Ok(Operation::failed(self.name, message));
        }

        let result = match self.response {
            Some(resp) => Some(Self::convert_result(resp)?),
            None => None,
        };

        Ok(Operation {
            name: self.name,
            done,
            result,
            error: None,
        })
    }

    fn convert_result(resp: VeoVideoResponse) -> Result<OperationResult> {
        let Some(gen_resp) = resp.generate_video_response else {
            return Ok(OperationResult::default());
        };

        let mut artifacts = Vec::new();
        for video in gen_resp
            .generated_samples
            .unwrap_or_default()
            .into_iter()
            .filter_map(|s| s.video)
        {
            let artifact = if let Some(b64) = video.bytes_base64_encoded {
                let data = base64::engine::general_purpose::STANDARD
                    .decode(&b64)
                    .map_err(|e| VeoGenError::Decode(e.to_string()))?;
                GeneratedArtifact::inline(data)
            } else if let Some(uri) = video.uri {
                GeneratedArtifact::remote(uri)
            } else {
                tracing::warn!("generated sample carries neither a URI nor inline data");
                continue;
            };
            artifacts.push(match video.mime_type {
                Some(mime) => artifact.with_mime_type(mime),
                None => artifact,
            });
        }

        Ok(OperationResult {
            artifacts,
            filtered_count: gen_resp.rai_media_filtered_count.unwrap_or(0),
        })
    }
}
