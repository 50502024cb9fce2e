//! Boundary to the remote generative service.

mod gemini;

pub use gemini::{GeminiClient, GeminiClientBuilder, TextModel, VideoModel};

use crate::error::Result;
use crate::types::{DownloadedVideo, GeneratedArtifact, GenerationRequest, Operation};
use async_trait::async_trait;

/// Calls the video driver and prompt source make against the remote service.
#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Sends a text instruction and returns the model's raw text answer.
    async fn generate_text(&self, instruction: &str) -> Result<String>;

    /// Submits a video generation request and returns its operation handle.
    async fn submit_video(&self, request: &GenerationRequest) -> Result<Operation>;

    /// Fetches the latest state of an operation.
    async fn refresh_operation(&self, operation: &Operation) -> Result<Operation>;

    /// Retrieves the bytes of a generated video.
    async fn download(&self, artifact: &GeneratedArtifact) -> Result<DownloadedVideo>;
}
