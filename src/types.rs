//! Core types for video generation.

use crate::config::VideoConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A request to generate one or more videos. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The text prompt describing the desired video.
    pub prompt: String,
    /// Options applied to the request.
    pub config: VideoConfig,
}

impl GenerationRequest {
    /// Creates a request with the given prompt and options.
    pub fn new(prompt: impl Into<String>, config: VideoConfig) -> Self {
        Self {
            prompt: prompt.into(),
            config,
        }
    }
}

/// Handle to a long-running generation job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Server-assigned operation name (e.g. `models/veo/operations/abc`).
    pub name: String,
    /// True once the server reports the job finished.
    pub done: bool,
    /// Outcome of a finished job; `None` while running or when nothing was returned.
    pub result: Option<OperationResult>,
    /// Error message reported by the server for a failed job.
    pub error: Option<String>,
}

impl Operation {
    /// Creates an operation that has not finished yet.
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            result: None,
            error: None,
        }
    }

    /// Creates a finished operation carrying the given result.
    pub fn completed(name: impl Into<String>, result: Option<OperationResult>) -> Self {
        Self {
            name: name.into(),
            done: true,
            result,
            error: None,
        }
    }

    /// Creates a finished operation that failed server-side.
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            result: None,
            error: Some(message.into()),
        }
    }
}

/// Payload of a finished operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationResult {
    /// Generated videos in the order the service returned them.
    pub artifacts: Vec<GeneratedArtifact>,
    /// Number of videos removed by safety filters.
    pub filtered_count: u32,
}

impl OperationResult {
    /// Creates a result holding the given artifacts.
    pub fn new(artifacts: Vec<GeneratedArtifact>) -> Self {
        Self {
            artifacts,
            filtered_count: 0,
        }
    }
}

/// Where the bytes of a generated video live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Remote file that must be downloaded.
    Remote {
        /// Download URI.
        uri: String,
    },
    /// Bytes returned inline with the operation.
    Inline {
        /// Decoded video bytes.
        data: Vec<u8>,
    },
}

/// Reference to a video produced by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    /// Location of the video bytes.
    pub source: ArtifactSource,
    /// MIME type, when the service reported one.
    pub mime_type: Option<String>,
}

impl GeneratedArtifact {
    /// Creates an artifact pointing at a remote URI.
    pub fn remote(uri: impl Into<String>) -> Self {
        Self {
            source: ArtifactSource::Remote { uri: uri.into() },
            mime_type: None,
        }
    }

    /// Creates an artifact whose bytes are already in memory.
    pub fn inline(data: Vec<u8>) -> Self {
        Self {
            source: ArtifactSource::Inline { data },
            mime_type: None,
        }
    }

    /// Sets the MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Remote URI, if this artifact is stored remotely.
    pub fn uri(&self) -> Option<&str> {
        match &self.source {
            ArtifactSource::Remote { uri } => Some(uri),
            ArtifactSource::Inline { .. } => None,
        }
    }

    /// File extension for this artifact, derived from its MIME type.
    pub fn extension(&self) -> &'static str {
        extension_for_mime(self.mime_type.as_deref().unwrap_or(DEFAULT_VIDEO_MIME))
    }
}

/// MIME type assumed when the service does not report one.
pub const DEFAULT_VIDEO_MIME: &str = "video/mp4";

/// Maps a video MIME type to a file extension, falling back to `mp4`.
pub fn extension_for_mime(mime: &str) -> &'static str {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        _ => "mp4",
    }
}

/// Bytes of a downloaded video.
#[derive(Debug, Clone)]
pub struct DownloadedVideo {
    /// Raw video bytes.
    pub data: Vec<u8>,
    /// MIME type (e.g., "video/mp4").
    pub mime_type: String,
}

impl DownloadedVideo {
    /// Creates a downloaded video.
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Returns the size of the video data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Writes the video to `path`, replacing any existing file.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        tokio::fs::write(path, &self.data).await?;
        Ok(())
    }
}
