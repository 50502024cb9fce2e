#![warn(missing_docs)]
//! veogen - generate short videos with Google Veo.
//!
//! A run has two steps: a [`PromptSource`] produces the prompt (written by a
//! Gemini text model, read from `VIDEO_PROMPT`, or given literally), then a
//! [`VideoJobDriver`] submits it, polls the long-running operation until it
//! finishes and writes every returned video to `video_<n>.mp4`.
//!
//! # Quick Start
//!
//! ```no_run
//! use veogen::{GeminiClient, JobOutcome, PromptSource, VideoJobDriver};
//!
//! #[tokio::main]
//! async fn main() -> veogen::Result<()> {
//!     let client = GeminiClient::builder().build()?;
//!     let Some(prompt) = PromptSource::environment().resolve(&client).await? else {
//!         println!("no prompt");
//!         return Ok(());
//!     };
//!
//!     let mut driver = VideoJobDriver::new(client);
//!     if let JobOutcome::Saved { videos } = driver.generate(&prompt).await? {
//!         for video in videos {
//!             println!("saved {}", video.path.display());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod driver;
mod error;
pub mod poll;
pub mod prompt;
pub mod service;
pub mod types;

// Re-export error types at crate root
pub use error::{is_resource_exhausted, Result, VeoGenError, RESOURCE_EXHAUSTED_MARKER};

pub use config::{AspectRatio, PersonPolicy, Resolution, Settings, VideoConfig};
pub use driver::{DriverState, EmptyReason, JobOutcome, SavedVideo, VideoJobDriver};
pub use poll::{PollPolicy, Sleeper, TokioSleeper};
pub use prompt::PromptSource;
pub use service::{GeminiClient, GeminiClientBuilder, GenerativeService, TextModel, VideoModel};
pub use types::{
    ArtifactSource, DownloadedVideo, GeneratedArtifact, GenerationRequest, Operation,
    OperationResult,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, VeoGenError};
    pub use crate::{
        GeminiClient, GenerativeService, JobOutcome, PollPolicy, PromptSource, VideoConfig,
        VideoJobDriver,
    };
}
