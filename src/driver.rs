//! Submit, poll, and save a single video generation job.

use crate::config::VideoConfig;
use crate::error::{is_resource_exhausted, Result, VeoGenError};
use crate::poll::{PollPolicy, Sleeper, TokioSleeper};
use crate::service::GenerativeService;
use crate::types::{extension_for_mime, GenerationRequest, Operation};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Lifecycle of a [`VideoJobDriver`] run.
///
/// `Done` and `Aborted` are terminal. Every run starts in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverState {
    /// Nothing submitted yet.
    Idle,
    /// Request accepted by the service.
    Submitted,
    /// Waiting for the operation to finish.
    Polling,
    /// Finished with at least one video.
    CompleteWithResults,
    /// Downloading and writing videos.
    Saving,
    /// Finished without usable videos.
    CompleteEmpty,
    /// Submission rejected for quota.
    SubmitFailedQuota,
    /// Submission failed for any other reason.
    SubmitFailedOther,
    /// Run ended cleanly.
    Done,
    /// Run ended with an error.
    Aborted,
}

impl DriverState {
    /// True for `Done` and `Aborted`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::Submitted => "SUBMITTED",
            Self::Polling => "POLLING",
            Self::CompleteWithResults => "COMPLETE_WITH_RESULTS",
            Self::Saving => "SAVING",
            Self::CompleteEmpty => "COMPLETE_EMPTY",
            Self::SubmitFailedQuota => "SUBMIT_FAILED_QUOTA",
            Self::SubmitFailedOther => "SUBMIT_FAILED_OTHER",
            Self::Done => "DONE",
            Self::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

/// Why a finished operation produced nothing to save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EmptyReason {
    /// The operation finished without a result payload.
    MissingResult,
    /// The result payload held no videos.
    NoArtifacts,
    /// Every video was removed by safety filters.
    Filtered {
        /// Number of filtered videos.
        count: u32,
    },
    /// The service reported the job as failed.
    OperationFailed {
        /// Server-provided message.
        message: String,
    },
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingResult => write!(f, "no result returned"),
            Self::NoArtifacts => write!(f, "no videos generated"),
            Self::Filtered { count } => {
                write!(f, "{count} video(s) removed by safety filters")
            }
            Self::OperationFailed { message } => write!(f, "operation failed: {message}"),
        }
    }
}

/// A video written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedVideo {
    /// Zero-based position in the operation result.
    pub index: usize,
    /// File the video was written to.
    pub path: PathBuf,
    /// Bytes written.
    pub size_bytes: usize,
    /// Remote URI it was fetched from, if any.
    pub uri: Option<String>,
}

/// Clean (non-error) end of a driver run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// The prompt was empty; nothing was submitted.
    MissingInput,
    /// The service refused the submission for quota.
    QuotaExceeded {
        /// Error description that matched the quota marker.
        message: String,
    },
    /// The operation finished but there was nothing to save.
    NoOutput {
        /// Why nothing was produced.
        #[serde(flatten)]
        reason: EmptyReason,
    },
    /// Videos were written to disk, in result order.
    Saved {
        /// Written files.
        videos: Vec<SavedVideo>,
    },
}

/// Drives one video generation job from submission to files on disk.
pub struct VideoJobDriver<S, C = TokioSleeper> {
    service: S,
    sleeper: C,
    config: VideoConfig,
    poll_policy: PollPolicy,
    output_dir: PathBuf,
    state: DriverState,
}

impl<S: GenerativeService> VideoJobDriver<S> {
    /// Creates a driver with default options, sleeping on the tokio timer.
    pub fn new(service: S) -> Self {
        Self {
            service,
            sleeper: TokioSleeper,
            config: VideoConfig::default(),
            poll_policy: PollPolicy::default(),
            output_dir: PathBuf::from("."),
            state: DriverState::Idle,
        }
    }
}

impl<S: GenerativeService, C: Sleeper> VideoJobDriver<S, C> {
    /// Sets the generation options.
    pub fn with_config(mut self, config: VideoConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the poll cadence.
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    /// Sets the directory videos are written to.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Replaces the sleeper used between status checks.
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> VideoJobDriver<S, T> {
        VideoJobDriver {
            service: self.service,
            sleeper,
            config: self.config,
            poll_policy: self.poll_policy,
            output_dir: self.output_dir,
            state: self.state,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Generation options in use.
    pub fn config(&self) -> &VideoConfig {
        &self.config
    }

    /// Directory videos are written to.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Runs the job for `prompt`.
    ///
    /// Missing input, quota refusals and empty results end cleanly with a
    /// [`JobOutcome`]. Any other submission failure, and any failure while
    /// polling or saving, is returned as an error and stops the run; videos
    /// after a failed save are not attempted.
    pub async fn generate(&mut self, prompt: &str) -> Result<JobOutcome> {
        self.state = DriverState::Idle;
        let result = self.run(prompt).await;
        self.state = match &result {
            Ok(_) => DriverState::Done,
            Err(_) => DriverState::Aborted,
        };
        tracing::debug!(state = %self.state, "driver finished");
        result
    }

    async fn run(&mut self, prompt: &str) -> Result<JobOutcome> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            tracing::warn!("no prompt provided, skipping video generation");
            return Ok(JobOutcome::MissingInput);
        }
        self.config.validate()?;

        let request = GenerationRequest::new(prompt, self.config);
        let operation = match self.service.submit_video(&request).await {
            Ok(operation) => operation,
            Err(err) if is_resource_exhausted(&err) => {
                self.transition(DriverState::SubmitFailedQuota);
                tracing::warn!(error = %err, "quota exhausted, video not generated");
                return Ok(JobOutcome::QuotaExceeded {
                    message: err.to_string(),
                });
            }
            Err(err) => {
                self.transition(DriverState::SubmitFailedOther);
                return Err(err);
            }
        };
        self.transition(DriverState::Submitted);
        tracing::info!(operation = %operation.name, "video generation submitted");

        let operation = self.wait_for_completion(operation).await?;

        match Self::classify(&operation) {
            Err(reason) => {
                self.transition(DriverState::CompleteEmpty);
                tracing::warn!(operation = %operation.name, %reason, "no videos to save");
                Ok(JobOutcome::NoOutput { reason })
            }
            Ok(()) => {
                self.transition(DriverState::CompleteWithResults);
                let videos = self.save_all(operation).await?;
                Ok(JobOutcome::Saved { videos })
            }
        }
    }

    async fn wait_for_completion(&mut self, mut operation: Operation) -> Result<Operation> {
        let mut attempts: u32 = 0;
        while !operation.done {
            if !self.poll_policy.allows(attempts) {
                return Err(VeoGenError::PollLimitReached { attempts });
            }
            self.transition(DriverState::Polling);
            tracing::info!(
                operation = %operation.name,
                attempt = attempts + 1,
                "video is still generating, checking again in {}s",
                self.poll_policy.interval.as_secs_f64()
            );
            self.sleeper.sleep(self.poll_policy.interval).await;
            operation = self.service.refresh_operation(&operation).await?;
            attempts = attempts.saturating_add(1);
        }
        tracing::debug!(operation = %operation.name, attempts, "operation complete");
        Ok(operation)
    }

    fn classify(operation: &Operation) -> std::result::Result<(), EmptyReason> {
        if let Some(message) = &operation.error {
            return Err(EmptyReason::OperationFailed {
                message: message.clone(),
            });
        }
        let result = operation.result.as_ref().ok_or(EmptyReason::MissingResult)?;
        if !result.artifacts.is_empty() {
            return Ok(());
        }
        if result.filtered_count > 0 {
            Err(EmptyReason::Filtered {
                count: result.filtered_count,
            })
        } else {
            Err(EmptyReason::NoArtifacts)
        }
    }

    async fn save_all(&mut self, operation: Operation) -> Result<Vec<SavedVideo>> {
        let artifacts = operation
            .result
            .map(|r| r.artifacts)
            .unwrap_or_default();
        tracing::info!(count = artifacts.len(), "generated video(s)");
        self.transition(DriverState::Saving);

        let mut saved = Vec::with_capacity(artifacts.len());
        for (index, artifact) in artifacts.into_iter().enumerate() {
            let uri = artifact.uri().map(str::to_string);
            if let Some(uri) = &uri {
                tracing::info!(index, uri = %uri, "downloading video");
            }
            let video = self.service.download(&artifact).await?;
            let path = self.output_dir.join(format!(
                "video_{index}.{}",
                extension_for_mime(&video.mime_type)
            ));
            video.save(&path).await?;
            tracing::info!(path = %path.display(), bytes = video.size(), "saved video");

            saved.push(SavedVideo {
                index,
                path,
                size_bytes: video.size(),
                uri,
            });
        }
        Ok(saved)
    }

    fn transition(&mut self, next: DriverState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "driver state");
        }
        self.state = next;
    }
}
