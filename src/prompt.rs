//! Where the video prompt comes from.

use crate::config::VIDEO_PROMPT_ENV;
use crate::error::Result;
use crate::service::GenerativeService;

/// Instruction sent to the text model when writing a prompt.
pub const DEFAULT_PROMPT_INSTRUCTION: &str = "\
Write a JSON-style cinematic video prompt about a couple in their 30s.
The scene should feel romantic, passionate, and sensual,
but must avoid explicit sexual or adult content.
Focus on emotions, atmosphere, closeness, and cinematic style.
Include keys: title, style, camera, lighting, description.";

/// Produces the text prompt for a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSource {
    /// Ask the text model to write a prompt from a fixed instruction.
    Dynamic {
        /// Instruction sent to the model.
        instruction: String,
    },
    /// Read a pre-written prompt from an environment variable.
    Environment {
        /// Variable name.
        var: String,
    },
    /// Use the given text as-is.
    Literal(String),
}

impl Default for PromptSource {
    fn default() -> Self {
        Self::dynamic()
    }
}

impl PromptSource {
    /// Dynamic source using [`DEFAULT_PROMPT_INSTRUCTION`].
    pub fn dynamic() -> Self {
        Self::Dynamic {
            instruction: DEFAULT_PROMPT_INSTRUCTION.to_string(),
        }
    }

    /// Environment source reading `VIDEO_PROMPT`.
    pub fn environment() -> Self {
        Self::Environment {
            var: VIDEO_PROMPT_ENV.to_string(),
        }
    }

    /// Resolves the prompt. `Ok(None)` means no prompt is available.
    ///
    /// Text service failures are returned unchanged; there is no retry.
    pub async fn resolve<S>(&self, service: &S) -> Result<Option<String>>
    where
        S: GenerativeService + ?Sized,
    {
        self.resolve_with(service, |name| std::env::var(name).ok())
            .await
    }

    /// Like [`resolve`](Self::resolve) with an explicit variable lookup.
    pub async fn resolve_with<S>(
        &self,
        service: &S,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<String>>
    where
        S: GenerativeService + ?Sized,
    {
        let prompt = match self {
            Self::Dynamic { instruction } => {
                let text = service.generate_text(instruction).await?;
                tracing::info!(chars = text.len(), "generated prompt");
                Some(text.trim().to_string())
            }
            Self::Environment { var } => lookup(var).map(|v| v.trim().to_string()),
            Self::Literal(text) => Some(text.trim().to_string()),
        };

        Ok(prompt.filter(|p| !p.is_empty()))
    }
}
