//! Error types for video generation.

use std::time::Duration;

/// Google RPC status name reported when a project has exhausted its quota.
pub const RESOURCE_EXHAUSTED_MARKER: &str = "RESOURCE_EXHAUSTED";

const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while generating and retrieving videos.
#[derive(Debug, thiserror::Error)]
pub enum VeoGenError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit or quota exceeded.
    #[error("rate limited ({message}), retry after {retry_after:?}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    /// Billing is not enabled for the project.
    #[error("billing required: {0}")]
    Billing(String),

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., saving a file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The service answered with something we could not interpret.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Video generation specific error.
    #[error("video generation failed: {0}")]
    VideoGeneration(String),

    /// The poll policy's attempt limit was reached before the operation finished.
    #[error("operation still running after {attempts} status checks")]
    PollLimitReached { attempts: u32 },
}

impl VeoGenError {
    /// Returns true if this error is likely transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network(_))
    }

    /// Returns the suggested retry delay, if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            Self::Network(_) => Some(Duration::from_secs(2)),
            _ => None,
        }
    }
}

/// Returns true when the error's description carries the quota marker.
///
/// The service does not expose a structured quota code through every path,
/// so this matches on the rendered message. Anything else in the message is
/// ignored.
pub fn is_resource_exhausted(err: &VeoGenError) -> bool {
    err.to_string().contains(RESOURCE_EXHAUSTED_MARKER)
}

/// Reduces a raw error body to a short, key-free message.
///
/// Google APIs answer with `{"error": {"code", "message", "status"}}`; when
/// that shape is present the status name is kept in front of the message so
/// callers can still classify it.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let extracted = serde_json::from_str::<GoogleErrorEnvelope>(text)
        .ok()
        .map(|env| match (env.error.status, env.error.message) {
            (Some(status), Some(message)) => format!("{status}: {message}"),
            (Some(status), None) => status,
            (None, Some(message)) => message,
            (None, None) => text.trim().to_string(),
        })
        .unwrap_or_else(|| text.trim().to_string());

    let redacted = redact_api_keys(&extracted);
    if redacted.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = redacted.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else {
        redacted
    }
}

/// Parses a `Retry-After` header given in whole seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn redact_api_keys(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find("key=") {
        let (head, tail) = rest.split_at(idx + "key=".len());
        out.push_str(head);
        out.push_str("[REDACTED]");
        let end = tail
            .find(|c: char| c == '&' || c == '"' || c.is_whitespace())
            .unwrap_or(tail.len());
        rest = &tail[end..];
    }
    out.push_str(rest);
    out
}

#[derive(serde::Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(serde::Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Result type alias for video generation operations.
pub type Result<T> = std::result::Result<T, VeoGenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        let rate_limited = VeoGenError::RateLimited {
            retry_after: None,
            message: "slow down".into(),
        };
        assert!(rate_limited.is_retryable());

        assert!(!VeoGenError::Auth("bad key".into()).is_retryable());
        assert!(!VeoGenError::ContentBlocked("nsfw".into()).is_retryable());
        assert!(!VeoGenError::PollLimitReached { attempts: 3 }.is_retryable());
    }

    #[test]
    fn test_retry_after() {
        let rate_limited = VeoGenError::RateLimited {
            retry_after: Some(Duration::from_secs(60)),
            message: String::new(),
        };
        assert_eq!(rate_limited.retry_after(), Some(Duration::from_secs(60)));
        assert_eq!(VeoGenError::Auth("bad".into()).retry_after(), None);
    }

    #[test]
    fn test_error_display() {
        let err = VeoGenError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = VeoGenError::PollLimitReached { attempts: 5 };
        assert_eq!(
            err.to_string(),
            "operation still running after 5 status checks"
        );
    }

    #[test]
    fn test_resource_exhausted_matches_marker_anywhere() {
        let cases = [
            "RESOURCE_EXHAUSTED",
            "429 RESOURCE_EXHAUSTED: You exceeded your current quota",
            "prefix text {'status': 'RESOURCE_EXHAUSTED'} trailing",
        ];
        for message in cases {
            let err = VeoGenError::Api {
                status: 429,
                message: message.into(),
            };
            assert!(is_resource_exhausted(&err), "expected quota for {message}");
        }

        let err = VeoGenError::RateLimited {
            retry_after: None,
            message: "RESOURCE_EXHAUSTED: quota".into(),
        };
        assert!(is_resource_exhausted(&err));
    }

    #[test]
    fn test_resource_exhausted_rejects_other_errors() {
        let err = VeoGenError::Api {
            status: 500,
            message: "INTERNAL: backend error".into(),
        };
        assert!(!is_resource_exhausted(&err));
        assert!(!is_resource_exhausted(&VeoGenError::Auth("denied".into())));
        // marker match is case sensitive
        let err = VeoGenError::Api {
            status: 429,
            message: "resource_exhausted".into(),
        };
        assert!(!is_resource_exhausted(&err));
    }

    #[test]
    fn test_sanitize_google_error_body() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded for requests", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            sanitize_error_message(body),
            "RESOURCE_EXHAUSTED: Quota exceeded for requests"
        );
    }

    #[test]
    fn test_sanitize_plain_text_and_redaction() {
        let text = "  failed GET https://host/file?alt=media&key=AIzaSECRET&x=1  ";
        assert_eq!(
            sanitize_error_message(text),
            "failed GET https://host/file?alt=media&key=[REDACTED]&x=1"
        );
    }

    #[test]
    fn test_sanitize_truncates_long_messages() {
        let text = "x".repeat(MAX_ERROR_MESSAGE_LEN + 50);
        let sanitized = sanitize_error_message(&text);
        assert_eq!(sanitized.len(), MAX_ERROR_MESSAGE_LEN + 3);
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(reqwest::header::RETRY_AFTER, "30".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(30));

        headers.insert(
            reqwest::header::RETRY_AFTER,
            "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap(),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }
}
