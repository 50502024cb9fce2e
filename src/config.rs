//! Generation options and environment settings.

use crate::error::{Result, VeoGenError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Environment variable holding a pre-written video prompt.
pub const VIDEO_PROMPT_ENV: &str = "VIDEO_PROMPT";
/// Environment variable overriding the API base URL.
pub const BASE_URL_ENV: &str = "GEMINI_BASE_URL";

/// Output frame shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 16:9 landscape.
    #[serde(rename = "16:9")]
    Landscape,
    /// 16:10 landscape.
    #[serde(rename = "16:10")]
    Widescreen,
    /// 9:16 portrait.
    #[default]
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    /// Returns the wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Widescreen => "16:10",
            Self::Portrait => "9:16",
        }
    }
}

/// Output resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// 480p.
    #[serde(rename = "480p")]
    Sd480,
    /// 720p.
    #[default]
    #[serde(rename = "720p")]
    Hd720,
    /// 1080p.
    #[serde(rename = "1080p")]
    Hd1080,
}

impl Resolution {
    /// Returns the wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sd480 => "480p",
            Self::Hd720 => "720p",
            Self::Hd1080 => "1080p",
        }
    }
}

/// Whether generated videos may depict people.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonPolicy {
    /// People of any age.
    #[default]
    AllowAll,
    /// Adults only.
    AllowAdult,
    /// No people.
    DontAllow,
}

impl PersonPolicy {
    /// Returns the wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllowAll => "allow_all",
            Self::AllowAdult => "allow_adult",
            Self::DontAllow => "dont_allow",
        }
    }
}

macro_rules! wire_enum_traits {
    ($ty:ty, $what:literal, [$($variant:expr),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = VeoGenError;

            fn from_str(s: &str) -> Result<Self> {
                let s = s.trim();
                [$($variant),+]
                    .into_iter()
                    .find(|v: &$ty| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| {
                        VeoGenError::InvalidRequest(format!(concat!("unsupported ", $what, ": {}"), s))
                    })
            }
        }
    };
}

wire_enum_traits!(
    AspectRatio,
    "aspect ratio",
    [AspectRatio::Landscape, AspectRatio::Widescreen, AspectRatio::Portrait]
);
wire_enum_traits!(
    Resolution,
    "resolution",
    [Resolution::Sd480, Resolution::Hd720, Resolution::Hd1080]
);
wire_enum_traits!(
    PersonPolicy,
    "person policy",
    [PersonPolicy::AllowAll, PersonPolicy::AllowAdult, PersonPolicy::DontAllow]
);

/// Fixed options applied to every video generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Frame shape.
    pub aspect_ratio: AspectRatio,
    /// Number of videos to generate (1-4).
    pub video_count: u8,
    /// Length of each video in seconds (5-8).
    pub duration_seconds: u8,
    /// Output resolution.
    pub resolution: Resolution,
    /// Person generation policy.
    pub person_policy: PersonPolicy,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::Portrait,
            video_count: 1,
            duration_seconds: 8,
            resolution: Resolution::Hd720,
            person_policy: PersonPolicy::AllowAll,
        }
    }
}

impl VideoConfig {
    /// Allowed range for `video_count`.
    pub const VIDEO_COUNT_RANGE: std::ops::RangeInclusive<u8> = 1..=4;
    /// Allowed range for `duration_seconds`.
    pub const DURATION_RANGE: std::ops::RangeInclusive<u8> = 5..=8;

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Sets how many videos to generate.
    pub fn with_video_count(mut self, count: u8) -> Self {
        self.video_count = count;
        self
    }

    /// Sets the video length in seconds.
    pub fn with_duration(mut self, secs: u8) -> Self {
        self.duration_seconds = secs;
        self
    }

    /// Sets the resolution.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets the person generation policy.
    pub fn with_person_policy(mut self, policy: PersonPolicy) -> Self {
        self.person_policy = policy;
        self
    }

    /// Checks the numeric options against the service's supported ranges.
    pub fn validate(&self) -> Result<()> {
        if !Self::VIDEO_COUNT_RANGE.contains(&self.video_count) {
            return Err(VeoGenError::InvalidRequest(format!(
                "video count must be between 1 and 4, got {}",
                self.video_count
            )));
        }
        if !Self::DURATION_RANGE.contains(&self.duration_seconds) {
            return Err(VeoGenError::InvalidRequest(format!(
                "duration must be between 5 and 8 seconds, got {}",
                self.duration_seconds
            )));
        }
        Ok(())
    }
}

/// Values read from the process environment.
#[derive(Clone, Default)]
pub struct Settings {
    /// API key used to authenticate with the service.
    pub api_key: Option<String>,
    /// Pre-written prompt, if one was supplied.
    pub video_prompt: Option<String>,
    /// Base URL override.
    pub base_url: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("video_prompt", &self.video_prompt)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through an arbitrary lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            api_key: non_empty(API_KEY_ENV),
            video_prompt: non_empty(VIDEO_PROMPT_ENV),
            base_url: non_empty(BASE_URL_ENV),
        }
    }

    /// Returns the API key or an authentication error.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| VeoGenError::Auth(format!("{API_KEY_ENV} not set and no API key provided")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_matches_fixed_request() {
        let config = VideoConfig::default();
        assert_eq!(config.aspect_ratio, AspectRatio::Portrait);
        assert_eq!(config.video_count, 1);
        assert_eq!(config.duration_seconds, 8);
        assert_eq!(config.resolution, Resolution::Hd720);
        assert_eq!(config.person_policy, PersonPolicy::AllowAll);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(VideoConfig::default().with_video_count(0).validate().is_err());
        assert!(VideoConfig::default().with_video_count(5).validate().is_err());
        assert!(VideoConfig::default().with_duration(4).validate().is_err());
        assert!(VideoConfig::default().with_duration(9).validate().is_err());
        assert!(VideoConfig::default()
            .with_video_count(4)
            .with_duration(5)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("16:10".parse::<AspectRatio>().unwrap(), AspectRatio::Widescreen);
        assert_eq!("1080P".parse::<Resolution>().unwrap(), Resolution::Hd1080);
        assert_eq!(
            "ALLOW_ADULT".parse::<PersonPolicy>().unwrap(),
            PersonPolicy::AllowAdult
        );
        let err = "4:3".parse::<AspectRatio>().unwrap_err();
        assert_eq!(err.to_string(), "invalid request: unsupported aspect ratio: 4:3");
    }

    #[test]
    fn test_config_serializes_wire_values() {
        let json = serde_json::to_value(VideoConfig::default()).unwrap();
        assert_eq!(json["aspect_ratio"], "9:16");
        assert_eq!(json["resolution"], "720p");
        assert_eq!(json["person_policy"], "allow_all");
    }

    #[test]
    fn test_settings_treat_empty_as_unset() {
        let env: HashMap<&str, &str> = [
            (API_KEY_ENV, "secret"),
            (VIDEO_PROMPT_ENV, "   "),
        ]
        .into_iter()
        .collect();
        let settings = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings.require_api_key().unwrap(), "secret");
        assert!(settings.video_prompt.is_none());
        assert!(settings.base_url.is_none());
        assert!(!format!("{settings:?}").contains("secret"));
    }

    #[test]
    fn test_settings_missing_key_is_auth_error() {
        let settings = Settings::from_lookup(|_| None);
        assert!(matches!(
            settings.require_api_key(),
            Err(VeoGenError::Auth(_))
        ));
    }
}
