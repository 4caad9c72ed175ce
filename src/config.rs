//! Studio configuration
//!
//! Read from `ATELIER_*` environment variables with defaults for every value
//! except the API key.

use std::env;
use std::time::Duration;

use crate::error::{AtelierError, Result};
use crate::layers::NEUTRAL_POSE;

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;

/// Checked in order; the first one set wins.
const API_KEY_VARS: [&str; 3] = ["ATELIER_API_KEY", "GEMINI_API_KEY", "API_KEY"];

/// Settings shared by the studio and the hosted stylist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub image_model: String,
    pub video_model: String,
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Pose used for fresh sessions and loaded outfits without a named pose
    pub default_pose: String,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            default_pose: NEUTRAL_POSE.to_string(),
        }
    }
}

impl StudioConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            api_key: API_KEY_VARS.iter().find_map(|key| non_empty(key)),
            api_url: non_empty("ATELIER_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            image_model: non_empty("ATELIER_IMAGE_MODEL").unwrap_or(defaults.image_model),
            video_model: non_empty("ATELIER_VIDEO_MODEL").unwrap_or(defaults.video_model),
            timeout_ms: parse_millis("ATELIER_TIMEOUT_MS", non_empty("ATELIER_TIMEOUT_MS"))?
                .unwrap_or(defaults.timeout_ms),
            poll_interval_ms: parse_millis(
                "ATELIER_POLL_INTERVAL_MS",
                non_empty("ATELIER_POLL_INTERVAL_MS"),
            )?
            .unwrap_or(defaults.poll_interval_ms),
            default_pose: non_empty("ATELIER_DEFAULT_POSE").unwrap_or(defaults.default_pose),
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or(AtelierError::MissingApiKey)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn parse_millis(key: &str, value: Option<String>) -> Result<Option<u64>> {
    value
        .map(|raw| {
            raw.trim().parse::<u64>().map_err(|_| AtelierError::InvalidConfig {
                key: key.to_string(),
                value: raw,
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StudioConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StudioConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert!(matches!(config.api_key(), Err(AtelierError::MissingApiKey)));
    }

    #[test]
    fn test_api_key_fallback_order() {
        let config = StudioConfig::from_lookup(lookup(&[
            ("API_KEY", "third"),
            ("GEMINI_API_KEY", "second"),
        ]))
        .unwrap();
        assert_eq!(config.api_key().unwrap(), "second");
    }

    #[test]
    fn test_overrides() {
        let config = StudioConfig::from_lookup(lookup(&[
            ("ATELIER_API_URL", "http://localhost:9000/"),
            ("ATELIER_TIMEOUT_MS", "500"),
            ("ATELIER_DEFAULT_POSE", "walking"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "http://localhost:9000");
        assert_eq!(config.timeout_ms, 500);
        assert_eq!(config.default_pose, "walking");
    }

    #[test]
    fn test_bad_number_is_rejected() {
        let err = StudioConfig::from_lookup(lookup(&[("ATELIER_POLL_INTERVAL_MS", "soon")])).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }
}
