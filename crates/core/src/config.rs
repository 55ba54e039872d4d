//! Sync configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`SyncConfig::api_url`].
pub const API_URL_ENV: &str = "SKILLPATH_API_URL";

/// Environment variable overriding [`SyncConfig::token`].
pub const TOKEN_ENV: &str = "SKILLPATH_TOKEN";

/// How the gate treats a topic missing from the curriculum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownTopicPolicy {
    /// Unknown topics are accessible
    #[default]
    FailOpen,
    /// Unknown topics are locked
    FailClosed,
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts per delivery, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on a single delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    5_000
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.saturating_sub(1).min(16);
        let millis = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(millis)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Remote sync settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// API server URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Path prefix in front of `/progress`
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Bearer token
    #[serde(default)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Push retry policy
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Unknown topic handling
    #[serde(default)]
    pub unknown_topic: UnknownTopicPolicy,
}

fn default_api_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_api_prefix() -> String {
    "/en/api/web".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl SyncConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Apply `SKILLPATH_API_URL` / `SKILLPATH_TOKEN` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            self.api_url = url;
        }
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            self.token = Some(token);
        }
        self
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_prefix: default_api_prefix(),
            token: None,
            timeout_secs: default_timeout_secs(),
            retry: RetryPolicy::default(),
            unknown_topic: UnknownTopicPolicy::default(),
        }
    }
}
