use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::engine::DenyStatuses;

/// Top-level configuration. Everything except `secret` has a default.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    /// Cipher secret the token codec derives its key from.
    pub secret: String,
    /// Namespace prefix for session cache keys.
    #[serde(default = "default_token_prefix")]
    pub token_prefix: String,
    /// Seconds after issuance beyond which a token is expired; also the
    /// session cache TTL.
    #[serde(default = "default_overdue_secs")]
    pub overdue_secs: u64,
    /// 4-field tokens with a login nonce, allowing concurrent sessions per
    /// user + group. Fixed for the process lifetime.
    #[serde(default)]
    pub exclusive_login: bool,
    #[serde(default = "default_token_header")]
    pub token_header: String,
    #[serde(default = "default_platform_header")]
    pub platform_header: String,
    #[serde(default = "default_version_header")]
    pub version_header: String,
    /// Path patterns exempt from auth (see [`crate::whitelist`]).
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub deny: DenyStatuses,
    #[serde(default)]
    pub logging: LogConfig,
}

fn default_token_prefix() -> String {
    "auth_token:".to_string()
}

fn default_overdue_secs() -> u64 {
    604_800 // 7 days
}

fn default_token_header() -> String {
    "token".to_string()
}

fn default_platform_header() -> String {
    "platform".to_string()
}

fn default_version_header() -> String {
    "version".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub initial_capacity: usize,
    /// 0 disables the capacity bound.
    pub max_capacity: usize,
    /// 0 means one lane per available CPU.
    pub lanes: usize,
    pub loading: bool,
    pub record_stats: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 100,
            max_capacity: 1000,
            lanes: 0,
            loading: false,
            record_stats: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    pub use_json: bool,
    pub rotation: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "./logs".to_string(),
            file: "authgate.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
        }
    }
}

impl AuthConfig {
    /// A usable configuration from just the cipher secret; every other field
    /// takes its default.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            token_prefix: default_token_prefix(),
            overdue_secs: default_overdue_secs(),
            exclusive_login: false,
            token_header: default_token_header(),
            platform_header: default_platform_header(),
            version_header: default_version_header(),
            whitelist: Vec::new(),
            cache: CacheConfig::default(),
            deny: DenyStatuses::default(),
            logging: LogConfig::default(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config yaml: {}", path.display()))
    }
}
