//! Typed configuration for the vault core. How a host populates it (config
//! file, environment, flags) is the host's business.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Base URL of the speech service (trailing slash optional).
    pub base_url: String,
    /// Bearer token presented on every provider request.
    pub api_token: String,
    /// Per-request timeout for provider calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Language hint forwarded with transcription requests, when set.
    #[serde(default)]
    pub language_hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// SQLite database file; created on first open.
    pub db_path: PathBuf,
    /// Seconds of inactivity before a session auto-locks. 0 disables.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    pub provider: ProviderSettings,
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("voicevault.db"),
            idle_timeout_secs: default_idle_timeout_secs(),
            provider: ProviderSettings {
                base_url: "http://127.0.0.1:8900".into(),
                api_token: String::new(),
                request_timeout_secs: default_request_timeout_secs(),
                language_hint: None,
            },
        }
    }
}
