//! vv_core - Vault session and memo lifecycle orchestration for VoiceVault
//!
//! This is the surface a front end drives: [`VoiceVault`] with
//! setup/unlock/lock/status plus the memo lifecycle (capture, retrieve,
//! transcribe, summarize, delete, list). Persistence and crypto live in
//! `vv_store` and `vv_crypto`; the speech service is injected behind
//! [`SpeechProvider`].

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod provider;
pub mod service;

pub use config::{ProviderSettings, VaultConfig};
pub use error::VaultError;
pub use provider::{HttpSpeechProvider, ProviderError, SpeechProvider, Transcription};
pub use service::{VaultStatus, VoiceVault};

pub use vv_store::models::{MemoStatus, MemoSummary, UserId};
