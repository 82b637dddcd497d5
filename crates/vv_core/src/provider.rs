//! Speech provider interface: transcription and summarization of memo audio.
//!
//! Decrypted payloads cross this boundary only on an explicit user request;
//! nothing is sent in the background. The trait keeps the lifecycle logic
//! independent of any one vendor and testable without network.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::ProviderSettings;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Provider returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// Outcome of a transcription call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    /// Language tag reported by the provider, when it offers one.
    #[serde(default)]
    pub language: Option<String>,
}

#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Convert memo audio to text.
    async fn transcribe(
        &self,
        audio: &[u8],
        language_hint: Option<&str>,
    ) -> Result<Transcription, ProviderError>;

    /// Condense a transcript into a short summary.
    async fn summarize(&self, transcript: &str) -> Result<String, ProviderError>;
}

/// Production provider backed by a single HTTP speech service: JSON bodies,
/// bearer auth, audio base64-encoded on the wire.
pub struct HttpSpeechProvider {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpSpeechProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.api_token.clone(),
        })
    }

    async fn api_error(resp: reqwest::Response) -> ProviderError {
        let status = resp.status().as_u16();
        let body: serde_json::Value = resp.json().await.unwrap_or_default();
        let message = body
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("request failed")
            .to_string();
        ProviderError::Rejected { status, message }
    }
}

#[async_trait]
impl SpeechProvider for HttpSpeechProvider {
    async fn transcribe(
        &self,
        audio: &[u8],
        language_hint: Option<&str>,
    ) -> Result<Transcription, ProviderError> {
        let url = format!("{}/v1/transcribe", self.base_url);
        let audio_b64 =
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, audio);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "audio": audio_b64,
                "encoding": "base64",
                "language": language_hint,
            }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }

        #[derive(Deserialize)]
        struct Wrap {
            text: String,
            #[serde(default)]
            language: Option<String>,
        }
        let w: Wrap = resp
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(Transcription {
            text: w.text,
            language: w.language,
        })
    }

    async fn summarize(&self, transcript: &str) -> Result<String, ProviderError> {
        let url = format!("{}/v1/summarize", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "text": transcript }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }

        #[derive(Deserialize)]
        struct Wrap {
            summary: String,
        }
        let w: Wrap = resp
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(w.summary)
    }
}
