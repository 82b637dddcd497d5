//! Database row models and the memo lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// External account identifier. The chat frontend hands us numeric user ids;
/// every query is scoped by one.
pub type UserId = i64;

/// Current unix time in milliseconds, the storage form of every timestamp.
/// Integer millis keep `ORDER BY created_at` correct; RFC 3339 text with
/// variable-length fractional seconds does not sort chronologically.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CredentialRow {
    pub user_id: UserId,
    /// Argon2id PHC string (salt, parameters and hash in one string).
    pub password_hash: String,
    /// Hex-encoded 16-byte Argon2id salt for vault key derivation (not secret).
    pub vault_salt: String,
    /// Unix milliseconds.
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemoRow {
    pub id: String,
    pub user_id: UserId,
    pub status: String, // MemoStatus as string
    /// Encrypted (vault) audio payload, base64 of `[nonce | ciphertext+tag]`
    pub audio_enc: Option<String>,
    /// Encrypted (vault) transcript text
    pub transcript_enc: Option<String>,
    /// Encrypted (vault) summary text
    pub summary_enc: Option<String>,
    /// Unix milliseconds.
    pub created_at: i64,
    pub updated_at: i64,
}

/// Lifecycle states of a memo. Stored as lowercase strings in the `status`
/// column; `Deleted` rows are tombstones whose payload columns are NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoStatus {
    Stored,
    Transcribing,
    Transcribed,
    Summarizing,
    Summarized,
    Deleted,
}

impl MemoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoStatus::Stored => "stored",
            MemoStatus::Transcribing => "transcribing",
            MemoStatus::Transcribed => "transcribed",
            MemoStatus::Summarizing => "summarizing",
            MemoStatus::Summarized => "summarized",
            MemoStatus::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stored" => Some(MemoStatus::Stored),
            "transcribing" => Some(MemoStatus::Transcribing),
            "transcribed" => Some(MemoStatus::Transcribed),
            "summarizing" => Some(MemoStatus::Summarizing),
            "summarized" => Some(MemoStatus::Summarized),
            "deleted" => Some(MemoStatus::Deleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for MemoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata-only view of a memo for listings. Never carries ciphertext, so
/// building one requires no vault key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoSummary {
    pub id: String,
    pub status: MemoStatus,
    pub created_at: DateTime<Utc>,
    pub has_transcript: bool,
    pub has_summary: bool,
}

impl From<&MemoRow> for MemoSummary {
    fn from(row: &MemoRow) -> Self {
        MemoSummary {
            id: row.id.clone(),
            // An unknown status from a future schema version reads as stored.
            status: MemoStatus::parse(&row.status).unwrap_or(MemoStatus::Stored),
            created_at: DateTime::from_timestamp_millis(row.created_at)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            has_transcript: row.transcript_enc.is_some(),
            has_summary: row.summary_enc.is_some(),
        }
    }
}
