//! Memo persistence: sealed voice-note payloads and lifecycle metadata.
//!
//! Every query here is scoped by `user_id`. A memo that exists but belongs
//! to someone else is indistinguishable from one that never existed; both
//! come back `NotFound`. Deletion tombstones the row (status `deleted`,
//! payload columns NULLed) instead of removing it, so a memo id is never
//! reused for different content.

use crate::db::Store;
use crate::error::StoreError;
use crate::models::{now_millis, MemoRow, MemoStatus, MemoSummary, UserId};
use chrono::DateTime;
use uuid::Uuid;

impl Store {
    /// Insert a freshly captured memo (audio already sealed) with status
    /// `stored`. Returns the full row including the generated id.
    pub async fn insert_memo(
        &self,
        user_id: UserId,
        audio_enc: &str,
    ) -> Result<MemoRow, StoreError> {
        let id = Uuid::new_v4().to_string();
        let now = now_millis();

        sqlx::query(
            "INSERT INTO memos (id, user_id, status, audio_enc, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(MemoStatus::Stored.as_str())
        .bind(audio_enc)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(MemoRow {
            id,
            user_id,
            status: MemoStatus::Stored.as_str().to_string(),
            audio_enc: Some(audio_enc.to_string()),
            transcript_enc: None,
            summary_enc: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Fetch one live memo owned by `user_id`. Absent ids, tombstones and
    /// other users' memos are all `NotFound`.
    pub async fn memo(&self, memo_id: &str, user_id: UserId) -> Result<MemoRow, StoreError> {
        sqlx::query_as::<_, MemoRow>(
            "SELECT id, user_id, status, audio_enc, transcript_enc, summary_enc, created_at, updated_at \
             FROM memos WHERE id = ? AND user_id = ? AND status <> ?",
        )
        .bind(memo_id)
        .bind(user_id)
        .bind(MemoStatus::Deleted.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("memo {}", memo_id)))
    }

    /// All live memos of a user, newest first. `rowid` breaks ties between
    /// memos captured within the same millisecond.
    pub async fn memos_for_user(&self, user_id: UserId) -> Result<Vec<MemoRow>, StoreError> {
        Ok(sqlx::query_as::<_, MemoRow>(
            "SELECT id, user_id, status, audio_enc, transcript_enc, summary_enc, created_at, updated_at \
             FROM memos WHERE user_id = ? AND status <> ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .bind(MemoStatus::Deleted.as_str())
        .fetch_all(&self.pool)
        .await?)
    }

    /// Metadata-only listing, newest first. The payload columns never leave
    /// the database, so no vault key is involved.
    pub async fn memo_summaries(&self, user_id: UserId) -> Result<Vec<MemoSummary>, StoreError> {
        let rows: Vec<(String, String, i64, bool, bool)> = sqlx::query_as(
            "SELECT id, status, created_at, transcript_enc IS NOT NULL, summary_enc IS NOT NULL \
             FROM memos WHERE user_id = ? AND status <> ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .bind(MemoStatus::Deleted.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, status, created_at, has_transcript, has_summary)| MemoSummary {
                id,
                status: MemoStatus::parse(&status).unwrap_or(MemoStatus::Stored),
                created_at: DateTime::from_timestamp_millis(created_at)
                    .unwrap_or(DateTime::<chrono::Utc>::MIN_UTC),
                has_transcript,
                has_summary,
            })
            .collect())
    }

    /// Store a sealed transcript and move the memo to `status`.
    pub async fn set_transcript(
        &self,
        memo_id: &str,
        user_id: UserId,
        transcript_enc: &str,
        status: MemoStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE memos SET transcript_enc = ?, status = ?, updated_at = ? WHERE id = ? AND user_id = ? AND status <> ?",
        )
        .bind(transcript_enc)
        .bind(status.as_str())
        .bind(now_millis())
        .bind(memo_id)
        .bind(user_id)
        .bind(MemoStatus::Deleted.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("memo {}", memo_id)));
        }
        Ok(())
    }

    /// Store a sealed summary and move the memo to `status`.
    pub async fn set_summary(
        &self,
        memo_id: &str,
        user_id: UserId,
        summary_enc: &str,
        status: MemoStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE memos SET summary_enc = ?, status = ?, updated_at = ? WHERE id = ? AND user_id = ? AND status <> ?",
        )
        .bind(summary_enc)
        .bind(status.as_str())
        .bind(now_millis())
        .bind(memo_id)
        .bind(user_id)
        .bind(MemoStatus::Deleted.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("memo {}", memo_id)));
        }
        Ok(())
    }

    /// Move a live memo between lifecycle states without touching payloads.
    pub async fn set_status(
        &self,
        memo_id: &str,
        user_id: UserId,
        status: MemoStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE memos SET status = ?, updated_at = ? WHERE id = ? AND user_id = ? AND status <> ?",
        )
        .bind(status.as_str())
        .bind(now_millis())
        .bind(memo_id)
        .bind(user_id)
        .bind(MemoStatus::Deleted.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("memo {}", memo_id)));
        }
        Ok(())
    }

    /// Tombstone a memo: mark it `deleted` and NULL every payload column.
    /// Irreversible; later reads of the id are `NotFound`.
    pub async fn tombstone_memo(&self, memo_id: &str, user_id: UserId) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE memos SET status = ?, audio_enc = NULL, transcript_enc = NULL, summary_enc = NULL, updated_at = ? \
             WHERE id = ? AND user_id = ? AND status <> ?",
        )
        .bind(MemoStatus::Deleted.as_str())
        .bind(now_millis())
        .bind(memo_id)
        .bind(user_id)
        .bind(MemoStatus::Deleted.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("memo {}", memo_id)));
        }
        Ok(())
    }

    /// Rewrite every payload column of one memo inside `tx` (the password
    /// change re-encryption pass).
    pub async fn reseal_memo_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        memo_id: &str,
        user_id: UserId,
        audio_enc: Option<&str>,
        transcript_enc: Option<&str>,
        summary_enc: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE memos SET audio_enc = ?, transcript_enc = ?, summary_enc = ?, updated_at = ? WHERE id = ? AND user_id = ?",
        )
        .bind(audio_enc)
        .bind(transcript_enc)
        .bind(summary_enc)
        .bind(now_millis())
        .bind(memo_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("memo {}", memo_id)));
        }
        Ok(())
    }
}
