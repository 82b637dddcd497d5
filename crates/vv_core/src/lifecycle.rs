//! Memo lifecycle operations: capture, retrieve, transcribe, summarize,
//! delete, list.
//!
//! Every operation begins a gated session (fails `VaultLocked` otherwise)
//! and refreshes the inactivity timer. Provider calls are the exception to
//! the guard: they run with the guard dropped, and the session is
//! re-validated before any provider result is persisted. A session that
//! locked mid-flight discards the plaintext result and restores the memo's
//! prior status.

use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::error::VaultError;
use crate::service::VoiceVault;
use vv_store::models::{MemoStatus, MemoSummary, UserId};
use vv_store::Store;

/// Unseal one payload column. A failed authentication tag is a
/// security-relevant event (tampered ciphertext or a stale key), so it is
/// logged before surfacing as `DecryptionFailed`.
fn unseal_column(
    key: &[u8; 32],
    sealed: &str,
    memo_id: &str,
) -> Result<Zeroizing<Vec<u8>>, VaultError> {
    Store::unseal_value(key, sealed).map_err(|e| {
        let e = VaultError::from(e);
        if matches!(e, VaultError::DecryptionFailed) {
            warn!(
                "[memo] payload of memo {} failed authentication: tampering or key mismatch",
                memo_id
            );
        }
        e
    })
}

impl VoiceVault {
    /// Capture a new voice memo: seal the audio under the session key and
    /// persist it with status `stored`. Returns the new memo id.
    pub async fn capture(&self, user_id: UserId, audio: &[u8]) -> Result<String, VaultError> {
        let session = self.sessions.begin(user_id).await?;
        let sealed = Store::seal_value(session.key(), audio)?;
        let row = self.store.insert_memo(user_id, &sealed).await?;
        info!(
            "[memo] user {} captured memo {} ({} bytes)",
            user_id,
            row.id,
            audio.len()
        );
        Ok(row.id)
    }

    /// Decrypt and return a memo's audio.
    pub async fn retrieve(&self, memo_id: &str, user_id: UserId) -> Result<Vec<u8>, VaultError> {
        let session = self.sessions.begin(user_id).await?;
        let row = self.store.memo(memo_id, user_id).await?;
        let sealed = row
            .audio_enc
            .as_deref()
            .ok_or_else(|| VaultError::NotFound(format!("memo {} has no audio", memo_id)))?;
        let audio = unseal_column(session.key(), sealed, memo_id)?;
        Ok(audio.to_vec())
    }

    /// Return the memo's transcript, producing it through the speech
    /// provider on first request. Repeat calls decrypt the stored text; the
    /// provider is not called again.
    pub async fn request_transcript(
        &self,
        memo_id: &str,
        user_id: UserId,
    ) -> Result<String, VaultError> {
        // Phase 1, under the guard: return a stored transcript, or decrypt
        // the audio for the provider and mark the memo transcribing.
        let (audio, prior_status) = {
            let session = self.sessions.begin(user_id).await?;
            let row = self.store.memo(memo_id, user_id).await?;

            if let Some(sealed) = row.transcript_enc.as_deref() {
                let text = unseal_column(session.key(), sealed, memo_id)?;
                return Ok(String::from_utf8_lossy(&text).into_owned());
            }

            let sealed_audio = row
                .audio_enc
                .as_deref()
                .ok_or_else(|| VaultError::NotFound(format!("memo {} has no audio", memo_id)))?;
            let audio = unseal_column(session.key(), sealed_audio, memo_id)?;
            self.store
                .set_status(memo_id, user_id, MemoStatus::Transcribing)
                .await?;
            (audio, row.status)
        };

        // The provider runs with the guard dropped; a lock or timeout can
        // land while the call is in flight.
        let transcription = match self
            .provider
            .transcribe(&audio, self.language_hint.as_deref())
            .await
        {
            Ok(t) => t,
            Err(e) => {
                warn!("[memo] transcription failed for memo {}: {}", memo_id, e);
                self.restore_status(memo_id, user_id, &prior_status).await;
                return Err(e.into());
            }
        };

        // Phase 2: re-validate the session before persisting anything.
        let session = match self.sessions.begin(user_id).await {
            Ok(session) => session,
            Err(e) => {
                info!(
                    "[memo] session locked during transcription of memo {}, result discarded",
                    memo_id
                );
                self.restore_status(memo_id, user_id, &prior_status).await;
                return Err(e.into());
            }
        };

        // The memo may have been deleted or transcribed by a concurrent
        // call while the provider ran.
        let row = self.store.memo(memo_id, user_id).await?;
        if let Some(sealed) = row.transcript_enc.as_deref() {
            let text = unseal_column(session.key(), sealed, memo_id)?;
            return Ok(String::from_utf8_lossy(&text).into_owned());
        }

        let sealed = Store::seal_value(session.key(), transcription.text.as_bytes())?;
        self.store
            .set_transcript(memo_id, user_id, &sealed, MemoStatus::Transcribed)
            .await?;
        info!("[memo] user {} transcribed memo {}", user_id, memo_id);
        Ok(transcription.text)
    }

    /// Return the memo's summary, deriving a transcript first when none is
    /// stored. Like transcripts, a stored summary is returned without a
    /// provider call.
    pub async fn request_summary(
        &self,
        memo_id: &str,
        user_id: UserId,
    ) -> Result<String, VaultError> {
        {
            let session = self.sessions.begin(user_id).await?;
            let row = self.store.memo(memo_id, user_id).await?;
            if let Some(sealed) = row.summary_enc.as_deref() {
                let text = unseal_column(session.key(), sealed, memo_id)?;
                return Ok(String::from_utf8_lossy(&text).into_owned());
            }
        }

        // Summaries build on the transcript; this produces one if absent.
        let transcript = self.request_transcript(memo_id, user_id).await?;

        let prior_status = {
            let _session = self.sessions.begin(user_id).await?;
            let row = self.store.memo(memo_id, user_id).await?;
            self.store
                .set_status(memo_id, user_id, MemoStatus::Summarizing)
                .await?;
            row.status
        };

        let summary = match self.provider.summarize(&transcript).await {
            Ok(s) => s,
            Err(e) => {
                warn!("[memo] summarization failed for memo {}: {}", memo_id, e);
                self.restore_status(memo_id, user_id, &prior_status).await;
                return Err(e.into());
            }
        };

        let session = match self.sessions.begin(user_id).await {
            Ok(session) => session,
            Err(e) => {
                info!(
                    "[memo] session locked during summarization of memo {}, result discarded",
                    memo_id
                );
                self.restore_status(memo_id, user_id, &prior_status).await;
                return Err(e.into());
            }
        };

        let row = self.store.memo(memo_id, user_id).await?;
        if let Some(sealed) = row.summary_enc.as_deref() {
            let text = unseal_column(session.key(), sealed, memo_id)?;
            return Ok(String::from_utf8_lossy(&text).into_owned());
        }

        let sealed = Store::seal_value(session.key(), summary.as_bytes())?;
        self.store
            .set_summary(memo_id, user_id, &sealed, MemoStatus::Summarized)
            .await?;
        info!("[memo] user {} summarized memo {}", user_id, memo_id);
        Ok(summary)
    }

    /// Delete a memo irreversibly: the row is tombstoned and every
    /// ciphertext column dropped.
    pub async fn delete_memo(&self, memo_id: &str, user_id: UserId) -> Result<(), VaultError> {
        let _session = self.sessions.begin(user_id).await?;
        self.store.tombstone_memo(memo_id, user_id).await?;
        info!("[memo] user {} deleted memo {}", user_id, memo_id);
        Ok(())
    }

    /// Metadata listing of live memos, newest first. Gated like every other
    /// operation even though nothing is decrypted.
    pub async fn list_memos(&self, user_id: UserId) -> Result<Vec<MemoSummary>, VaultError> {
        let _session = self.sessions.begin(user_id).await?;
        Ok(self.store.memo_summaries(user_id).await?)
    }

    /// Best-effort rollback of a memo's status after a failed or discarded
    /// provider call. The memo may have been deleted meanwhile; that is
    /// fine.
    async fn restore_status(&self, memo_id: &str, user_id: UserId, prior: &str) {
        let status = MemoStatus::parse(prior).unwrap_or(MemoStatus::Stored);
        if let Err(e) = self.store.set_status(memo_id, user_id, status).await {
            warn!("[memo] could not restore status of memo {}: {}", memo_id, e);
        }
    }
}
