//! The `VoiceVault` service: credential setup, session control and password
//! change. The memo lifecycle half of the service lives in
//! [`crate::lifecycle`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::VaultConfig;
use crate::error::VaultError;
use crate::provider::{HttpSpeechProvider, SpeechProvider};
use vv_crypto::kdf::vault_key_from_password;
use vv_crypto::CryptoError;
use vv_store::models::UserId;
use vv_store::{Store, StoreError, VaultSessions};

/// Coarse per-user state, the thing a front end branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultStatus {
    /// No credential yet: prompt for first-run setup.
    Uninitialized,
    Locked,
    Unlocked,
}

/// The vault core.  Clone freely; all state is shared behind Arcs.
#[derive(Clone)]
pub struct VoiceVault {
    pub(crate) store: Store,
    pub(crate) sessions: VaultSessions,
    pub(crate) provider: Arc<dyn SpeechProvider>,
    pub(crate) language_hint: Option<String>,
}

impl VoiceVault {
    /// Open the vault with the production HTTP speech provider from
    /// `config`.
    pub async fn open(config: &VaultConfig) -> Result<Self, VaultError> {
        let provider = HttpSpeechProvider::new(&config.provider)?;
        Self::open_with_provider(config, Arc::new(provider)).await
    }

    /// Open with a caller-supplied provider (test fixtures, alternative
    /// vendors).
    pub async fn open_with_provider(
        config: &VaultConfig,
        provider: Arc<dyn SpeechProvider>,
    ) -> Result<Self, VaultError> {
        let store = Store::open(&config.db_path).await?;
        let sessions = VaultSessions::new(Duration::from_secs(config.idle_timeout_secs));
        Ok(Self {
            store,
            sessions,
            provider,
            language_hint: config.provider.language_hint.clone(),
        })
    }

    // ── Session control ──────────────────────────────────────────────────────

    /// First-run setup: create the user's credential. Does not unlock; the
    /// caller follows with [`unlock`](Self::unlock).
    pub async fn setup(&self, user_id: UserId, password: &str) -> Result<(), VaultError> {
        self.store.create_credential(user_id, password).await?;
        info!("[auth] vault initialized for user {}", user_id);
        Ok(())
    }

    /// Unlock with the master password. On success the vault key is derived
    /// and the inactivity timer starts; on a wrong password the session
    /// stays locked.
    pub async fn unlock(&self, user_id: UserId, password: &str) -> Result<(), VaultError> {
        let credential = self.store.credential(user_id).await?;
        if !vv_crypto::password::verify_password(password, &credential.password_hash)? {
            warn!("[auth] rejected unlock for user {}: wrong password", user_id);
            return Err(VaultError::InvalidCredential);
        }

        let salt = decode_salt(&credential.vault_salt)?;
        self.sessions
            .unlock(user_id, password.as_bytes(), &salt)
            .await?;
        info!("[session] user {} unlocked", user_id);
        Ok(())
    }

    /// Lock the user's session, zeroizing the key. A no-op when locked.
    pub async fn lock(&self, user_id: UserId) {
        self.sessions.lock(user_id).await;
        info!("[session] user {} locked", user_id);
    }

    /// Where the user stands: set up at all, and if so, locked or unlocked.
    pub async fn status(&self, user_id: UserId) -> Result<VaultStatus, VaultError> {
        if !self.store.has_credential(user_id).await? {
            return Ok(VaultStatus::Uninitialized);
        }
        Ok(if self.sessions.is_locked(user_id).await {
            VaultStatus::Locked
        } else {
            VaultStatus::Unlocked
        })
    }

    /// Time remaining until auto-lock, `None` when the session is locked.
    pub async fn time_until_lock(&self, user_id: UserId) -> Option<Duration> {
        self.sessions.time_until_lock(user_id).await
    }

    // ── Password change ──────────────────────────────────────────────────────

    /// Change the master password, re-encrypting every live memo payload
    /// under the new key. The credential swap and the re-encryption commit
    /// in one transaction; on any failure the old password stays fully
    /// valid. Requires an unlocked session.
    pub async fn change_password(
        &self,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), VaultError> {
        let credential = self.store.credential(user_id).await?;
        if !vv_crypto::password::verify_password(old_password, &credential.password_hash)? {
            warn!(
                "[auth] rejected password change for user {}: wrong password",
                user_id
            );
            return Err(VaultError::InvalidCredential);
        }

        // Holding the guard keeps every other operation for this user out
        // until the swap commits.
        let mut session = self.sessions.begin(user_id).await?;

        let new_salt = vv_crypto::kdf::generate_salt();
        let new_key = vault_key_from_password(new_password.as_bytes(), &new_salt)?;
        let new_hash = vv_crypto::password::hash_password(new_password)?;

        let memos = self.store.memos_for_user(user_id).await?;
        let mut tx = self.store.pool.begin().await.map_err(StoreError::Database)?;
        for memo in &memos {
            let audio = reseal(session.key(), &new_key.0, memo.audio_enc.as_deref())?;
            let transcript = reseal(session.key(), &new_key.0, memo.transcript_enc.as_deref())?;
            let summary = reseal(session.key(), &new_key.0, memo.summary_enc.as_deref())?;
            Store::reseal_memo_tx(
                &mut tx,
                &memo.id,
                user_id,
                audio.as_deref(),
                transcript.as_deref(),
                summary.as_deref(),
            )
            .await?;
        }
        Store::replace_credential_tx(&mut tx, user_id, &new_hash, &hex::encode(new_salt)).await?;
        tx.commit().await.map_err(StoreError::Database)?;

        session.install_key(new_key);
        info!(
            "[auth] password changed for user {} ({} memos re-encrypted)",
            user_id,
            memos.len()
        );
        Ok(())
    }
}

/// Re-encrypt one optional sealed column from `old_key` to `new_key`.
fn reseal(
    old_key: &[u8; 32],
    new_key: &[u8; 32],
    sealed: Option<&str>,
) -> Result<Option<String>, VaultError> {
    match sealed {
        Some(value) => {
            let plain = Store::unseal_value(old_key, value)?;
            Ok(Some(Store::seal_value(new_key, &plain)?))
        }
        None => Ok(None),
    }
}

fn decode_salt(hex_salt: &str) -> Result<[u8; 16], VaultError> {
    let bytes = hex::decode(hex_salt)
        .map_err(|e| VaultError::Crypto(CryptoError::InvalidKey(format!("bad vault salt: {}", e))))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| VaultError::Crypto(CryptoError::InvalidKey("vault salt must be 16 bytes".into())))
}
