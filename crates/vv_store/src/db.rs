//! Database abstraction over SQLite via sqlx.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use zeroize::Zeroizing;

use crate::error::StoreError;
use vv_crypto::CryptoError;

/// Constant AAD binding every sealed payload to this store's data format.
const MEMO_AAD: &[u8] = b"vv-store-v1";

/// Central store handle.  Cheap to clone (Arc internally).
#[derive(Clone)]
pub struct Store {
    pub pool: SqlitePool,
}

impl Store {
    /// Open (or create) the SQLite database at `db_path`.
    /// Runs all pending migrations automatically.
    ///
    /// WAL journal mode and foreign-key enforcement are configured at
    /// connection time here, NOT inside a migration: SQLite forbids changing
    /// `journal_mode` inside a transaction and sqlx wraps every migration in
    /// one.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(opts).await?;

        // Run migrations
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        Ok(Self { pool })
    }

    // ── Payload sealing ──────────────────────────────────────────────────────

    /// Encrypt a plaintext payload under a session's vault key into the
    /// base64 TEXT form the `*_enc` columns hold.
    pub fn seal_value(key: &[u8; 32], plaintext: &[u8]) -> Result<String, StoreError> {
        let ct = vv_crypto::aead::encrypt(key, plaintext, MEMO_AAD).map_err(StoreError::Crypto)?;
        Ok(base64::Engine::encode(
            &base64::engine::general_purpose::URL_SAFE_NO_PAD,
            &ct,
        ))
    }

    /// Decrypt a sealed payload column back to plaintext.
    ///
    /// A column that fails base64 decoding is reported the same as a failed
    /// authentication tag; either way the ciphertext is unusable.
    pub fn unseal_value(key: &[u8; 32], b64: &str) -> Result<Zeroizing<Vec<u8>>, StoreError> {
        let ct = base64::Engine::decode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, b64)
            .map_err(|_| StoreError::Crypto(CryptoError::AeadDecrypt))?;
        Ok(vv_crypto::aead::decrypt(key, &ct, MEMO_AAD)?)
    }
}
