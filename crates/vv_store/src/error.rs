//! Error types for the store layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Vault is locked: unlock with the master password first")]
    VaultLocked,

    #[error("Crypto error: {0}")]
    Crypto(#[from] vv_crypto::CryptoError),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Migration error: {0}")]
    Migration(String),
}
