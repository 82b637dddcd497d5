//! The error surface a front end sees.
//!
//! Lower layers keep their own error enums (`CryptoError`, `StoreError`);
//! everything is flattened into [`VaultError`] kinds at this boundary so a
//! caller can match on outcomes without knowing the layering. An AEAD tag
//! mismatch always surfaces as `DecryptionFailed`, never as a generic crypto
//! fault.

use thiserror::Error;

use crate::provider::ProviderError;
use vv_crypto::CryptoError;
use vv_store::StoreError;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid master password")]
    InvalidCredential,

    #[error("Vault is locked: unlock with the master password first")]
    VaultLocked,

    #[error("Decryption failed: ciphertext does not match the current key")]
    DecryptionFailed,

    #[error("Speech provider unreachable: {0}")]
    ProviderUnavailable(String),

    #[error("Speech provider rejected the request ({code}): {message}")]
    Provider { code: u16, message: String },

    #[error("Storage error: {0}")]
    Storage(StoreError),

    #[error("Crypto error: {0}")]
    Crypto(CryptoError),
}

impl From<StoreError> for VaultError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::VaultLocked => VaultError::VaultLocked,
            StoreError::NotFound(what) => VaultError::NotFound(what),
            StoreError::AlreadyExists(what) => VaultError::AlreadyExists(what),
            StoreError::Crypto(CryptoError::AeadDecrypt) => VaultError::DecryptionFailed,
            StoreError::Crypto(c) => VaultError::Crypto(c),
            other => VaultError::Storage(other),
        }
    }
}

impl From<CryptoError> for VaultError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::AeadDecrypt => VaultError::DecryptionFailed,
            other => VaultError::Crypto(other),
        }
    }
}

impl From<ProviderError> for VaultError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Rejected { status, message } => VaultError::Provider {
                code: status,
                message,
            },
            transport => VaultError::ProviderUnavailable(transport.to_string()),
        }
    }
}
