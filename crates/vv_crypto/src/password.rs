//! Master-password hashing for the credential store.
//!
//! Argon2id PHC strings via the `argon2` crate. The per-credential random
//! salt and the KDF parameters travel inside the PHC string, so the stored
//! hash is self-describing and verification needs no companion columns.
//! Verification is constant-time with respect to the stored hash.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Argon2, Version};

use crate::error::CryptoError;
use crate::kdf::argon2_params;

fn hasher() -> Argon2<'static> {
    Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, argon2_params())
}

/// Hash a master password into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, CryptoError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password attempt against a stored PHC string.
///
/// `Ok(false)` means the password is wrong; `Err` means the stored hash is
/// unusable (corrupt PHC string, unsupported params).
pub fn verify_password(password: &str, stored: &str) -> Result<bool, CryptoError> {
    let parsed =
        PasswordHash::new(stored).map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
    match hasher().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CryptoError::PasswordHash(e.to_string())),
    }
}
