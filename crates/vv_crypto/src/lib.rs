//! vv_crypto - VoiceVault cryptographic primitives
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize all secret material on drop.
//! - Master passwords and derived keys never leave this crate as anything
//!   but opaque newtypes or PHC strings.
//!
//! # Module layout
//! - `aead`     - XChaCha20-Poly1305 encrypt/decrypt helpers for memo payloads
//! - `kdf`      - Argon2id derivation of the per-user vault key
//! - `password` - Argon2id PHC-string hashing for master-password credentials
//! - `error`    - unified error type

pub mod aead;
pub mod error;
pub mod kdf;
pub mod password;

pub use error::CryptoError;
pub use kdf::VaultKey;
