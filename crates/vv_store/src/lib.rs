//! vv_store - Encrypted local storage and vault sessions for VoiceVault
//!
//! # Encryption strategy
//!
//! SQLite does NOT natively encrypt. We use application-level encryption:
//! - Memo payloads (audio, transcript, summary) are stored as
//!   XChaCha20-Poly1305 ciphertext, base64-encoded, sealed under the owner's
//!   vault key.
//! - The vault key is derived from the master password via Argon2id and held
//!   in memory only while the owner's session is unlocked.
//! - Metadata (ids, lifecycle status, timestamps) stays plaintext so listing
//!   and ordering never require a key.
//!
//! # Migration
//!
//! SQLx migrations in `migrations/` are run automatically on first open.

pub mod credentials;
pub mod db;
pub mod error;
pub mod memos;
pub mod models;
pub mod session;

pub use db::Store;
pub use error::StoreError;
pub use session::{SessionGuard, VaultSessions, DEFAULT_IDLE_TIMEOUT};
