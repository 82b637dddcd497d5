//! Credential persistence: one salted master-password record per user.
//!
//! The password itself is stored as an Argon2id PHC string. A separate random
//! salt for vault key derivation lives alongside it, so verifying a password
//! and deriving the vault key never share salt material.

use crate::db::Store;
use crate::error::StoreError;
use crate::models::{now_millis, CredentialRow, UserId};

impl Store {
    /// Create the credential for a user that has none yet.
    /// Fails with `AlreadyExists` when the user is already set up; an
    /// existing credential is never silently replaced.
    pub async fn create_credential(
        &self,
        user_id: UserId,
        password: &str,
    ) -> Result<CredentialRow, StoreError> {
        let password_hash = vv_crypto::password::hash_password(password)?;
        let vault_salt = hex::encode(vv_crypto::kdf::generate_salt());
        let now = now_millis();

        // INSERT OR IGNORE keeps the existence check and the insert atomic.
        let result = sqlx::query(
            "INSERT OR IGNORE INTO credentials (user_id, password_hash, vault_salt, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&password_hash)
        .bind(&vault_salt)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(format!(
                "credential for user {}",
                user_id
            )));
        }

        Ok(CredentialRow {
            user_id,
            password_hash,
            vault_salt,
            created_at: now,
            updated_at: now,
        })
    }

    /// Fetch a user's credential row.
    pub async fn credential(&self, user_id: UserId) -> Result<CredentialRow, StoreError> {
        sqlx::query_as::<_, CredentialRow>(
            "SELECT user_id, password_hash, vault_salt, created_at, updated_at FROM credentials WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("credential for user {}", user_id)))
    }

    /// Whether the user has completed first-run setup.
    pub async fn has_credential(&self, user_id: UserId) -> Result<bool, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM credentials WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    /// Verify a master-password attempt against the stored hash.
    /// `Ok(false)` means a wrong password; a user with no credential is
    /// `NotFound`.
    pub async fn verify_credential(
        &self,
        user_id: UserId,
        password: &str,
    ) -> Result<bool, StoreError> {
        let credential = self.credential(user_id).await?;
        Ok(vv_crypto::password::verify_password(
            password,
            &credential.password_hash,
        )?)
    }

    /// Swap in a new password hash and vault salt inside `tx`. The caller
    /// pairs this with re-sealing every payload of the user in the same
    /// transaction, so a crash can never leave hash and ciphertexts keyed
    /// differently.
    pub async fn replace_credential_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        user_id: UserId,
        password_hash: &str,
        vault_salt: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE credentials SET password_hash = ?, vault_salt = ?, updated_at = ? WHERE user_id = ?",
        )
        .bind(password_hash)
        .bind(vault_salt)
        .bind(now_millis())
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "credential for user {}",
                user_id
            )));
        }
        Ok(())
    }
}
