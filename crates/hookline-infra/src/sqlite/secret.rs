//! SQLite secret store.
//!
//! Environment variables and OAuth access tokens are encrypted at rest
//! with the vault and decrypted on read. `decrypted_env` is all-or-nothing:
//! one undecryptable value fails the whole fetch rather than handing an
//! execution a partial environment.

use std::collections::HashMap;

use hookline_core::secrets::SecretStore;
use hookline_types::error::SecretError;
use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use crate::crypto::VaultCrypto;

/// SQLite-backed implementation of `SecretStore`.
pub struct SqliteSecretStore {
    pool: DatabasePool,
    crypto: VaultCrypto,
}

impl SqliteSecretStore {
    /// Create a new secret store backed by the given pool and vault.
    pub fn new(pool: DatabasePool, crypto: VaultCrypto) -> Self {
        Self { pool, crypto }
    }

    /// Encrypt and upsert an environment variable for a user.
    pub async fn set_env_var(
        &self,
        user_id: &Uuid,
        key: &str,
        value: &str,
    ) -> Result<(), SecretError> {
        let encrypted = self
            .crypto
            .encrypt(value.as_bytes())
            .map_err(|e| SecretError::Storage(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO env_vars (user_id, key, encrypted_value, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(user_id, key) DO UPDATE SET
                 encrypted_value = excluded.encrypted_value,
                 updated_at = excluded.updated_at"#,
        )
        .bind(user_id.to_string())
        .bind(key)
        .bind(&encrypted)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| SecretError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Encrypt and upsert an OAuth access token for a user and provider.
    pub async fn store_access_token(
        &self,
        user_id: &Uuid,
        provider: &str,
        access_token: &str,
    ) -> Result<(), SecretError> {
        let encrypted = self
            .crypto
            .encrypt(access_token.as_bytes())
            .map_err(|e| SecretError::Storage(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO oauth_tokens (user_id, provider, encrypted_access_token, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(user_id, provider) DO UPDATE SET
                 encrypted_access_token = excluded.encrypted_access_token,
                 updated_at = excluded.updated_at"#,
        )
        .bind(user_id.to_string())
        .bind(provider)
        .bind(&encrypted)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| SecretError::Storage(e.to_string()))?;

        Ok(())
    }

    fn decrypt_utf8(&self, key: &str, ciphertext: &[u8]) -> Result<String, SecretError> {
        let plaintext = self
            .crypto
            .decrypt(ciphertext)
            .map_err(|_| SecretError::Decryption(key.to_string()))?;
        String::from_utf8(plaintext).map_err(|_| SecretError::Decryption(key.to_string()))
    }
}

impl SecretStore for SqliteSecretStore {
    async fn decrypted_env(
        &self,
        user_id: &Uuid,
    ) -> Result<HashMap<String, String>, SecretError> {
        let rows = sqlx::query("SELECT key, encrypted_value FROM env_vars WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| SecretError::Storage(e.to_string()))?;

        let mut env = HashMap::with_capacity(rows.len());
        for row in &rows {
            let key: String = row
                .try_get("key")
                .map_err(|e| SecretError::Storage(e.to_string()))?;
            let encrypted: Vec<u8> = row
                .try_get("encrypted_value")
                .map_err(|e| SecretError::Storage(e.to_string()))?;

            let value = self.decrypt_utf8(&key, &encrypted)?;
            env.insert(key, value);
        }
        Ok(env)
    }

    async fn access_token(
        &self,
        user_id: &Uuid,
        provider: &str,
    ) -> Result<Option<String>, SecretError> {
        let row = sqlx::query(
            "SELECT encrypted_access_token FROM oauth_tokens WHERE user_id = ? AND provider = ?",
        )
        .bind(user_id.to_string())
        .bind(provider)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| SecretError::Storage(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let encrypted: Vec<u8> = row
            .try_get("encrypted_access_token")
            .map_err(|e| SecretError::Storage(e.to_string()))?;

        Ok(Some(self.decrypt_utf8(provider, &encrypted)?))
    }
}
