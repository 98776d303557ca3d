//! AES-256-GCM vault encryption for secrets at rest.
//!
//! VaultCrypto provides symmetric encryption using AES-256-GCM with random
//! nonces. The master key can come from:
//! - A raw 32-byte key
//! - A password (Argon2id key derivation)
//! - The `HOOKLINE_VAULT_KEY` environment variable (64 hex chars)
//!
//! Encrypted format: `nonce (12 bytes) || ciphertext`
//!
//! SECURITY: Error types never contain plaintext or key material.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use thiserror::Error;

/// Nonce size for AES-256-GCM (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;

/// Environment variable holding the hex-encoded 32-byte master key.
pub const VAULT_KEY_ENV: &str = "HOOKLINE_VAULT_KEY";

/// Errors from vault encryption operations.
///
/// IMPORTANT: These errors never include plaintext, key material, or
/// ciphertext in their Display/Debug output to prevent accidental logging
/// of secrets.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("invalid ciphertext: too short")]
    CiphertextTooShort,

    #[error("key derivation failed")]
    KeyDerivationFailed,

    #[error("vault key unavailable: {0}")]
    KeyUnavailable(String),
}

/// AES-256-GCM encryption for vault secrets at rest.
///
/// Each encryption call generates a random 12-byte nonce, prepended to the
/// ciphertext, so encrypting the same plaintext twice produces different
/// output.
pub struct VaultCrypto {
    cipher: Aes256Gcm,
}

impl VaultCrypto {
    /// Create a new VaultCrypto from a raw 32-byte key.
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Derive a 32-byte encryption key from a password using Argon2id.
    ///
    /// OWASP parameters: 19 MiB memory, 2 iterations, 1 degree of
    /// parallelism. The salt is deterministic ("hookline-vault-v1") so the
    /// same password always produces the same key; the password provides
    /// the entropy and the output is used as a KDF, not stored for
    /// verification.
    pub fn from_password(password: &str) -> Result<Self, VaultError> {
        use argon2::{Algorithm, Argon2, Params, Version};

        let params =
            Params::new(19456, 2, 1, Some(32)).map_err(|_| VaultError::KeyDerivationFailed)?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let salt = b"hookline-vault-v1";
        let mut key = [0u8; 32];
        argon2
            .hash_password_into(password.as_bytes(), salt, &mut key)
            .map_err(|_| VaultError::KeyDerivationFailed)?;

        Ok(Self::new(&key))
    }

    /// Load the master key from the `HOOKLINE_VAULT_KEY` environment
    /// variable (64 hex characters = 32 bytes).
    pub fn from_env() -> Result<Self, VaultError> {
        let hex_key = std::env::var(VAULT_KEY_ENV)
            .map_err(|_| VaultError::KeyUnavailable(format!("{VAULT_KEY_ENV} is not set")))?;
        Self::from_hex(&hex_key)
    }

    /// Build from a hex-encoded 32-byte key.
    pub fn from_hex(hex_key: &str) -> Result<Self, VaultError> {
        let key_bytes = hex_decode(hex_key.trim())
            .map_err(|_| VaultError::KeyUnavailable("key is not valid hex".to_string()))?;
        if key_bytes.len() != 32 {
            return Err(VaultError::KeyUnavailable(
                "key must be 32 bytes (64 hex characters)".to_string(),
            ));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&key_bytes);
        Ok(Self::new(&key))
    }

    /// Encrypt plaintext using AES-256-GCM with a random nonce.
    ///
    /// Returns `nonce (12 bytes) || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| VaultError::EncryptionFailed)?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt data produced by `encrypt()`.
    ///
    /// Expects `nonce (12 bytes) || ciphertext` format.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, VaultError> {
        if data.len() < NONCE_SIZE {
            return Err(VaultError::CiphertextTooShort);
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| VaultError::DecryptionFailed)
    }
}

/// Hex-decode a string to bytes.
fn hex_decode(s: &str) -> Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err("odd length hex string".to_string());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|e| format!("invalid hex at position {i}: {e}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; 32] {
        // Deterministic key for testing only
        let mut key = [0u8; 32];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        key
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let crypto = VaultCrypto::new(&test_key());
        let plaintext = b"hello world, this is a secret API key";

        let encrypted = crypto.encrypt(plaintext).unwrap();
        let decrypted = crypto.decrypt(&encrypted).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let crypto1 = VaultCrypto::new(&test_key());
        let mut wrong_key = test_key();
        wrong_key[0] = 0xFF;
        let crypto2 = VaultCrypto::new(&wrong_key);

        let encrypted = crypto1.encrypt(b"secret data").unwrap();
        let result = crypto2.decrypt(&encrypted);

        assert!(matches!(result.unwrap_err(), VaultError::DecryptionFailed));
    }

    #[test]
    fn test_random_nonce_produces_different_ciphertexts() {
        let crypto = VaultCrypto::new(&test_key());
        let plaintext = b"same plaintext";

        let encrypted1 = crypto.encrypt(plaintext).unwrap();
        let encrypted2 = crypto.encrypt(plaintext).unwrap();

        assert_ne!(encrypted1, encrypted2);
        assert_eq!(crypto.decrypt(&encrypted1).unwrap(), plaintext);
        assert_eq!(crypto.decrypt(&encrypted2).unwrap(), plaintext);
    }

    #[test]
    fn test_ciphertext_too_short() {
        let crypto = VaultCrypto::new(&test_key());
        let result = crypto.decrypt(&[0u8; 5]);

        assert!(matches!(result.unwrap_err(), VaultError::CiphertextTooShort));
    }

    #[test]
    fn test_from_password_is_deterministic() {
        let crypto1 = VaultCrypto::from_password("my-strong-password").unwrap();
        let crypto2 = VaultCrypto::from_password("my-strong-password").unwrap();

        let plaintext = b"test data";
        let encrypted = crypto1.encrypt(plaintext).unwrap();
        let decrypted = crypto2.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_different_passwords_produce_different_keys() {
        let crypto1 = VaultCrypto::from_password("password-one").unwrap();
        let crypto2 = VaultCrypto::from_password("password-two").unwrap();

        let encrypted = crypto1.encrypt(b"secret").unwrap();
        assert!(crypto2.decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_from_hex() {
        let hex_key: String = test_key().iter().map(|b| format!("{b:02x}")).collect();
        let crypto = VaultCrypto::from_hex(&hex_key).unwrap();
        let reference = VaultCrypto::new(&test_key());

        let encrypted = reference.encrypt(b"shared key").unwrap();
        assert_eq!(crypto.decrypt(&encrypted).unwrap(), b"shared key");
    }

    #[test]
    fn test_from_hex_rejects_bad_keys() {
        // The vault has no Debug impl, so inspect the error side only
        assert!(matches!(
            VaultCrypto::from_hex("not-hex").err(),
            Some(VaultError::KeyUnavailable(_))
        ));
        assert!(matches!(
            VaultCrypto::from_hex("deadbeef").err(),
            Some(VaultError::KeyUnavailable(_))
        ));
    }

    #[test]
    fn test_vault_error_never_contains_secrets() {
        // Error messages may mention technical terms but must never carry
        // actual secret values.
        let test_secret = "sk-super-secret-value-12345";
        let test_key_hex = "deadbeefcafebabe";

        let errors = [
            VaultError::EncryptionFailed,
            VaultError::DecryptionFailed,
            VaultError::CiphertextTooShort,
            VaultError::KeyDerivationFailed,
            VaultError::KeyUnavailable("env var missing".to_string()),
        ];

        for err in &errors {
            let msg = err.to_string();
            assert!(!msg.contains(test_secret), "Error leaks secret value: {msg}");
            assert!(!msg.contains(test_key_hex), "Error leaks key material: {msg}");
        }
    }
}
