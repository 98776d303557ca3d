//! Cryptography: the secret vault.

pub mod vault;

pub use vault::{VaultCrypto, VaultError};
