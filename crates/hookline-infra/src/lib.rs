//! Infrastructure implementations for Hookline.
//!
//! Provides the SQLite-backed repositories and stores, the AES-256-GCM
//! secret vault, the reqwest Airtable payloads client, and the HTTP
//! execution engine client. Everything here implements a trait from
//! `hookline-core`; nothing above this crate touches sqlx or reqwest.

pub mod airtable;
pub mod crypto;
pub mod engine;
pub mod sqlite;
