//! Shared domain types for Hookline.
//!
//! This crate contains the core domain types used across the Hookline
//! dispatcher: webhook registrations, workflow definitions, execution
//! records, Airtable change payloads, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod airtable;
pub mod error;
pub mod execution;
pub mod webhook;
pub mod workflow;
