//! Dispatch logic and collaborator trait definitions for Hookline.
//!
//! This crate defines the "ports" (repository and collaborator traits) that
//! the infrastructure layer implements, plus the webhook dispatcher itself:
//! provider adapters, deduplication hashing, Airtable change consolidation,
//! and the shared execution-invocation path. It depends only on
//! `hookline-types` -- never on `hookline-infra` or any database/IO crate.

pub mod airtable_api;
pub mod dispatch;
pub mod engine;
pub mod logs;
pub mod repository;
pub mod secrets;
pub mod serializer;
pub mod storage;
