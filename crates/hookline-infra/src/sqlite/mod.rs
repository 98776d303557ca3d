//! SQLite-backed storage.
//!
//! All repositories share a `DatabasePool` with split reader/writer
//! connections in WAL mode.

pub mod dedup;
pub mod execution_log;
pub mod pool;
pub mod secret;
pub mod webhook;
pub mod workflow;
