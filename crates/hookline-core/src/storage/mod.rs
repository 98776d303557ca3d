//! Storage trait definitions implemented by the infrastructure layer.

pub mod dedup_store;
