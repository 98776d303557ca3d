//! Repository trait definitions implemented by the infrastructure layer.

pub mod webhook;
pub mod workflow;
