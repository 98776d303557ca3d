//! HTTP request handlers.

pub mod trigger;
