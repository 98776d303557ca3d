//! HTTP layer for Hookline.
//!
//! Axum-based trigger endpoints under `/api/v1/` with CORS and request
//! tracing.

pub mod handlers;
pub mod router;
