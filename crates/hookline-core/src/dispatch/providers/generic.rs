//! Token and source-IP checks for generic-style providers
//! (generic / github / stripe / other).
//!
//! Both checks are driven entirely by registration config. Token comparison
//! is constant-time.

use hookline_types::webhook::{HeaderSnapshot, InboundAuthConfig};

/// Sentinel for an unresolvable client IP. Never matches an allowlist.
pub const UNKNOWN_IP: &str = "unknown";

/// Which check an inbound request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Missing or wrong token (HTTP 401).
    Token,
    /// Source IP not on the allowlist (HTTP 403).
    Ip,
}

/// Derive the client IP: first `x-forwarded-for` entry, falling back to
/// `x-real-ip`, defaulting to `"unknown"`.
pub fn client_ip(headers: &HeaderSnapshot) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    headers
        .get("x-real-ip")
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

/// Apply the configured token and IP checks.
pub fn check_auth(config: &InboundAuthConfig, headers: &HeaderSnapshot) -> Result<(), AuthFailure> {
    if config.require_auth {
        if let Some(expected) = &config.token {
            let provided = match &config.secret_header_name {
                Some(header) => headers.get(&header.to_lowercase()).cloned(),
                None => headers
                    .get("authorization")
                    .and_then(|v| v.strip_prefix("Bearer "))
                    .map(str::to_string),
            };

            match provided {
                Some(token) if constant_time_eq(expected.as_bytes(), token.as_bytes()) => {}
                _ => return Err(AuthFailure::Token),
            }
        }
    }

    if !config.allowed_ips.is_empty() {
        let ip = client_ip(headers);
        if !config.allowed_ips.iter().any(|allowed| allowed == &ip) {
            return Err(AuthFailure::Ip);
        }
    }

    Ok(())
}

/// Constant-time byte comparison (XOR-based).
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
