//! Request fingerprinting and client metadata extraction.
//!
//! The fingerprint is a stable UX heuristic for recognizing returning
//! devices. It hashes client-supplied headers with no server-side secret and
//! must never be treated as an authentication factor.

use std::net::SocketAddr;

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

use crate::domain::types::RequestContext;

/// SHA-256 hex over `"{ua}|{ip}|{accept-language}|{accept-encoding}"`.
pub fn device_fingerprint(ctx: &RequestContext) -> String {
    let raw = format!(
        "{}|{}|{}|{}",
        ctx.user_agent, ctx.ip, ctx.accept_language, ctx.accept_encoding
    );
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Replace CR/LF with spaces and cap at 500 chars. Empty maps to "Unknown".
pub fn sanitize_user_agent(raw: &str) -> String {
    if raw.is_empty() {
        return "Unknown".to_owned();
    }
    raw.chars()
        .take(500)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

/// Human-readable device label: leading 100 chars of the user-agent.
pub fn device_label(user_agent: &str) -> String {
    if user_agent.is_empty() {
        return "Unknown Device".to_owned();
    }
    user_agent.chars().take(100).collect()
}

/// First entry of `x-forwarded-for` when present, else the peer address.
pub fn client_ip(addr: SocketAddr, headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}

/// Assemble the request context consumed by fingerprinting and audit entries.
pub fn request_context(addr: SocketAddr, headers: &HeaderMap) -> RequestContext {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_owned()
    };
    RequestContext {
        ip: client_ip(addr, headers),
        user_agent: sanitize_user_agent(&header("user-agent")),
        accept_language: header("accept-language"),
        accept_encoding: header("accept-encoding"),
    }
}
