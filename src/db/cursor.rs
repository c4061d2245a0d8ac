//! Opaque signed pagination cursors.
//!
//! A cursor is `v1.<base64 payload>.<base64 hmac>`, HMAC-SHA256 over the
//! base64 payload. The payload carries the sort-key values of the last
//! returned row plus a hash binding the cursor to its query (scope,
//! filter, order). Tampered payloads and cursors replayed against a
//! different query fail decoding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::DatabaseError;

type HmacSha256 = Hmac<Sha256>;

const CURSOR_VERSION: &str = "v1";
const MAX_TOKEN_LEN: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CursorPayload {
    /// Binds the cursor to one logical query; see [`query_hash`].
    pub query_hash: String,
    /// Sort-key values of the last row of the previous page, in the
    /// query's ORDER BY column order (id last).
    pub keys: Vec<String>,
}

/// Hash identifying one logical query. Parts are the owner scope, the
/// filter text, and an order tag; changing any of them invalidates
/// outstanding cursors.
pub fn query_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

pub fn encode_cursor(payload: &CursorPayload, secret: &[u8]) -> Result<String, DatabaseError> {
    let payload_bytes = serde_json::to_vec(payload)
        .map_err(|e| DatabaseError::InvalidCursor(e.to_string()))?;
    let payload_part = URL_SAFE_NO_PAD.encode(payload_bytes);
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| DatabaseError::InvalidCursor(e.to_string()))?;
    mac.update(payload_part.as_bytes());
    let sig_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{CURSOR_VERSION}.{payload_part}.{sig_part}"))
}

pub fn decode_cursor(
    token: &str,
    secret: &[u8],
    expected_hash: &str,
) -> Result<CursorPayload, DatabaseError> {
    if token.len() > MAX_TOKEN_LEN {
        return Err(DatabaseError::InvalidCursor(
            "cursor exceeds max length".into(),
        ));
    }

    let mut parts = token.split('.');
    let (version, payload_part, sig_part) = match (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) {
        (Some(v), Some(p), Some(s), None) => (v, p, s),
        _ => {
            return Err(DatabaseError::InvalidCursor("invalid cursor format".into()));
        }
    };
    if version != CURSOR_VERSION {
        return Err(DatabaseError::InvalidCursor(format!(
            "unsupported cursor version: {version}"
        )));
    }

    // Verify the signature before trusting any payload bytes.
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| DatabaseError::InvalidCursor(e.to_string()))?;
    mac.update(payload_part.as_bytes());
    let sig = URL_SAFE_NO_PAD
        .decode(sig_part)
        .map_err(|e| DatabaseError::InvalidCursor(e.to_string()))?;
    mac.verify_slice(&sig)
        .map_err(|_| DatabaseError::InvalidCursor("cursor signature mismatch".into()))?;

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_part)
        .map_err(|e| DatabaseError::InvalidCursor(e.to_string()))?;
    let payload: CursorPayload = serde_json::from_slice(&payload_bytes)
        .map_err(|e| DatabaseError::InvalidCursor(e.to_string()))?;

    if payload.query_hash != expected_hash {
        return Err(DatabaseError::InvalidCursor(
            "cursor does not match this query".into(),
        ));
    }

    Ok(payload)
}
