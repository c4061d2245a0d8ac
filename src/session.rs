//! Stateless signed sessions carried in a cookie.
//!
//! A session token is `s1.<base64 claims>.<base64 hmac>`, HMAC-SHA256
//! over the base64 claims, signed with the same secret as pagination
//! cursors. The `s1` prefix keeps the two token families apart: a
//! cursor can never be replayed as a session. Claims carry the signed-in
//! practitioner's id, email and display name plus an expiry timestamp;
//! there is no server-side session store to invalidate.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::config::SESSION_TTL_SECS;
use crate::models::Usuario;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION: &str = "s1";
const MAX_TOKEN_LEN: usize = 1024;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "sesion";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("invalid session token: {0}")]
    Invalid(String),
    #[error("session expired")]
    Expired,
}

/// Verified identity of the signed-in practitioner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub id: Uuid,
    pub email: String,
    pub nombre: String,
    /// Unix timestamp after which the token is rejected.
    pub exp: i64,
}

/// Issue a fresh session token for a practitioner, valid for
/// [`SESSION_TTL_SECS`] from now.
pub fn issue_session(usuario: &Usuario, secret: &[u8]) -> Result<String, SessionError> {
    let claims = Claims {
        id: usuario.id,
        email: usuario.email.clone(),
        nombre: usuario.nombre.clone(),
        exp: Utc::now().timestamp() + SESSION_TTL_SECS,
    };
    encode_claims(&claims, secret)
}

fn encode_claims(claims: &Claims, secret: &[u8]) -> Result<String, SessionError> {
    let claims_bytes =
        serde_json::to_vec(claims).map_err(|e| SessionError::Invalid(e.to_string()))?;
    let claims_part = URL_SAFE_NO_PAD.encode(claims_bytes);
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|e| SessionError::Invalid(e.to_string()))?;
    mac.update(claims_part.as_bytes());
    let sig_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{TOKEN_VERSION}.{claims_part}.{sig_part}"))
}

/// Verify a token's signature and expiry and return its claims.
pub fn verify_session(token: &str, secret: &[u8]) -> Result<Claims, SessionError> {
    if token.len() > MAX_TOKEN_LEN {
        return Err(SessionError::Invalid("token exceeds max length".into()));
    }

    let mut parts = token.split('.');
    let (version, claims_part, sig_part) = match (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) {
        (Some(v), Some(c), Some(s), None) => (v, c, s),
        _ => return Err(SessionError::Invalid("invalid token format".into())),
    };
    if version != TOKEN_VERSION {
        return Err(SessionError::Invalid(format!(
            "unsupported token version: {version}"
        )));
    }

    // Verify the signature before trusting any claim bytes.
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|e| SessionError::Invalid(e.to_string()))?;
    mac.update(claims_part.as_bytes());
    let sig = URL_SAFE_NO_PAD
        .decode(sig_part)
        .map_err(|e| SessionError::Invalid(e.to_string()))?;
    mac.verify_slice(&sig)
        .map_err(|_| SessionError::Invalid("token signature mismatch".into()))?;

    let claims_bytes = URL_SAFE_NO_PAD
        .decode(claims_part)
        .map_err(|e| SessionError::Invalid(e.to_string()))?;
    let claims: Claims = serde_json::from_slice(&claims_bytes)
        .map_err(|e| SessionError::Invalid(e.to_string()))?;

    if claims.exp < Utc::now().timestamp() {
        return Err(SessionError::Expired);
    }
    Ok(claims)
}

/// `Set-Cookie` value installing a session token.
pub fn session_cookie(token: &str) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; Max-Age={SESSION_TTL_SECS}; HttpOnly; SameSite=Lax"
    )
}

/// `Set-Cookie` value removing the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

/// Pull the session token out of a `Cookie` request header, if present.
pub fn session_from_cookie_header(header: &str) -> Option<&str> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then_some(value)
    })
}
