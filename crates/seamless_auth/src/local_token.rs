//! Placeholder tokens for offline (local) accounts.
//!
//! A local token looks like a JWT but is not one: the third segment is the
//! literal marker `local` instead of a signature. Nothing in this module
//! authenticates anything; relying parties must reject these tokens wherever
//! real authorization is required.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};
use crate::tier::Tier;

/// Third segment of every local token.
pub const LOCAL_MARKER: &str = "local";

#[derive(Debug, Serialize, Deserialize)]
struct LocalHeader {
    alg: String,
    typ: String,
}

impl Default for LocalHeader {
    fn default() -> Self {
        Self {
            alg: "none".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Claims carried by a local token. Field order is the encoding order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalClaims {
    /// Subject (local account id).
    pub sub: String,
    pub email: Option<String>,
    #[serde(rename = "subscription_plan")]
    pub tier: Tier,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expiry (Unix seconds).
    pub exp: i64,
}

impl LocalClaims {
    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or_default()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}

/// Encode claims as `<header>.<claims>.local`.
pub fn mint(claims: &LocalClaims) -> AuthResult<String> {
    let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&LocalHeader::default())?);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    Ok(format!("{header}.{payload}.{LOCAL_MARKER}"))
}

/// Whether a token has the local placeholder shape.
pub fn is_local_token(token: &str) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    parts.len() == 3 && parts[2] == LOCAL_MARKER
}

/// Decode the claims of a local token. Performs no verification.
pub fn decode(token: &str) -> AuthResult<LocalClaims> {
    let parts: Vec<&str> = token.split('.').collect();
    let [header, payload, marker] = parts.as_slice() else {
        return Err(AuthError::MalformedLocalToken(format!(
            "expected 3 segments, found {}",
            parts.len()
        )));
    };
    if *marker != LOCAL_MARKER {
        return Err(AuthError::MalformedLocalToken(
            "missing local marker".to_string(),
        ));
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| AuthError::MalformedLocalToken(format!("header: {e}")))?;
    let _: LocalHeader = serde_json::from_slice(&header_bytes)?;

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| AuthError::MalformedLocalToken(format!("claims: {e}")))?;
    Ok(serde_json::from_slice(&payload_bytes)?)
}
