//! Platform sessions.
//!
//! A `Session` is either issued by the platform (`SessionOrigin::Remote`) or
//! minted offline (`SessionOrigin::Local`). Local sessions carry their own
//! placeholder claims and must never be presented where real authorization is
//! required; use [`Session::remote_token`] at such call sites.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};
use crate::local_token::{self, LocalClaims};

/// Token kind. Only bearer tokens exist in this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Bearer,
}

/// Which branch of the authentication chain produced a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuingPath {
    BrokerExchange,
    DirectGrant,
    Registration,
    AccountLink,
    LocalFallback,
}

impl IssuingPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrokerExchange => "broker_exchange",
            Self::DirectGrant => "direct_grant",
            Self::Registration => "registration",
            Self::AccountLink => "account_link",
            Self::LocalFallback => "local_fallback",
        }
    }
}

impl std::fmt::Display for IssuingPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who issued the session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOrigin {
    /// Issued by the platform.
    Remote,
    /// Minted offline; the token is an unsigned placeholder.
    Local(LocalClaims),
}

/// An authenticated platform session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SessionRecord", try_from = "SessionRecord")]
pub struct Session {
    token: String,
    token_kind: TokenKind,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    issuing_path: IssuingPath,
    origin: SessionOrigin,
}

impl Session {
    /// Session issued by the platform.
    pub fn remote(
        token: impl Into<String>,
        issuing_path: IssuingPath,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<Self> {
        Self::build(
            token.into(),
            issuing_path,
            created_at,
            expires_at,
            SessionOrigin::Remote,
        )
    }

    /// Session backed by a freshly minted local placeholder token.
    pub fn local(claims: LocalClaims) -> AuthResult<Self> {
        let token = local_token::mint(&claims)?;
        Self::build(
            token,
            IssuingPath::LocalFallback,
            claims.issued_at(),
            claims.expires_at(),
            SessionOrigin::Local(claims),
        )
    }

    fn build(
        token: String,
        issuing_path: IssuingPath,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        origin: SessionOrigin,
    ) -> AuthResult<Self> {
        if expires_at <= created_at {
            return Err(AuthError::InvalidSession {
                created_at: created_at.to_rfc3339(),
                expires_at: expires_at.to_rfc3339(),
            });
        }
        Ok(Self {
            token,
            token_kind: TokenKind::Bearer,
            created_at,
            expires_at,
            issuing_path,
            origin,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn token_kind(&self) -> TokenKind {
        self.token_kind
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn issuing_path(&self) -> IssuingPath {
        self.issuing_path
    }

    pub fn origin(&self) -> &SessionOrigin {
        &self.origin
    }

    pub fn is_local(&self) -> bool {
        matches!(self.origin, SessionOrigin::Local(_))
    }

    /// The token, only if the platform issued it.
    pub fn remote_token(&self) -> Option<&str> {
        match self.origin {
            SessionOrigin::Remote => Some(&self.token),
            SessionOrigin::Local(_) => None,
        }
    }

    /// Check if this session has expired as of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Check if this session has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns `true` if the session expires within the next 5 minutes.
    pub fn needs_refresh(&self) -> bool {
        self.expires_at <= Utc::now() + Duration::minutes(5)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("token_kind", &self.token_kind)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("issuing_path", &self.issuing_path)
            .field("local", &self.is_local())
            .finish()
    }
}

/// On-disk shape of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRecord {
    access_token: String,
    token_type: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    source: IssuingPath,
}

impl From<Session> for SessionRecord {
    fn from(session: Session) -> Self {
        Self {
            access_token: session.token,
            token_type: "Bearer".to_string(),
            expires_at: session.expires_at,
            created_at: session.created_at,
            source: session.issuing_path,
        }
    }
}

impl TryFrom<SessionRecord> for Session {
    type Error = AuthError;

    fn try_from(record: SessionRecord) -> Result<Self, Self::Error> {
        let origin = match record.source {
            IssuingPath::LocalFallback => {
                SessionOrigin::Local(local_token::decode(&record.access_token)?)
            }
            _ => SessionOrigin::Remote,
        };
        Session::build(
            record.access_token,
            record.source,
            record.created_at,
            record.expires_at,
            origin,
        )
    }
}
