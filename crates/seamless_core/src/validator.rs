//! Cached session validation.

use std::sync::Arc;

use seamless_auth::Session;
use tracing::debug;

use crate::platform::{PlatformApi, PlatformError};

/// Why a cached session was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Past `expires_at`; not presented to the platform.
    Expired,
    /// Offline placeholder; never presented to the platform.
    LocalSession,
    /// The platform answered with a non-success status.
    Unauthorized,
    /// The platform could not be reached in time.
    Unreachable,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            RejectReason::Expired => "expired",
            RejectReason::LocalSession => "local session",
            RejectReason::Unauthorized => "not accepted by the platform",
            RejectReason::Unreachable => "platform unreachable",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Accepted,
    Rejected(RejectReason),
}

impl Validation {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Validation::Accepted)
    }
}

/// Confirms a stored session against the platform's userinfo endpoint.
#[derive(Clone)]
pub struct SessionValidator {
    platform: Arc<dyn PlatformApi>,
}

impl SessionValidator {
    pub fn new(platform: Arc<dyn PlatformApi>) -> Self {
        Self { platform }
    }

    /// Single attempt. Only an explicit success status is `Accepted`.
    pub async fn check(&self, session: &Session) -> Validation {
        if session.is_expired() {
            return Validation::Rejected(RejectReason::Expired);
        }
        let Some(token) = session.remote_token() else {
            return Validation::Rejected(RejectReason::LocalSession);
        };

        match self.platform.validate(token).await {
            Ok(()) => Validation::Accepted,
            Err(PlatformError::Transport(details)) => {
                debug!("Session validation could not reach the platform: {}", details);
                Validation::Rejected(RejectReason::Unreachable)
            }
            Err(e) => {
                debug!("Session validation failed: {}", e);
                Validation::Rejected(RejectReason::Unauthorized)
            }
        }
    }
}
