//! The authentication chain.
//!
//! ```text
//! CheckCache -> CredentialDiscovery -> IdentityFetch -> BrokerExchange
//!   -> DirectGrant -> Register -> AccountLink -> LocalFallback -> Persist
//! ```
//!
//! A cached session the platform still accepts short-circuits everything
//! after `CheckCache`. Without a credential the chain jumps straight to
//! `LocalFallback`. The only step that can fail the whole call is
//! `IdentityFetch`; every platform failure degrades to a later step.

use std::sync::Arc;

use chrono::{Duration, Utc};
use seamless_auth::tier::tier_for;
use seamless_auth::{
    AccountOrigin, Identity, IssuingPath, LocalClaims, Profile, Session, SessionStore,
};
use tracing::{debug, info, warn};

use crate::config::{SeamlessConfig, SessionConfig};
use crate::discovery::{Credential, CredentialDiscovery, Discovery, EnvSource, ProcessEnv};
use crate::error::{CoreError, Result};
use crate::identity::{GitHubIdentityResolver, IdentityResolver};
use crate::platform::{GrantMode, HttpPlatformClient, PlatformApi, PlatformError, TokenGrant};
use crate::validator::{SessionValidator, Validation};

/// Longest remote lifetime honored from `expires_in`.
const MAX_REMOTE_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

/// Result of one `authenticate` call.
#[derive(Debug)]
pub struct AuthOutcome {
    pub session: Session,
    pub profile: Profile,
    pub path: IssuingPath,
    /// `true` when the stored session was accepted and reused.
    pub reused: bool,
    /// Set when the new session could not be written to disk. The session is
    /// still valid for this process.
    pub persistence_error: Option<CoreError>,
}

/// Drives the authentication chain.
pub struct Orchestrator {
    resolver: Arc<dyn IdentityResolver>,
    platform: Arc<dyn PlatformApi>,
    validator: SessionValidator,
    store: SessionStore,
    discovery: CredentialDiscovery,
    sessions: SessionConfig,
}

impl Orchestrator {
    pub fn new(
        resolver: Arc<dyn IdentityResolver>,
        platform: Arc<dyn PlatformApi>,
        store: SessionStore,
        discovery: CredentialDiscovery,
        sessions: SessionConfig,
    ) -> Self {
        Self {
            validator: SessionValidator::new(platform.clone()),
            resolver,
            platform,
            store,
            discovery,
            sessions,
        }
    }

    /// HTTP clients and the process environment, as configured.
    pub fn from_config(config: &SeamlessConfig) -> Result<Self> {
        Self::with_env(config, Arc::new(ProcessEnv))
    }

    /// HTTP clients with a custom environment source.
    pub fn with_env(config: &SeamlessConfig, env: Arc<dyn EnvSource>) -> Result<Self> {
        let resolver =
            GitHubIdentityResolver::new(&config.identity_provider, config.timeouts.identity())?;
        let platform = HttpPlatformClient::new(&config.platform, &config.timeouts)?;
        Ok(Self::new(
            Arc::new(resolver),
            Arc::new(platform),
            config.storage.session_store(),
            CredentialDiscovery::new(config.environment.clone(), env),
            config.sessions.clone(),
        ))
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn validator(&self) -> &SessionValidator {
        &self.validator
    }

    /// Run the chain once.
    ///
    /// Fails only with `CoreError::IdentityUnavailable` (or a local storage
    /// error while minting an offline session). Persistence failures are
    /// reported in the outcome instead.
    pub async fn authenticate(&self) -> Result<AuthOutcome> {
        if let Some((session, profile)) = self.check_cache().await {
            info!(
                "Reusing stored session for {} ({})",
                profile.display_label(),
                session.issuing_path()
            );
            return Ok(AuthOutcome {
                path: session.issuing_path(),
                session,
                profile,
                reused: true,
                persistence_error: None,
            });
        }

        debug!("State: CredentialDiscovery");
        let (session, profile) = match self.discovery.discover() {
            Discovery::Degraded(identity) => {
                warn!(
                    "No GitHub credential found, creating a local account for {}",
                    identity.handle
                );
                self.local_fallback(&identity)?
            }
            Discovery::Credential(credential) => {
                debug!("State: IdentityFetch");
                let identity = self.resolver.fetch(&credential).await?;
                debug!("Identity resolved: {}", identity.display_label());
                self.exchange(&identity, &credential).await?
            }
        };

        info!(
            "Authenticated {} via {} (tier {})",
            profile.display_label(),
            session.issuing_path(),
            profile.tier
        );
        let persistence_error = self.persist(&session, &profile).await;

        Ok(AuthOutcome {
            path: session.issuing_path(),
            session,
            profile,
            reused: false,
            persistence_error,
        })
    }

    /// Stored session plus profile, if the platform still accepts the session.
    async fn check_cache(&self) -> Option<(Session, Profile)> {
        debug!("State: CheckCache");
        let session = match self.store.load().await {
            Ok(Some(session)) => session,
            Ok(None) => return None,
            Err(e) => {
                warn!("Ignoring unreadable stored session: {}", e);
                return None;
            }
        };

        match self.validator.check(&session).await {
            Validation::Accepted => {}
            Validation::Rejected(reason) => {
                debug!("Stored session rejected: {}", reason);
                return None;
            }
        }

        match self.store.load_profile().await {
            Ok(Some(profile)) => return Some((session, profile)),
            Ok(None) => debug!("Stored session has no profile, refetching"),
            Err(e) => warn!("Ignoring unreadable stored profile: {}", e),
        }

        let info = match self.platform.userinfo(session.token()).await {
            Ok(info) => info,
            Err(e) => {
                warn!("Could not rebuild profile for stored session: {}", e);
                return None;
            }
        };
        let profile = info.standalone_profile();
        if let Err(e) = self.store.save(&session, &profile).await {
            warn!("Failed to store rebuilt profile: {}", e);
        }
        Some((session, profile))
    }

    /// Platform steps, from broker exchange through account linking.
    async fn exchange(&self, identity: &Identity, credential: &Credential) -> Result<(Session, Profile)> {
        debug!("State: BrokerExchange");
        match self.platform.broker_exchange(credential).await {
            Ok(grant) => {
                return self
                    .remote(grant, identity, IssuingPath::BrokerExchange, false)
                    .await;
            }
            Err(e) => debug!("{}", e.into_core_error("broker exchange")),
        }

        debug!("State: DirectGrant");
        match self.platform.direct_grant(credential, GrantMode::Fresh).await {
            Ok(grant) => {
                return self
                    .remote(grant, identity, IssuingPath::DirectGrant, false)
                    .await;
            }
            Err(PlatformError::Unauthorized) => {
                info!("No platform account for {}, registering", identity.handle);
            }
            Err(e) => {
                warn!("{}", e.into_core_error("direct grant"));
                return self.local_fallback(identity);
            }
        }

        debug!("State: Register");
        match self.platform.register(identity, credential).await {
            Ok(grant) => {
                return self
                    .remote(grant, identity, IssuingPath::Registration, true)
                    .await;
            }
            Err(e @ PlatformError::Conflict(_)) => {
                info!("{}", e.into_core_error("registration"));
            }
            Err(e) => {
                warn!("{}", e.into_core_error("registration"));
                return self.local_fallback(identity);
            }
        }

        debug!("State: AccountLink");
        match self.platform.direct_grant(credential, GrantMode::Link).await {
            Ok(grant) => {
                self.remote(grant, identity, IssuingPath::AccountLink, false)
                    .await
            }
            Err(e) => {
                warn!("{}", e.into_core_error("account link"));
                self.local_fallback(identity)
            }
        }
    }

    /// Session from a platform grant, with the profile from userinfo when available.
    async fn remote(
        &self,
        grant: TokenGrant,
        identity: &Identity,
        path: IssuingPath,
        is_new: bool,
    ) -> Result<(Session, Profile)> {
        let created_at = Utc::now();
        let ttl = grant
            .expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| Duration::seconds(secs.min(MAX_REMOTE_TTL_SECS) as i64))
            .unwrap_or_else(|| self.sessions.default_remote_ttl());
        let session = Session::remote(grant.access_token, path, created_at, created_at + ttl)?;

        let profile = match self.platform.userinfo(session.token()).await {
            Ok(info) => info.profile_for(identity, is_new),
            Err(e) => {
                warn!("Userinfo unavailable after {}, using identity values: {}", path, e);
                Profile::from_identity(identity, tier_for(identity), AccountOrigin::Remote, is_new)
            }
        };
        Ok((session, profile))
    }

    /// Offline placeholder account. Makes no network calls.
    fn local_fallback(&self, identity: &Identity) -> Result<(Session, Profile)> {
        debug!("State: LocalFallback");
        let tier = tier_for(identity);
        let now = Utc::now();
        let ttl = self.sessions.local_ttl().max(Duration::minutes(1));
        let claims = LocalClaims {
            sub: format!("local_{}", identity.id),
            email: identity.email.clone(),
            tier,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        let session = Session::local(claims)?;
        let profile = Profile::from_identity(identity, tier, AccountOrigin::Local, true);
        warn!(
            "Using local {} account for {}; platform features are unavailable",
            tier,
            identity.handle
        );
        Ok((session, profile))
    }

    async fn persist(&self, session: &Session, profile: &Profile) -> Option<CoreError> {
        debug!("State: Persist");
        match self.store.save(session, profile).await {
            Ok(()) => None,
            Err(cause) => {
                warn!("Failed to persist session: {}", cause);
                Some(CoreError::PersistenceFailed { cause })
            }
        }
    }
}

#[cfg(test)]
mod tests;
