//! Credential discovery from the execution environment.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use seamless_auth::Identity;
use tracing::debug;

use crate::config::EnvironmentConfig;

/// Opaque third-party bearer credential. Never persisted or logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Read access to environment variables.
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// A fixed set of variables, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MapEnv(HashMap<String, String>);

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.to_string(), value.to_string());
        self
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

/// Result of looking for a credential.
#[derive(Debug, Clone)]
pub enum Discovery {
    Credential(Credential),
    /// No credential; an identity synthesized from hints or anonymously.
    Degraded(Identity),
}

/// Finds the third-party credential, or a fallback identity without one.
#[derive(Clone)]
pub struct CredentialDiscovery {
    config: EnvironmentConfig,
    env: Arc<dyn EnvSource>,
}

impl CredentialDiscovery {
    pub fn new(config: EnvironmentConfig, env: Arc<dyn EnvSource>) -> Self {
        Self { config, env }
    }

    /// First non-blank credential variable, if any.
    pub fn credential(&self) -> Option<Credential> {
        self.first_present(&self.config.credential_vars)
            .map(|(name, value)| {
                debug!("Found credential in ${}", name);
                Credential::new(value)
            })
    }

    /// First non-blank identity hint variable, if any.
    pub fn hint(&self) -> Option<String> {
        self.first_present(&self.config.hint_vars)
            .map(|(name, value)| {
                debug!("Using identity hint from ${}", name);
                value
            })
    }

    pub fn discover(&self) -> Discovery {
        if let Some(credential) = self.credential() {
            return Discovery::Credential(credential);
        }
        let identity = match self.hint() {
            Some(hint) => Identity::from_hint(&hint),
            None => Identity::anonymous(anonymous_id()),
        };
        Discovery::Degraded(identity)
    }

    fn first_present<'a>(&self, names: &'a [String]) -> Option<(&'a str, String)> {
        names.iter().find_map(|name| {
            self.env
                .var(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| (name.as_str(), v))
        })
    }
}

/// Time-derived unique id for anonymous identities.
fn anonymous_id() -> String {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!("anon_{}_{}", Utc::now().timestamp_millis(), &nonce[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use seamless_auth::IdentitySource;

    fn discovery(env: MapEnv) -> CredentialDiscovery {
        CredentialDiscovery::new(EnvironmentConfig::default(), Arc::new(env))
    }

    #[test]
    fn test_credential_vars_in_order() {
        let env = MapEnv::new()
            .with("GH_TOKEN", "second")
            .with("GITHUB_TOKEN", "first");
        assert_eq!(discovery(env).credential(), Some(Credential::new("first")));

        let env = MapEnv::new()
            .with("GITHUB_TOKEN", "   ")
            .with("GH_TOKEN", "second");
        assert_eq!(discovery(env).credential(), Some(Credential::new("second")));
    }

    #[test]
    fn test_degraded_uses_hint() {
        let env = MapEnv::new().with("GITHUB_REPOSITORY_OWNER", "octo-org");
        match discovery(env).discover() {
            Discovery::Degraded(identity) => {
                assert_eq!(identity.handle, "octo-org");
                assert_eq!(identity.source, IdentitySource::EnvironmentHint);
            }
            other => panic!("expected degraded discovery, got {other:?}"),
        }
    }

    #[test]
    fn test_degraded_anonymous_ids_are_unique() {
        let first = match discovery(MapEnv::new()).discover() {
            Discovery::Degraded(identity) => identity,
            other => panic!("expected degraded discovery, got {other:?}"),
        };
        let second = match discovery(MapEnv::new()).discover() {
            Discovery::Degraded(identity) => identity,
            other => panic!("expected degraded discovery, got {other:?}"),
        };
        assert_eq!(first.source, IdentitySource::Anonymous);
        assert!(first.id.starts_with("anon_"));
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("ghp_secret");
        assert!(!format!("{credential:?}").contains("ghp_secret"));
    }
}
