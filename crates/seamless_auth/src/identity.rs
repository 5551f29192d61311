//! Normalized identity records.

use serde::{Deserialize, Serialize};

/// Where an identity record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// Fetched from the identity provider with a credential.
    Provider,
    /// Synthesized from an execution-environment hint (no credential).
    EnvironmentHint,
    /// Synthesized with a time-derived id (no credential, no hint).
    Anonymous,
}

/// Identity fetched from (or synthesized in place of) the identity provider.
///
/// Recomputed on every authentication attempt and never cached across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-scoped unique id.
    pub id: String,
    /// Display login.
    pub handle: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub public_repo_count: u64,
    pub follower_count: u64,
    /// Identity-provider plan name ("free" when the provider reports none).
    pub plan_name: String,
    pub source: IdentitySource,
}

impl Identity {
    /// Minimal identity built from an environment hint such as a workspace owner.
    pub fn from_hint(hint: &str) -> Self {
        Self {
            id: format!("hint_{hint}"),
            handle: hint.to_string(),
            email: None,
            name: None,
            avatar_url: None,
            public_repo_count: 0,
            follower_count: 0,
            plan_name: "free".to_string(),
            source: IdentitySource::EnvironmentHint,
        }
    }

    /// Anonymous identity with the given unique id.
    pub fn anonymous(unique_id: impl Into<String>) -> Self {
        let id = unique_id.into();
        Self {
            handle: format!("anonymous-{id}"),
            id,
            email: None,
            name: None,
            avatar_url: None,
            public_repo_count: 0,
            follower_count: 0,
            plan_name: "free".to_string(),
            source: IdentitySource::Anonymous,
        }
    }

    /// Best human-readable label: email, then name, then handle.
    pub fn display_label(&self) -> &str {
        self.email
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.handle)
    }
}
