//! Resolved account profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::tier::{FeatureSet, LimitSet, Tier};

/// Whether the account lives on the platform or only on this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountOrigin {
    Remote,
    Local,
}

/// The authenticated user's resolved state.
///
/// Superseded, never merged, by every successful re-authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Identity-provider id.
    pub id: String,
    pub handle: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub public_repo_count: u64,
    pub follower_count: u64,
    pub plan_name: String,
    /// Platform account id (`sub` for remote accounts, `local_<id>` otherwise).
    pub platform_user_id: Option<String>,
    pub tier: Tier,
    pub features: FeatureSet,
    pub limits: LimitSet,
    pub origin: AccountOrigin,
    pub is_new: bool,
    pub authenticated_at: DateTime<Utc>,
}

impl Profile {
    /// Build a profile from an identity at the given tier.
    pub fn from_identity(
        identity: &Identity,
        tier: Tier,
        origin: AccountOrigin,
        is_new: bool,
    ) -> Self {
        let platform_user_id = match origin {
            AccountOrigin::Local => Some(format!("local_{}", identity.id)),
            AccountOrigin::Remote => None,
        };
        Self {
            id: identity.id.clone(),
            handle: identity.handle.clone(),
            email: identity.email.clone(),
            name: identity.name.clone(),
            avatar_url: identity.avatar_url.clone(),
            public_repo_count: identity.public_repo_count,
            follower_count: identity.follower_count,
            plan_name: identity.plan_name.clone(),
            platform_user_id,
            tier,
            features: tier.features(),
            limits: tier.limits(),
            origin,
            is_new,
            authenticated_at: Utc::now(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.origin == AccountOrigin::Local
    }

    /// Best human-readable label: email, then name, then handle.
    pub fn display_label(&self) -> &str {
        self.email
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.handle)
    }
}
