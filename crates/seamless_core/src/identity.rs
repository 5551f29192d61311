//! Identity resolution against the identity provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use seamless_auth::{Identity, IdentitySource};
use tracing::debug;

use crate::config::IdentityProviderConfig;
use crate::discovery::Credential;
use crate::error::{CoreError, Result};

/// Fetches the normalized identity behind a credential.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Any failure is `CoreError::IdentityUnavailable`.
    async fn fetch(&self, credential: &Credential) -> Result<Identity>;
}

/// GitHub `GET /user`.
#[derive(Debug, Clone)]
pub struct GitHubIdentityResolver {
    http: reqwest::Client,
    user_endpoint: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: u64,
    login: String,
    email: Option<String>,
    name: Option<String>,
    avatar_url: Option<String>,
    #[serde(default)]
    public_repos: u64,
    #[serde(default)]
    followers: u64,
    plan: Option<GitHubPlan>,
}

#[derive(Debug, Deserialize)]
struct GitHubPlan {
    name: String,
}

impl From<GitHubUser> for Identity {
    fn from(user: GitHubUser) -> Self {
        Identity {
            id: user.id.to_string(),
            handle: user.login,
            email: user.email,
            name: user.name,
            avatar_url: user.avatar_url,
            public_repo_count: user.public_repos,
            follower_count: user.followers,
            plan_name: user
                .plan
                .map(|p| p.name)
                .unwrap_or_else(|| "free".to_string()),
            source: IdentitySource::Provider,
        }
    }
}

impl GitHubIdentityResolver {
    pub fn new(config: &IdentityProviderConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| CoreError::HttpClient {
                details: e.to_string(),
            })?;
        Ok(Self::with_client(http, config, timeout))
    }

    pub fn with_client(
        http: reqwest::Client,
        config: &IdentityProviderConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            user_endpoint: config.user_endpoint(),
            timeout,
        }
    }
}

fn unavailable(details: impl Into<String>) -> CoreError {
    CoreError::IdentityUnavailable {
        details: details.into(),
    }
}

#[async_trait]
impl IdentityResolver for GitHubIdentityResolver {
    async fn fetch(&self, credential: &Credential) -> Result<Identity> {
        let response = self
            .http
            .get(&self.user_endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("token {}", credential.expose()),
            )
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| unavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("identity provider returned HTTP {status}")));
        }

        let user: GitHubUser = response
            .json()
            .await
            .map_err(|e| unavailable(format!("malformed identity response: {e}")))?;

        debug!("Resolved identity {} ({})", user.login, user.id);
        Ok(user.into())
    }
}
