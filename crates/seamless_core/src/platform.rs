//! Platform token endpoints.
//!
//! The platform is an OpenID Connect realm that accepts a GitHub credential in
//! place of an interactive login. Every call here is a single attempt with its
//! own timeout; retries and fallbacks belong to the orchestrator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use seamless_auth::{AccountOrigin, Identity, Profile, Tier};
use thiserror::Error;
use tracing::debug;

use crate::config::{PlatformConfig, TimeoutConfig};
use crate::discovery::Credential;
use crate::error::{CoreError, Result};

pub const TOKEN_EXCHANGE_GRANT: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
pub const GITHUB_TOKEN_GRANT: &str = "urn:ietf:params:oauth:grant-type:github-token";
pub const ACCESS_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:access_token";

/// Failure of a single platform call.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("credential not recognized by the platform")]
    Unauthorized,

    #[error("account conflict: {0}")]
    Conflict(String),

    #[error("platform returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed platform response: {0}")]
    Malformed(String),
}

impl PlatformError {
    /// Fold into the surfaced error kind for the given chain step.
    pub fn into_core_error(self, step: &str) -> CoreError {
        match self {
            PlatformError::Conflict(details) => CoreError::ConflictDetected { details },
            other => CoreError::ExchangeFailed {
                step: step.to_string(),
                details: other.to_string(),
            },
        }
    }
}

/// Access token issued by the platform.
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Userinfo claims the platform reports for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub subscription_plan: Option<String>,
}

impl UserInfo {
    /// Platform tier; a missing plan is `free`.
    pub fn tier(&self) -> Tier {
        self.subscription_plan
            .as_deref()
            .map(Tier::parse)
            .unwrap_or(Tier::Free)
    }

    /// Remote profile for `identity`, with the platform's view taking precedence.
    pub fn profile_for(&self, identity: &Identity, is_new: bool) -> Profile {
        let mut profile = Profile::from_identity(identity, self.tier(), AccountOrigin::Remote, is_new);
        profile.platform_user_id = Some(self.sub.clone());
        if self.email.is_some() {
            profile.email = self.email.clone();
        }
        if self.name.is_some() {
            profile.name = self.name.clone();
        }
        profile
    }

    /// Remote profile when no identity is at hand (cached session, lost profile).
    pub fn standalone_profile(&self) -> Profile {
        let handle = self
            .preferred_username
            .clone()
            .unwrap_or_else(|| self.sub.clone());
        let identity = Identity {
            id: self.sub.clone(),
            handle,
            email: self.email.clone(),
            name: self.name.clone(),
            avatar_url: None,
            public_repo_count: 0,
            follower_count: 0,
            plan_name: "free".to_string(),
            source: seamless_auth::IdentitySource::Provider,
        };
        self.profile_for(&identity, false)
    }
}

/// How the direct grant is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantMode {
    /// Normal sign-in.
    Fresh,
    /// Attach the credential to an existing account without a fresh prompt.
    Link,
}

/// Remote platform operations used by the authentication chain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Token exchange presenting the GitHub credential as the subject token.
    async fn broker_exchange(&self, credential: &Credential) -> std::result::Result<TokenGrant, PlatformError>;

    /// Custom GitHub-token grant. 401 means the account does not exist yet.
    async fn direct_grant(
        &self,
        credential: &Credential,
        mode: GrantMode,
    ) -> std::result::Result<TokenGrant, PlatformError>;

    /// Self-registration. An existing account is `PlatformError::Conflict`.
    async fn register(
        &self,
        identity: &Identity,
        credential: &Credential,
    ) -> std::result::Result<TokenGrant, PlatformError>;

    async fn userinfo(&self, token: &str) -> std::result::Result<UserInfo, PlatformError>;

    /// `Ok` only on a success status from the userinfo endpoint.
    async fn validate(&self, token: &str) -> std::result::Result<(), PlatformError>;
}

/// `PlatformApi` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPlatformClient {
    http: reqwest::Client,
    config: PlatformConfig,
    exchange_timeout: Duration,
    userinfo_timeout: Duration,
    validation_timeout: Duration,
}

#[derive(Serialize)]
struct RegistrationRequest<'a> {
    github_user: RegistrationUser<'a>,
    github_token: &'a str,
    auto_register: bool,
    client_id: &'a str,
}

#[derive(Serialize)]
struct RegistrationUser<'a> {
    id: &'a str,
    login: &'a str,
    email: Option<&'a str>,
    name: Option<&'a str>,
    avatar_url: Option<&'a str>,
    public_repos: u64,
    followers: u64,
    plan: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
}

impl ErrorBody {
    fn summary(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.error, &self.error_description, &self.message]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        (!parts.is_empty()).then(|| parts.join(": "))
    }
}

impl HttpPlatformClient {
    pub fn new(config: &PlatformConfig, timeouts: &TimeoutConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("seamless/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CoreError::HttpClient {
                details: e.to_string(),
            })?;
        Ok(Self::with_client(http, config, timeouts))
    }

    pub fn with_client(http: reqwest::Client, config: &PlatformConfig, timeouts: &TimeoutConfig) -> Self {
        Self {
            http,
            config: config.clone(),
            exchange_timeout: timeouts.exchange(),
            userinfo_timeout: timeouts.identity(),
            validation_timeout: timeouts.validation(),
        }
    }

    async fn post_token_form(&self, fields: &[(&str, &str)]) -> std::result::Result<TokenGrant, PlatformError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let response = self
            .http
            .post(self.config.token_endpoint())
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(reqwest::header::ACCEPT, "application/json")
            .body(body)
            .timeout(self.exchange_timeout)
            .send()
            .await
            .map_err(transport)?;
        read_grant(response).await
    }

    async fn get_userinfo(
        &self,
        token: &str,
        timeout: Duration,
    ) -> std::result::Result<reqwest::Response, PlatformError> {
        let response = self
            .http
            .get(self.config.userinfo_endpoint())
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify(status, &body))
    }
}

#[async_trait]
impl PlatformApi for HttpPlatformClient {
    async fn broker_exchange(&self, credential: &Credential) -> std::result::Result<TokenGrant, PlatformError> {
        debug!("POST {} (token exchange)", self.config.token_endpoint());
        self.post_token_form(&[
            ("grant_type", TOKEN_EXCHANGE_GRANT),
            ("subject_token", credential.expose()),
            ("subject_issuer", "github"),
            ("subject_token_type", ACCESS_TOKEN_TYPE),
            ("client_id", self.config.client_id.as_str()),
        ])
        .await
    }

    async fn direct_grant(
        &self,
        credential: &Credential,
        mode: GrantMode,
    ) -> std::result::Result<TokenGrant, PlatformError> {
        debug!("POST {} (direct grant, {:?})", self.config.token_endpoint(), mode);
        let mut fields = vec![
            ("grant_type", GITHUB_TOKEN_GRANT),
            ("client_id", self.config.client_id.as_str()),
            ("github_token", credential.expose()),
            ("scope", self.config.scope.as_str()),
        ];
        if mode == GrantMode::Link {
            fields.push(("link_existing", "true"));
            fields.push(("prompt", "none"));
        }
        self.post_token_form(&fields).await
    }

    async fn register(
        &self,
        identity: &Identity,
        credential: &Credential,
    ) -> std::result::Result<TokenGrant, PlatformError> {
        let endpoint = self.config.registration_endpoint();
        debug!("POST {} for {}", endpoint, identity.handle);
        let request = RegistrationRequest {
            github_user: RegistrationUser {
                id: &identity.id,
                login: &identity.handle,
                email: identity.email.as_deref(),
                name: identity.name.as_deref(),
                avatar_url: identity.avatar_url.as_deref(),
                public_repos: identity.public_repo_count,
                followers: identity.follower_count,
                plan: &identity.plan_name,
            },
            github_token: credential.expose(),
            auto_register: true,
            client_id: &self.config.client_id,
        };
        let response = self
            .http
            .post(endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&request)
            .timeout(self.exchange_timeout)
            .send()
            .await
            .map_err(transport)?;
        read_grant(response).await
    }

    async fn userinfo(&self, token: &str) -> std::result::Result<UserInfo, PlatformError> {
        let response = self.get_userinfo(token, self.userinfo_timeout).await?;
        response
            .json()
            .await
            .map_err(|e| PlatformError::Malformed(e.to_string()))
    }

    async fn validate(&self, token: &str) -> std::result::Result<(), PlatformError> {
        self.get_userinfo(token, self.validation_timeout).await.map(|_| ())
    }
}

fn transport(err: reqwest::Error) -> PlatformError {
    if err.is_timeout() {
        PlatformError::Transport(format!("timed out: {err}"))
    } else {
        PlatformError::Transport(err.to_string())
    }
}

async fn read_grant(response: reqwest::Response) -> std::result::Result<TokenGrant, PlatformError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| PlatformError::Transport(format!("read body: {e}")))?;

    if !status.is_success() {
        return Err(classify(status, &body));
    }

    let grant: TokenGrant =
        serde_json::from_str(&body).map_err(|e| PlatformError::Malformed(e.to_string()))?;
    if grant.access_token.is_empty() {
        return Err(PlatformError::Malformed("no access token received".to_string()));
    }
    Ok(grant)
}

/// Map a non-success response to a `PlatformError`.
pub(crate) fn classify(status: StatusCode, body: &str) -> PlatformError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let summary = parsed.summary().unwrap_or_else(|| body.trim().to_string());

    match status {
        StatusCode::UNAUTHORIZED => PlatformError::Unauthorized,
        StatusCode::CONFLICT => PlatformError::Conflict(summary),
        s if s.is_client_error() && mentions_conflict(&summary) => PlatformError::Conflict(summary),
        s => PlatformError::Rejected {
            status: s.as_u16(),
            body: summary,
        },
    }
}

fn mentions_conflict(message: &str) -> bool {
    let message = message.to_lowercase();
    ["already", "exist", "conflict"]
        .iter()
        .any(|needle| message.contains(needle))
}
