//! Configuration system for seamless authentication
//!
//! Every field has a default, so a missing config file still yields a working
//! setup pointed at the production platform.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use seamless_auth::SessionStore;
use seamless_auth::store::{PROFILE_FILE, SESSION_FILE};

use crate::Result;
use crate::error::{ConfigError, CoreError};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeamlessConfig {
    pub platform: PlatformConfig,
    pub identity_provider: IdentityProviderConfig,
    pub storage: StorageConfig,
    pub timeouts: TimeoutConfig,
    pub environment: EnvironmentConfig,
    pub sessions: SessionConfig,
}

impl SeamlessConfig {
    /// Check the values that can't be expressed in the type system.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (field, value) in [
            ("platform.base_url", &self.platform.base_url),
            ("identity_provider.api_url", &self.identity_provider.api_url),
        ] {
            url::Url::parse(value).map_err(|e| ConfigError::InvalidValue {
                field: field.to_string(),
                reason: e.to_string(),
            })?;
        }
        if self.environment.credential_vars.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "environment.credential_vars".to_string(),
                reason: "at least one variable name is required".to_string(),
            });
        }
        if self.sessions.local_ttl_hours == 0 || self.sessions.default_remote_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sessions".to_string(),
                reason: "session lifetimes must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Platform (OpenID Connect realm) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub base_url: String,
    pub realm: String,
    pub client_id: String,
    pub scope: String,
    /// Shown to local and free accounts after authentication.
    pub upgrade_url: String,
}

impl PlatformConfig {
    fn openid_base(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect",
            self.base_url.trim_end_matches('/'),
            self.realm
        )
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/token", self.openid_base())
    }

    pub fn registration_endpoint(&self) -> String {
        format!("{}/registrations", self.openid_base())
    }

    pub fn userinfo_endpoint(&self) -> String {
        format!("{}/userinfo", self.openid_base())
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: "https://auth.services.vyges.com".to_string(),
            realm: "vyges".to_string(),
            client_id: "profile-service".to_string(),
            scope: "openid profile email subscription_plan".to_string(),
            upgrade_url: "https://profile.services.vyges.com".to_string(),
        }
    }
}

/// Identity provider (GitHub REST API) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityProviderConfig {
    pub api_url: String,
    pub user_agent: String,
}

impl IdentityProviderConfig {
    pub fn user_endpoint(&self) -> String {
        format!("{}/user", self.api_url.trim_end_matches('/'))
    }
}

impl Default for IdentityProviderConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            user_agent: concat!("seamless-auth/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Where the session and profile files live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub dir: PathBuf,
    /// Overrides `<dir>/session.json`.
    pub session_file: Option<PathBuf>,
    /// Overrides `<dir>/profile.json`.
    pub profile_file: Option<PathBuf>,
}

impl StorageConfig {
    pub fn session_path(&self) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(|| self.dir.join(SESSION_FILE))
    }

    pub fn profile_path(&self) -> PathBuf {
        self.profile_file
            .clone()
            .unwrap_or_else(|| self.dir.join(PROFILE_FILE))
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.session_path(), self.profile_path())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".seamless"),
            session_file: None,
            profile_file: None,
        }
    }
}

/// Per-call network timeouts, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub validation_secs: u64,
    pub identity_secs: u64,
    pub exchange_secs: u64,
}

impl TimeoutConfig {
    pub fn validation(&self) -> Duration {
        Duration::from_secs(self.validation_secs)
    }

    pub fn identity(&self) -> Duration {
        Duration::from_secs(self.identity_secs)
    }

    pub fn exchange(&self) -> Duration {
        Duration::from_secs(self.exchange_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            validation_secs: 5,
            identity_secs: 10,
            exchange_secs: 15,
        }
    }
}

/// Environment variables consulted during credential discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Checked in order; the first non-blank value is the credential.
    pub credential_vars: Vec<String>,
    /// Identity hints used only when no credential is present.
    pub hint_vars: Vec<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            credential_vars: vec!["GITHUB_TOKEN".to_string(), "GH_TOKEN".to_string()],
            hint_vars: vec![
                "GITHUB_USER".to_string(),
                "GITHUB_REPOSITORY_OWNER".to_string(),
                "CODESPACE_NAME".to_string(),
            ],
        }
    }
}

/// Session lifetimes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lifetime of offline placeholder sessions.
    pub local_ttl_hours: u32,
    /// Used when the platform does not report `expires_in`.
    pub default_remote_ttl_secs: u64,
}

impl SessionConfig {
    pub fn local_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.local_ttl_hours))
    }

    pub fn default_remote_ttl(&self) -> chrono::Duration {
        // Clamp to a decade; chrono panics on out-of-range durations.
        let secs = self.default_remote_ttl_secs.min(10 * 365 * 24 * 3600);
        chrono::Duration::seconds(secs as i64)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            local_ttl_hours: 24,
            default_remote_ttl_secs: 3600,
        }
    }
}

/// Load configuration from a TOML file
pub async fn load_config(path: &Path) -> Result<SeamlessConfig> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        CoreError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "file".to_string(),
            expected: "readable TOML file".to_string(),
            cause: ConfigError::Io(e.to_string()),
        }
    })?;

    let config: SeamlessConfig =
        toml::from_str(&content).map_err(|e| CoreError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "content".to_string(),
            expected: "valid TOML configuration".to_string(),
            cause: ConfigError::TomlParse(e.to_string()),
        })?;

    config
        .validate()
        .map_err(|cause| CoreError::ConfigurationError {
            config_path: path.display().to_string(),
            field: match &cause {
                ConfigError::InvalidValue { field, .. } => field.clone(),
                _ => "content".to_string(),
            },
            expected: "valid configuration values".to_string(),
            cause,
        })?;

    Ok(config)
}

/// Candidate config locations, most specific first.
pub fn standard_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from("seamless.toml")];
    if let Some(config_dir) = dirs::config_dir() {
        locations.push(config_dir.join("seamless").join("config.toml"));
    }
    locations
}

/// Load from the first standard location that exists, or fall back to defaults.
pub async fn load_config_from_standard_locations() -> Result<SeamlessConfig> {
    for path in standard_locations() {
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!("Loading config from {}", path.display());
            return load_config(&path).await;
        }
    }
    tracing::debug!("No config file found, using defaults");
    Ok(SeamlessConfig::default())
}

/// Save configuration to a TOML file
pub async fn save_config(config: &SeamlessConfig, path: &Path) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            CoreError::ConfigurationError {
                config_path: parent.display().to_string(),
                field: "directory".to_string(),
                expected: "writable directory".to_string(),
                cause: ConfigError::Io(e.to_string()),
            }
        })?;
    }

    let content = toml::to_string_pretty(config).map_err(|e| CoreError::ConfigurationError {
        config_path: path.display().to_string(),
        field: "serialization".to_string(),
        expected: "serializable config structure".to_string(),
        cause: ConfigError::TomlSerialize(e.to_string()),
    })?;

    tokio::fs::write(path, content)
        .await
        .map_err(|e| CoreError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "file".to_string(),
            expected: "writable file location".to_string(),
            cause: ConfigError::Io(e.to_string()),
        })?;

    Ok(())
}
