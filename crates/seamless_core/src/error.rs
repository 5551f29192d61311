use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration-specific errors
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(String),

    #[error("Invalid value for field {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error("Identity provider unavailable: {details}")]
    #[diagnostic(
        code(seamless_core::identity_unavailable),
        help("The GitHub credential was rejected or the identity provider could not be reached. Check GITHUB_TOKEN and network access")
    )]
    IdentityUnavailable { details: String },

    #[error("Platform {step} failed: {details}")]
    #[diagnostic(
        code(seamless_core::exchange_failed),
        help("The platform could not be reached or refused the request")
    )]
    ExchangeFailed { step: String, details: String },

    #[error("Platform account already exists: {details}")]
    #[diagnostic(
        code(seamless_core::conflict_detected),
        help("An account with this identity already exists; it will be linked instead")
    )]
    ConflictDetected { details: String },

    #[error("Failed to persist session")]
    #[diagnostic(
        code(seamless_core::persistence_failed),
        help("The session is usable for this run but was not saved to disk")
    )]
    PersistenceFailed {
        #[source]
        cause: seamless_auth::AuthError,
    },

    #[error("Session storage error: {0}")]
    #[diagnostic(
        code(seamless_core::storage_error),
        help("Check the session directory permissions")
    )]
    Storage(#[from] seamless_auth::AuthError),

    #[error("Configuration error for field '{field}'")]
    #[diagnostic(
        code(seamless_core::configuration_error),
        help("Check configuration file at {config_path}\nExpected: {expected}")
    )]
    ConfigurationError {
        config_path: String,
        field: String,
        expected: String,
        #[source]
        cause: ConfigError,
    },

    #[error("HTTP client setup failed: {details}")]
    #[diagnostic(code(seamless_core::http_client))]
    HttpClient { details: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
