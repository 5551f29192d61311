//! Error types for seamless_auth.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for auth storage operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur while building, encoding or storing sessions.
#[derive(Debug, Error, Diagnostic)]
pub enum AuthError {
    /// IO error.
    #[error("IO error while {operation} {path}: {source}")]
    #[diagnostic(
        code(seamless_auth::io),
        help("Check that the session directory is writable by the current user")
    )]
    Io {
        operation: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    #[diagnostic(code(seamless_auth::serde))]
    Serde(#[from] serde_json::Error),

    /// A session whose expiry does not come after its creation time.
    #[error("Invalid session: expires_at ({expires_at}) must be after created_at ({created_at})")]
    #[diagnostic(code(seamless_auth::invalid_session))]
    InvalidSession {
        created_at: String,
        expires_at: String,
    },

    /// A placeholder token that cannot be decoded.
    #[error("Malformed local token: {0}")]
    #[diagnostic(
        code(seamless_auth::malformed_local_token),
        help("Local tokens have the shape <header>.<claims>.local")
    )]
    MalformedLocalToken(String),
}

impl AuthError {
    pub(crate) fn io(operation: &'static str, path: &std::path::Path, source: std::io::Error) -> Self {
        AuthError::Io {
            operation,
            path: path.display().to_string(),
            source,
        }
    }
}
