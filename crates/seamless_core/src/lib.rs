//! Seamless Core - authentication orchestration
//!
//! Turns a GitHub credential found in the environment (or the lack of one)
//! into a usable platform session without an interactive login. The chain
//! tries a broker token exchange, a direct grant, self-registration and
//! account linking in turn, and falls back to an offline placeholder account
//! when none of them succeed.

pub mod config;
pub mod discovery;
pub mod error;
pub mod identity;
pub mod orchestrator;
pub mod platform;
pub mod validator;

pub use config::SeamlessConfig;
pub use discovery::{Credential, CredentialDiscovery, Discovery, EnvSource, MapEnv, ProcessEnv};
pub use error::{ConfigError, CoreError, Result};
pub use identity::{GitHubIdentityResolver, IdentityResolver};
pub use orchestrator::{AuthOutcome, Orchestrator};
pub use platform::{GrantMode, HttpPlatformClient, PlatformApi, PlatformError, TokenGrant, UserInfo};
pub use validator::{RejectReason, SessionValidator, Validation};
