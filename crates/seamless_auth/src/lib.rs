//! Seamless Auth - session, profile and entitlement storage.
//!
//! This crate holds everything about an authenticated caller that outlives a
//! single process run:
//! - The normalized identity fetched from the identity provider
//! - The static tier catalog (features and limits per entitlement tier)
//! - Platform sessions, including offline placeholder sessions
//! - The per-user session store on disk
//!
//! # Architecture
//!
//! The session and the profile live in two separate owner-only JSON files.
//! They are always written together by a successful authentication, and a
//! reader never observes a partially written file.

pub mod error;
pub mod identity;
pub mod local_token;
pub mod profile;
pub mod session;
pub mod store;
pub mod tier;

pub use error::{AuthError, AuthResult};
pub use identity::{Identity, IdentitySource};
pub use local_token::LocalClaims;
pub use profile::{AccountOrigin, Profile};
pub use session::{IssuingPath, Session, SessionOrigin, TokenKind};
pub use store::SessionStore;
pub use tier::{FeatureSet, Limit, LimitSet, Tier};
