//! File-backed session store.
//!
//! Session and profile are stored as two owner-only JSON files. Every write
//! goes to a uniquely named temp file in the destination directory, is synced,
//! and is then renamed over the target, so concurrent readers see either the
//! old file or the new one.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{AuthError, AuthResult};
use crate::profile::Profile;
use crate::session::Session;

pub const SESSION_FILE: &str = "session.json";
pub const PROFILE_FILE: &str = "profile.json";

/// Persisted session + profile pair.
#[derive(Debug, Clone)]
pub struct SessionStore {
    session_path: PathBuf,
    profile_path: PathBuf,
}

impl SessionStore {
    pub fn new(session_path: impl Into<PathBuf>, profile_path: impl Into<PathBuf>) -> Self {
        Self {
            session_path: session_path.into(),
            profile_path: profile_path.into(),
        }
    }

    /// Store both files in one directory under their default names.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(SESSION_FILE), dir.join(PROFILE_FILE))
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    pub fn profile_path(&self) -> &Path {
        &self.profile_path
    }

    /// Load the stored session. A missing file is `None`, not an error.
    pub async fn load(&self) -> AuthResult<Option<Session>> {
        let Some(raw) = read_optional(&self.session_path).await? else {
            debug!("No stored session at {}", self.session_path.display());
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Load the stored profile. A missing file is `None`, not an error.
    pub async fn load_profile(&self) -> AuthResult<Option<Profile>> {
        let Some(raw) = read_optional(&self.profile_path).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Write session and profile as a pair.
    ///
    /// Both payloads are staged before either is renamed into place. The
    /// profile is committed first, so a readable session always has its
    /// profile next to it.
    pub async fn save(&self, session: &Session, profile: &Profile) -> AuthResult<()> {
        let session_bytes = serde_json::to_vec_pretty(session)?;
        let profile_bytes = serde_json::to_vec_pretty(profile)?;

        let staged_profile = stage(&self.profile_path, &profile_bytes).await?;
        let staged_session = match stage(&self.session_path, &session_bytes).await {
            Ok(path) => path,
            Err(e) => {
                discard(&staged_profile).await;
                return Err(e);
            }
        };

        if let Err(e) = commit(&staged_profile, &self.profile_path).await {
            discard(&staged_profile).await;
            discard(&staged_session).await;
            return Err(e);
        }
        if let Err(e) = commit(&staged_session, &self.session_path).await {
            discard(&staged_session).await;
            return Err(e);
        }

        info!(
            "Saved {} session to {}",
            session.issuing_path(),
            self.session_path.display()
        );
        Ok(())
    }
}

async fn read_optional(path: &Path) -> AuthResult<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AuthError::io("reading", path, e)),
    }
}

/// Write `bytes` to a fresh owner-only temp file next to `target`.
async fn stage(target: &Path, bytes: &[u8]) -> AuthResult<PathBuf> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_private_dir(&parent).await?;

    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "seamless".to_string());
    let temp_path = parent.join(format!(
        ".{file_name}.{}.tmp",
        uuid::Uuid::new_v4().simple()
    ));

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(&temp_path)
        .await
        .map_err(|e| AuthError::io("creating", &temp_path, e))?;

    let written = async {
        file.write_all(bytes).await?;
        file.sync_all().await
    }
    .await;

    if let Err(e) = written {
        discard(&temp_path).await;
        return Err(AuthError::io("writing", &temp_path, e));
    }
    Ok(temp_path)
}

async fn commit(staged: &Path, target: &Path) -> AuthResult<()> {
    tokio::fs::rename(staged, target)
        .await
        .map_err(|e| AuthError::io("replacing", target, e))
}

async fn discard(staged: &Path) {
    if let Err(e) = tokio::fs::remove_file(staged).await {
        debug!("Could not remove temp file {}: {}", staged.display(), e);
    }
}

async fn ensure_private_dir(dir: &Path) -> AuthResult<()> {
    if tokio::fs::try_exists(dir).await.unwrap_or(false) {
        return Ok(());
    }
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);
    builder
        .create(dir)
        .await
        .map_err(|e| AuthError::io("creating directory", dir, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::local_token::LocalClaims;
    use crate::profile::AccountOrigin;
    use crate::session::IssuingPath;
    use crate::tier::Tier;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn remote_session(token: &str) -> Session {
        let now = Utc::now();
        Session::remote(token, IssuingPath::DirectGrant, now, now + Duration::hours(1)).unwrap()
    }

    fn profile() -> Profile {
        Profile::from_identity(
            &Identity::from_hint("octocat"),
            Tier::Free,
            AccountOrigin::Remote,
            false,
        )
    }

    #[tokio::test]
    async fn test_load_missing_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path());
        assert!(store.load().await.unwrap().is_none());
        assert!(store.load_profile().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path().join("nested").join("dir"));

        let session = remote_session("token-1");
        let profile = profile();
        store.save(&session, &profile).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(session));
        assert_eq!(store.load_profile().await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_local_session_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path());
        let now = Utc::now().timestamp();
        let session = Session::local(LocalClaims {
            sub: "local_1".to_string(),
            email: Some("a@b.c".to_string()),
            tier: Tier::Basic,
            iat: now,
            exp: now + 60,
        })
        .unwrap();

        store.save(&session, &profile()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_save_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path());

        store.save(&remote_session("first"), &profile()).await.unwrap();
        store.save(&remote_session("second"), &profile()).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.token(), "second");

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["profile.json", "session.json"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path().join("private"));
        store.save(&remote_session("t"), &profile()).await.unwrap();

        for path in [store.session_path(), store.profile_path()] {
            let mode = std::fs::metadata(path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600, "{}", path.display());
        }
        let dir_mode = std::fs::metadata(dir.path().join("private"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(dir_mode & 0o777, 0o700);
    }

    #[tokio::test]
    async fn test_corrupt_session_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path());
        std::fs::write(store.session_path(), "{ not json").unwrap();
        assert!(matches!(store.load().await, Err(AuthError::Serde(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_never_expose_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SessionStore::in_dir(dir.path()));
        store.save(&remote_session("seed"), &profile()).await.unwrap();

        let mut writers = Vec::new();
        for writer in 0..8 {
            let store = store.clone();
            writers.push(tokio::spawn(async move {
                for round in 0..25 {
                    // Long tokens make a torn write visible as invalid JSON.
                    let token = format!("{writer}-{round}-{}", "x".repeat(4096));
                    store.save(&remote_session(&token), &profile()).await.unwrap();
                }
            }));
        }

        let reader = {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..500 {
                    let session = store.load().await.expect("session file must always parse");
                    assert!(session.is_some());
                    let profile = store.load_profile().await.expect("profile must always parse");
                    assert!(profile.is_some());
                    tokio::task::yield_now().await;
                }
            })
        };

        for writer in writers {
            writer.await.unwrap();
        }
        reader.await.unwrap();

        let final_session = store.load().await.unwrap().unwrap();
        assert!(final_session.token().ends_with(&"x".repeat(4096)));
    }
}
