use std::path::Path;

use pretty_assertions::assert_eq;
use seamless_auth::{IdentitySource, Tier};

use super::*;
use crate::config::EnvironmentConfig;
use crate::discovery::MapEnv;
use crate::identity::MockIdentityResolver;
use crate::platform::{MockPlatformApi, UserInfo};

const CREDENTIAL: &str = "ghp_test_credential";

fn identity() -> Identity {
    Identity {
        id: "583231".to_string(),
        handle: "mona".to_string(),
        email: Some("mona@example.com".to_string()),
        name: Some("Mona Lisa".to_string()),
        avatar_url: None,
        public_repo_count: 60,
        follower_count: 4,
        plan_name: "free".to_string(),
        source: IdentitySource::Provider,
    }
}

fn grant(token: &str) -> TokenGrant {
    TokenGrant {
        access_token: token.to_string(),
        expires_in: Some(3600),
    }
}

fn userinfo(plan: &str) -> UserInfo {
    UserInfo {
        sub: "platform-user-1".to_string(),
        email: Some("mona@example.com".to_string()),
        subscription_plan: Some(plan.to_string()),
        ..Default::default()
    }
}

fn with_credential() -> MapEnv {
    MapEnv::new().with("GITHUB_TOKEN", CREDENTIAL)
}

fn resolver_ok() -> MockIdentityResolver {
    let mut resolver = MockIdentityResolver::new();
    resolver
        .expect_fetch()
        .withf(|credential| credential.expose() == CREDENTIAL)
        .times(1)
        .returning(|_| Ok(identity()));
    resolver
}

fn orchestrator(
    store: SessionStore,
    resolver: MockIdentityResolver,
    platform: MockPlatformApi,
    env: MapEnv,
) -> Orchestrator {
    Orchestrator::new(
        Arc::new(resolver),
        Arc::new(platform),
        store,
        CredentialDiscovery::new(EnvironmentConfig::default(), Arc::new(env)),
        SessionConfig::default(),
    )
}

async fn seed_remote_session(dir: &Path) -> Session {
    let store = SessionStore::in_dir(dir);
    let now = Utc::now();
    let session = Session::remote(
        "cached-token",
        IssuingPath::DirectGrant,
        now - Duration::minutes(10),
        now + Duration::hours(1),
    )
    .unwrap();
    let profile = Profile::from_identity(&identity(), Tier::Basic, AccountOrigin::Remote, false);
    store.save(&session, &profile).await.unwrap();
    session
}

#[tokio::test]
async fn test_no_credential_goes_local_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let mut resolver = MockIdentityResolver::new();
    resolver.expect_fetch().times(0);
    let mut platform = MockPlatformApi::new();
    platform.expect_broker_exchange().times(0);
    platform.expect_direct_grant().times(0);
    platform.expect_register().times(0);
    platform.expect_userinfo().times(0);

    let env = MapEnv::new().with("GITHUB_USER", "octo");
    let orch = orchestrator(SessionStore::in_dir(dir.path()), resolver, platform, env);
    let outcome = orch.authenticate().await.unwrap();

    assert_eq!(outcome.path, IssuingPath::LocalFallback);
    assert!(outcome.session.is_local());
    assert!(outcome.session.token().ends_with(".local"));
    assert_eq!(outcome.profile.handle, "octo");
    assert_eq!(outcome.profile.tier, Tier::Free);
    assert_eq!(outcome.profile.origin, AccountOrigin::Local);
    assert!(outcome.profile.is_new);
    assert!(!outcome.reused);
    assert!(outcome.persistence_error.is_none());

    let stored = orch.store().load().await.unwrap().unwrap();
    assert_eq!(stored, outcome.session);
}

#[tokio::test]
async fn test_broker_exchange_success() {
    let dir = tempfile::tempdir().unwrap();
    let mut platform = MockPlatformApi::new();
    platform
        .expect_broker_exchange()
        .times(1)
        .returning(|_| Ok(grant("broker-token")));
    platform.expect_direct_grant().times(0);
    platform
        .expect_userinfo()
        .withf(|token| token == "broker-token")
        .times(1)
        .returning(|_| Ok(userinfo("pro")));

    let orch = orchestrator(
        SessionStore::in_dir(dir.path()),
        resolver_ok(),
        platform,
        with_credential(),
    );
    let outcome = orch.authenticate().await.unwrap();

    assert_eq!(outcome.path, IssuingPath::BrokerExchange);
    assert_eq!(outcome.session.token(), "broker-token");
    assert_eq!(outcome.session.remote_token(), Some("broker-token"));
    assert_eq!(outcome.profile.tier, Tier::Pro);
    assert_eq!(outcome.profile.platform_user_id.as_deref(), Some("platform-user-1"));
    assert!(!outcome.profile.is_new);

    let ttl = outcome.session.expires_at() - outcome.session.created_at();
    assert_eq!(ttl, Duration::seconds(3600));
    assert_eq!(orch.store().load_profile().await.unwrap(), Some(outcome.profile));
}

#[tokio::test]
async fn test_unknown_account_registers() {
    let dir = tempfile::tempdir().unwrap();
    let mut platform = MockPlatformApi::new();
    platform
        .expect_broker_exchange()
        .times(1)
        .returning(|_| {
            Err(PlatformError::Rejected {
                status: 400,
                body: "unsupported_grant_type".to_string(),
            })
        });
    platform
        .expect_direct_grant()
        .withf(|_, mode| *mode == GrantMode::Fresh)
        .times(1)
        .returning(|_, _| Err(PlatformError::Unauthorized));
    platform
        .expect_register()
        .withf(|identity, _| identity.handle == "mona")
        .times(1)
        .returning(|_, _| Ok(grant("registered-token")));
    platform
        .expect_userinfo()
        .times(1)
        .returning(|_| Ok(userinfo("free")));

    let orch = orchestrator(
        SessionStore::in_dir(dir.path()),
        resolver_ok(),
        platform,
        with_credential(),
    );
    let outcome = orch.authenticate().await.unwrap();

    assert_eq!(outcome.path, IssuingPath::Registration);
    assert!(outcome.profile.is_new);
    assert_eq!(outcome.profile.origin, AccountOrigin::Remote);
    assert_eq!(outcome.session.token(), "registered-token");
}

#[tokio::test]
async fn test_conflict_links_existing_account() {
    let dir = tempfile::tempdir().unwrap();
    let mut platform = MockPlatformApi::new();
    platform
        .expect_broker_exchange()
        .returning(|_| Err(PlatformError::Transport("connection refused".to_string())));
    platform
        .expect_direct_grant()
        .withf(|_, mode| *mode == GrantMode::Fresh)
        .times(1)
        .returning(|_, _| Err(PlatformError::Unauthorized));
    platform
        .expect_register()
        .times(1)
        .returning(|_, _| Err(PlatformError::Conflict("user exists".to_string())));
    platform
        .expect_direct_grant()
        .withf(|_, mode| *mode == GrantMode::Link)
        .times(1)
        .returning(|_, _| Ok(grant("linked-token")));
    platform
        .expect_userinfo()
        .times(1)
        .returning(|_| Ok(userinfo("basic")));

    let orch = orchestrator(
        SessionStore::in_dir(dir.path()),
        resolver_ok(),
        platform,
        with_credential(),
    );
    let outcome = orch.authenticate().await.unwrap();

    assert_eq!(outcome.path, IssuingPath::AccountLink);
    assert_eq!(outcome.session.token(), "linked-token");
    assert_eq!(outcome.profile.tier, Tier::Basic);
    assert!(!outcome.profile.is_new);
}

#[tokio::test]
async fn test_conflict_then_link_failure_goes_local() {
    let dir = tempfile::tempdir().unwrap();
    let mut platform = MockPlatformApi::new();
    platform
        .expect_broker_exchange()
        .returning(|_| Err(PlatformError::Unauthorized));
    platform
        .expect_direct_grant()
        .withf(|_, mode| *mode == GrantMode::Fresh)
        .returning(|_, _| Err(PlatformError::Unauthorized));
    platform
        .expect_register()
        .returning(|_, _| Err(PlatformError::Conflict("already registered".to_string())));
    platform
        .expect_direct_grant()
        .withf(|_, mode| *mode == GrantMode::Link)
        .times(1)
        .returning(|_, _| Err(PlatformError::Transport("timed out".to_string())));
    platform.expect_userinfo().times(0);

    let orch = orchestrator(
        SessionStore::in_dir(dir.path()),
        resolver_ok(),
        platform,
        with_credential(),
    );
    let outcome = orch.authenticate().await.unwrap();

    assert_eq!(outcome.path, IssuingPath::LocalFallback);
    // 60 public repositories
    assert_eq!(outcome.profile.tier, Tier::Basic);
    assert_eq!(outcome.profile.platform_user_id.as_deref(), Some("local_583231"));
    assert!(outcome.profile.is_new);
    match outcome.session.origin() {
        seamless_auth::SessionOrigin::Local(claims) => {
            assert_eq!(claims.sub, "local_583231");
            assert_eq!(claims.tier, Tier::Basic);
            assert_eq!(claims.email.as_deref(), Some("mona@example.com"));
            assert_eq!(claims.exp - claims.iat, 24 * 3600);
        }
        other => panic!("expected a local session, got {other:?}"),
    }
}

#[tokio::test]
async fn test_direct_grant_server_error_skips_registration() {
    let dir = tempfile::tempdir().unwrap();
    let mut platform = MockPlatformApi::new();
    platform
        .expect_broker_exchange()
        .returning(|_| Err(PlatformError::Unauthorized));
    platform.expect_direct_grant().times(1).returning(|_, _| {
        Err(PlatformError::Rejected {
            status: 503,
            body: "maintenance".to_string(),
        })
    });
    platform.expect_register().times(0);

    let orch = orchestrator(
        SessionStore::in_dir(dir.path()),
        resolver_ok(),
        platform,
        with_credential(),
    );
    let outcome = orch.authenticate().await.unwrap();
    assert_eq!(outcome.path, IssuingPath::LocalFallback);
}

#[tokio::test]
async fn test_registration_failure_goes_local() {
    let dir = tempfile::tempdir().unwrap();
    let mut platform = MockPlatformApi::new();
    platform
        .expect_broker_exchange()
        .returning(|_| Err(PlatformError::Unauthorized));
    platform
        .expect_direct_grant()
        .times(1)
        .returning(|_, _| Err(PlatformError::Unauthorized));
    platform.expect_register().times(1).returning(|_, _| {
        Err(PlatformError::Rejected {
            status: 500,
            body: "boom".to_string(),
        })
    });

    let orch = orchestrator(
        SessionStore::in_dir(dir.path()),
        resolver_ok(),
        platform,
        with_credential(),
    );
    let outcome = orch.authenticate().await.unwrap();
    assert_eq!(outcome.path, IssuingPath::LocalFallback);
    assert!(outcome.session.remote_token().is_none());
}

#[tokio::test]
async fn test_identity_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut resolver = MockIdentityResolver::new();
    resolver.expect_fetch().times(1).returning(|_| {
        Err(CoreError::IdentityUnavailable {
            details: "identity provider returned HTTP 401".to_string(),
        })
    });
    let mut platform = MockPlatformApi::new();
    platform.expect_broker_exchange().times(0);
    platform.expect_direct_grant().times(0);

    let orch = orchestrator(
        SessionStore::in_dir(dir.path()),
        resolver,
        platform,
        with_credential(),
    );
    let err = orch.authenticate().await.unwrap_err();
    assert!(matches!(err, CoreError::IdentityUnavailable { .. }));
    assert!(orch.store().load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_accepted_cache_short_circuits() {
    let dir = tempfile::tempdir().unwrap();
    let cached = seed_remote_session(dir.path()).await;

    let mut resolver = MockIdentityResolver::new();
    resolver.expect_fetch().times(0);
    let mut platform = MockPlatformApi::new();
    platform
        .expect_validate()
        .withf(|token| token == "cached-token")
        .times(1)
        .returning(|_| Ok(()));
    platform.expect_broker_exchange().times(0);
    platform.expect_direct_grant().times(0);
    platform.expect_register().times(0);
    platform.expect_userinfo().times(0);

    let orch = orchestrator(
        SessionStore::in_dir(dir.path()),
        resolver,
        platform,
        with_credential(),
    );
    let outcome = orch.authenticate().await.unwrap();

    assert!(outcome.reused);
    assert_eq!(outcome.session, cached);
    assert_eq!(outcome.path, IssuingPath::DirectGrant);
    assert_eq!(outcome.profile.tier, Tier::Basic);
}

#[tokio::test]
async fn test_rejected_cache_runs_chain() {
    let dir = tempfile::tempdir().unwrap();
    seed_remote_session(dir.path()).await;

    let mut platform = MockPlatformApi::new();
    platform
        .expect_validate()
        .times(1)
        .returning(|_| Err(PlatformError::Unauthorized));
    platform
        .expect_broker_exchange()
        .times(1)
        .returning(|_| Ok(grant("fresh-token")));
    platform
        .expect_userinfo()
        .returning(|_| Ok(userinfo("free")));

    let orch = orchestrator(
        SessionStore::in_dir(dir.path()),
        resolver_ok(),
        platform,
        with_credential(),
    );
    let outcome = orch.authenticate().await.unwrap();
    assert!(!outcome.reused);
    assert_eq!(outcome.session.token(), "fresh-token");

    let stored = orch.store().load().await.unwrap().unwrap();
    assert_eq!(stored.token(), "fresh-token");
}

#[tokio::test]
async fn test_cached_session_without_profile_refetches_userinfo() {
    let dir = tempfile::tempdir().unwrap();
    seed_remote_session(dir.path()).await;
    let store = SessionStore::in_dir(dir.path());
    std::fs::remove_file(store.profile_path()).unwrap();

    let mut resolver = MockIdentityResolver::new();
    resolver.expect_fetch().times(0);
    let mut platform = MockPlatformApi::new();
    platform.expect_validate().times(1).returning(|_| Ok(()));
    platform
        .expect_userinfo()
        .times(1)
        .returning(|_| Ok(userinfo("max")));

    let orch = orchestrator(store, resolver, platform, with_credential());
    let outcome = orch.authenticate().await.unwrap();

    assert!(outcome.reused);
    assert_eq!(outcome.profile.tier, Tier::Max);
    assert_eq!(outcome.profile.id, "platform-user-1");
    assert_eq!(
        orch.store().load_profile().await.unwrap().map(|p| p.tier),
        Some(Tier::Max)
    );
}

#[tokio::test]
async fn test_userinfo_failure_keeps_token() {
    let dir = tempfile::tempdir().unwrap();
    let mut platform = MockPlatformApi::new();
    platform
        .expect_broker_exchange()
        .returning(|_| Err(PlatformError::Unauthorized));
    platform.expect_direct_grant().times(1).returning(|_, _| {
        Ok(TokenGrant {
            access_token: "granted-token".to_string(),
            expires_in: None,
        })
    });
    platform
        .expect_userinfo()
        .times(1)
        .returning(|_| Err(PlatformError::Transport("timed out".to_string())));

    let orch = orchestrator(
        SessionStore::in_dir(dir.path()),
        resolver_ok(),
        platform,
        with_credential(),
    );
    let outcome = orch.authenticate().await.unwrap();

    assert_eq!(outcome.path, IssuingPath::DirectGrant);
    assert_eq!(outcome.session.token(), "granted-token");
    assert_eq!(outcome.profile.origin, AccountOrigin::Remote);
    assert_eq!(outcome.profile.tier, Tier::Basic);
    assert_eq!(
        outcome.session.expires_at() - outcome.session.created_at(),
        SessionConfig::default().default_remote_ttl()
    );
}

#[tokio::test]
async fn test_persistence_failure_is_reported_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let orch = orchestrator(
        SessionStore::in_dir(blocker.join("state")),
        MockIdentityResolver::new(),
        MockPlatformApi::new(),
        MapEnv::new(),
    );
    let outcome = orch.authenticate().await.unwrap();

    assert_eq!(outcome.path, IssuingPath::LocalFallback);
    assert!(matches!(
        outcome.persistence_error,
        Some(CoreError::PersistenceFailed { .. })
    ));
}
