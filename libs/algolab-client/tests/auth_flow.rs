mod common;

use algolab_client::api::HttpApi;
use algolab_client::cache::ResponseCache;
use algolab_client::error::ApiError;
use algolab_client::session::{AuthPhase, AuthSession, FileSessionStore};
use algolab_common::config::ClientConfig;
use algolab_common::types::ProblemSummary;
use common::{StubGrader, ACCESS_TOKEN, MFA_CODE, PASSWORD};
use reqwest::StatusCode;

async fn setup() -> (StubGrader, ClientConfig, tempfile::TempDir) {
    let grader = StubGrader::start(vec![]).await;
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig {
        api_url: grader.base_url.clone(),
        state_dir: dir.path().to_path_buf(),
        ..ClientConfig::default()
    };
    (grader, config, dir)
}

#[tokio::test]
async fn test_mfa_login_then_logout() {
    let (_grader, config, _dir) = setup().await;
    let api = HttpApi::new(&config).unwrap();
    let cache = ResponseCache::new(config.cache_dir());
    let mut session = AuthSession::restore(FileSessionStore::new(config.session_path()))
        .unwrap()
        .with_cache(cache.clone());

    let login = api.login("mfa.user@example.test", PASSWORD).await.unwrap();
    assert!(login.mfa_required);
    let mfa_token = login.mfa_token.unwrap();
    session.login_started(mfa_token.clone()).unwrap();
    assert_eq!(session.phase(), AuthPhase::MfaPending);

    let verified = api.verify_mfa(&mfa_token, MFA_CODE).await.unwrap();
    session.complete_mfa(verified.access_token).unwrap();
    assert_eq!(session.phase(), AuthPhase::Authenticated);
    assert_eq!(session.access_token(), Some(ACCESS_TOKEN));

    let authed = api.clone().with_token(session.access_token().map(String::from));
    let problems = authed.list_problems().await.unwrap();
    assert_eq!(problems.len(), 2);
    cache.put("problems", &problems).unwrap();

    authed.logout().await.unwrap();
    session.logout().unwrap();

    assert_eq!(session.phase(), AuthPhase::Unauthenticated);
    assert!(!config.session_path().exists());
    assert!(cache.get::<Vec<ProblemSummary>>("problems").unwrap().is_none());
}

#[tokio::test]
async fn test_login_without_mfa() {
    let (_grader, config, _dir) = setup().await;
    let api = HttpApi::new(&config).unwrap();
    let mut session = AuthSession::restore(FileSessionStore::new(config.session_path())).unwrap();

    let login = api.login("plain@example.test", PASSWORD).await.unwrap();
    assert!(!login.mfa_required);
    session.login_completed(login.access_token).unwrap();

    let restored = AuthSession::restore(FileSessionStore::new(config.session_path())).unwrap();
    assert_eq!(restored.phase(), AuthPhase::Authenticated);
}

#[tokio::test]
async fn test_rejected_credentials_and_codes() {
    let (_grader, config, _dir) = setup().await;
    let api = HttpApi::new(&config).unwrap();

    let err = api.login("plain@example.test", "wrong").await.unwrap_err();
    assert!(matches!(
        &err,
        ApiError::Server { status, message }
            if *status == StatusCode::UNAUTHORIZED && message == "Invalid email or password"
    ));

    let err = api.verify_mfa("mfa-someone", "000000").await.unwrap_err();
    assert!(err.to_string().contains("Invalid verification code"));
}

#[tokio::test]
async fn test_listing_requires_token() {
    let (_grader, config, _dir) = setup().await;
    let api = HttpApi::new(&config).unwrap();

    let err = api.list_problems().await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status, .. } if status == StatusCode::UNAUTHORIZED));
    assert!(!err.is_transient());
}
