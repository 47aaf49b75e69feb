use std::sync::Arc;

use igpost_backend::resolve::{resolve_session, Credentials};
use igpost_backend::state::AppState;
use igpost_client::stub::StubInstagram;
use igpost_config::Config;

fn make_state(stub: Arc<StubInstagram>, session_file: &std::path::Path) -> AppState {
    let mut config = Config::default();
    config.session.file = session_file.to_path_buf();
    AppState::new(config, stub)
}

#[tokio::test]
async fn explicit_session_id_wins_over_stored_token() {
    let dir = tempfile::tempdir().expect("tempdir");
    let session_file = dir.path().join("session.json");
    std::fs::write(&session_file, r#"{"alice":"stored-token"}"#).expect("seed");
    let stub = Arc::new(
        StubInstagram::new()
            .accept_token("stored-token")
            .accept_token("explicit-token"),
    );
    let state = make_state(stub, &session_file);

    let credentials = Credentials {
        session_id: Some("explicit-token".into()),
        username: Some("alice".into()),
        ..Default::default()
    };
    let token = resolve_session(&state, &credentials).await.expect("resolve");
    assert_eq!(token.as_str(), "explicit-token");
}

#[tokio::test]
async fn single_stored_record_resolves_without_username() {
    let dir = tempfile::tempdir().expect("tempdir");
    let session_file = dir.path().join("session.json");
    std::fs::write(&session_file, r#"{"bob":"tok-bob"}"#).expect("seed");
    let stub = Arc::new(StubInstagram::new().accept_token("tok-bob"));
    let state = make_state(stub.clone(), &session_file);

    let token = resolve_session(&state, &Credentials::default())
        .await
        .expect("resolve");
    assert_eq!(token.as_str(), "tok-bob");
    assert_eq!(stub.login_calls(), 0);
}

#[tokio::test]
async fn ambiguous_session_file_requires_credentials() {
    let dir = tempfile::tempdir().expect("tempdir");
    let session_file = dir.path().join("session.json");
    std::fs::write(&session_file, r#"{"alice":"tok-a","bob":"tok-b"}"#).expect("seed");
    let stub = Arc::new(StubInstagram::new());
    let state = make_state(stub.clone(), &session_file);

    let err = resolve_session(&state, &Credentials::default())
        .await
        .expect_err("no viable credential");
    assert!(err.to_string().contains("no viable credential"));
    assert_eq!(stub.total_calls(), 0);
}

#[tokio::test]
async fn failed_session_persist_does_not_fail_the_login() {
    let dir = tempfile::tempdir().expect("tempdir");
    // a file where the session file's parent directory should be makes the
    // persist step fail
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"in the way").expect("blocker");
    let session_file = blocker.join("session.json");

    let stub = Arc::new(StubInstagram::new().with_credentials("alice", "s3cret"));
    let state = make_state(stub, &session_file);

    let credentials = Credentials {
        username: Some("alice".into()),
        password: Some("s3cret".into()),
        ..Default::default()
    };
    let token = resolve_session(&state, &credentials).await.expect("resolve");
    assert_eq!(token.as_str(), "stub-session-token");
}

#[tokio::test]
async fn request_session_file_override_is_used() {
    let dir = tempfile::tempdir().expect("tempdir");
    let override_file = dir.path().join("alt.json");
    std::fs::write(&override_file, r#"{"alice":"tok-alt"}"#).expect("seed");
    let stub = Arc::new(StubInstagram::new().accept_token("tok-alt"));
    let state = make_state(stub, &dir.path().join("default.json"));

    let credentials = Credentials {
        username: Some("alice".into()),
        session_file: Some(override_file.display().to_string()),
        ..Default::default()
    };
    let token = resolve_session(&state, &credentials).await.expect("resolve");
    assert_eq!(token.as_str(), "tok-alt");
}
