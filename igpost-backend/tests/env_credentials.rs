//! Environment credential fallback lives in its own test binary because it
//! mutates process-wide environment variables.

use std::sync::Arc;

use igpost_backend::resolve::{resolve_session, Credentials};
use igpost_backend::state::AppState;
use igpost_client::stub::StubInstagram;
use igpost_config::Config;

#[tokio::test]
async fn env_credentials_fill_in_when_request_has_none() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = Config::default();
    config.session.file = dir.path().join("session.json");
    let stub = Arc::new(StubInstagram::new().with_credentials("env-user", "env-pass"));
    let state = AppState::new(config, stub.clone());

    std::env::set_var("IG_USERNAME", "env-user");
    std::env::set_var("IG_PASSWORD", "env-pass");
    let result = resolve_session(&state, &Credentials::default()).await;
    std::env::remove_var("IG_USERNAME");
    std::env::remove_var("IG_PASSWORD");

    result.expect("env credentials accepted");
    assert_eq!(stub.login_calls(), 1);

    // the login was persisted under the environment username
    let contents =
        std::fs::read_to_string(dir.path().join("session.json")).expect("session file");
    let saved: serde_json::Value = serde_json::from_str(&contents).expect("json");
    assert_eq!(saved["env-user"], "stub-session-token");
}
