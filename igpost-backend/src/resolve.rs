//! Credential resolution: turn whatever the caller supplied into an
//! authenticated session token.
//!
//! Priority order: explicit session id, then the stored session file, then a
//! fresh username/password login. A fresh login persists its token to the
//! session file for the next request.

use std::path::PathBuf;

use igpost_client::{ClientError, SessionToken};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{error::ApiError, state::AppState};

/// Credential fields accepted by every authenticated endpoint, as query
/// parameters on `/profile` and form fields on `/upload`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub session_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Overrides the configured session file path for this request.
    pub session_file: Option<String>,
}

impl Credentials {
    /// Fill username/password from `IG_USERNAME`/`IG_PASSWORD` when the
    /// request carried neither, matching the original CLI's environment
    /// fallback. Request-supplied values always win.
    fn with_env_fallback(mut self) -> Self {
        if self.username.is_none() && self.password.is_none() {
            if let (Ok(user), Ok(pass)) =
                (std::env::var("IG_USERNAME"), std::env::var("IG_PASSWORD"))
            {
                debug!("using credentials from environment");
                self.username = Some(user);
                self.password = Some(pass);
            }
        }
        self
    }

    fn session_path(&self, state: &AppState) -> PathBuf {
        self.session_file
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| state.config.session.file.clone())
    }
}

/// Resolve an authenticated session token for the given credentials.
///
/// An explicit session id is validated as-is and never falls back to a
/// password login. A token from the session file that the gateway rejects
/// falls back to a fresh login when a username/password pair is available.
pub async fn resolve_session(
    state: &AppState,
    credentials: &Credentials,
) -> Result<SessionToken, ApiError> {
    let credentials = credentials.clone().with_env_fallback();
    let session_path = credentials.session_path(state);

    // 1. Explicit session id takes priority over everything else.
    if let Some(session_id) = &credentials.session_id {
        debug!("validating caller-supplied session id");
        let token = SessionToken::from(session_id.as_str());
        state.client.resume(&token).await.map_err(ApiError::from)?;
        return Ok(token);
    }

    // 2. Saved session from the file, keyed by username when we have one.
    let stored = match &credentials.username {
        Some(username) => state.sessions.load(&session_path, username).await?,
        None => state
            .sessions
            .single_account(&session_path)
            .await?
            .map(|(_, token)| token),
    };
    if let Some(stored) = stored {
        debug!(path = %session_path.display(), "trying saved session token");
        let token = SessionToken::from(stored);
        match state.client.resume(&token).await {
            Ok(()) => {
                debug!("authenticated via saved session");
                return Ok(token);
            }
            Err(ClientError::LoginRequired) => {
                info!("saved session rejected; falling back to password login");
            }
            Err(other) => return Err(other.into()),
        }
    }

    // 3. Fresh username/password login.
    let (Some(username), Some(password)) = (&credentials.username, &credentials.password) else {
        return Err(ApiError::authentication(
            "no viable credential: supply session_id or username and password",
        ));
    };
    let token = state
        .client
        .login(username, password)
        .await
        .map_err(ApiError::from)?;
    info!(%username, "authenticated via username/password");

    // A failed persist is logged but does not fail the request.
    if let Err(e) = state
        .sessions
        .save(&session_path, username, token.as_str())
        .await
    {
        warn!(error = %e, path = %session_path.display(), "failed to persist session token");
    }

    Ok(token)
}
