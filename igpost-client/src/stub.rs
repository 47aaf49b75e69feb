//! Test-only in-memory implementation of [`InstagramApi`].
//!
//! Records which operations were invoked so tests can assert that a handler
//! never reached for a credential path it must not use.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{AccountInfo, ClientError, InstagramApi, MediaUpload, SessionToken, VideoSource};

/// In-memory stand-in for the gateway.
///
/// By default any username/password pair is accepted and a fixed token is
/// issued; `resume` accepts only tokens this stub issued or was told about
/// via [`StubInstagram::accept_token`].
#[derive(Debug, Default)]
pub struct StubInstagram {
    credentials: Option<(String, String)>,
    deny_logins: bool,
    issued_token: Option<String>,
    valid_tokens: Mutex<HashSet<String>>,
    login_calls: AtomicUsize,
    resume_calls: AtomicUsize,
    info_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    last_caption: Mutex<Option<String>>,
}

impl StubInstagram {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept only this username/password pair.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Token returned by successful logins (default `"stub-session-token"`).
    #[must_use]
    pub fn issuing_token(mut self, token: impl Into<String>) -> Self {
        self.issued_token = Some(token.into());
        self
    }

    /// Mark a token as resumable, as if a prior login had issued it.
    #[must_use]
    pub fn accept_token(self, token: impl Into<String>) -> Self {
        self.valid_tokens
            .lock()
            .expect("stub lock")
            .insert(token.into());
        self
    }

    /// Reject every login attempt.
    #[must_use]
    pub fn deny_logins(mut self) -> Self {
        self.deny_logins = true;
        self
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn resume_calls(&self) -> usize {
        self.resume_calls.load(Ordering::SeqCst)
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    /// Total calls of any kind, for "no network was touched" assertions.
    pub fn total_calls(&self) -> usize {
        self.login_calls() + self.resume_calls() + self.info_calls() + self.upload_calls()
    }

    /// Caption passed to the most recent upload, if any.
    pub fn last_caption(&self) -> Option<String> {
        self.last_caption.lock().expect("stub lock").clone()
    }

    fn issued(&self) -> String {
        self.issued_token
            .clone()
            .unwrap_or_else(|| "stub-session-token".to_string())
    }

    fn is_valid(&self, token: &SessionToken) -> bool {
        self.valid_tokens
            .lock()
            .expect("stub lock")
            .contains(token.as_str())
    }
}

#[async_trait]
impl InstagramApi for StubInstagram {
    async fn login(&self, username: &str, password: &str) -> Result<SessionToken, ClientError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if self.deny_logins {
            return Err(ClientError::LoginRequired);
        }
        if let Some((expected_user, expected_pass)) = &self.credentials {
            if expected_user != username || expected_pass != password {
                return Err(ClientError::LoginRequired);
            }
        }
        let token = self.issued();
        self.valid_tokens
            .lock()
            .expect("stub lock")
            .insert(token.clone());
        Ok(SessionToken::from(token))
    }

    async fn resume(&self, token: &SessionToken) -> Result<(), ClientError> {
        self.resume_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_valid(token) {
            Ok(())
        } else {
            Err(ClientError::LoginRequired)
        }
    }

    async fn account_info(&self, token: &SessionToken) -> Result<AccountInfo, ClientError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        if !self.is_valid(token) {
            return Err(ClientError::LoginRequired);
        }
        Ok(AccountInfo {
            username: "stub_account".to_string(),
            full_name: Some("Stub Account".to_string()),
            biography: Some("test fixture".to_string()),
            follower_count: Some(7),
            following_count: Some(11),
            media_count: Some(3),
            is_private: Some(false),
            extra: Default::default(),
        })
    }

    async fn clip_upload(
        &self,
        token: &SessionToken,
        _source: VideoSource,
        caption: &str,
    ) -> Result<MediaUpload, ClientError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if !self.is_valid(token) {
            return Err(ClientError::LoginRequired);
        }
        *self.last_caption.lock().expect("stub lock") = Some(caption.to_string());
        Ok(MediaUpload {
            media_id: "3141592653589793238".to_string(),
            code: Some("C0FFEE".to_string()),
        })
    }
}
