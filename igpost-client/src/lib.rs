//! Client for the external Instagram private-API gateway.
//!
//! All protocol-level work (login, request signing, media upload) happens
//! behind the gateway; this crate only speaks its HTTP surface. The
//! [`InstagramApi`] trait is the seam the backend and tests share:
//! production code uses [`GatewayClient`], tests use [`stub::StubInstagram`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub mod stub;

/// Default timeout for gateway requests. Clip uploads can take a while.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Header carrying the Instagram session token on authenticated calls.
const SESSION_HEADER: &str = "x-ig-session";

/// Errors surfaced by gateway interactions.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The gateway rejected the credentials or the session is no longer valid.
    #[error("login required: credentials rejected or session expired")]
    LoginRequired,
    /// The gateway answered with a non-auth failure status.
    #[error("gateway returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gateway response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Opaque session token allowing reauthentication without username/password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionToken").field(&"[REDACTED]").finish()
    }
}

/// Account profile as reported by the gateway. Fields the gateway returns
/// beyond the known set are preserved in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub follower_count: Option<u64>,
    #[serde(default)]
    pub following_count: Option<u64>,
    #[serde(default)]
    pub media_count: Option<u64>,
    #[serde(default)]
    pub is_private: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Outcome of a clip upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaUpload {
    /// Media primary key assigned by Instagram.
    pub media_id: String,
    /// Short code used in post URLs, when the gateway reports one.
    #[serde(default)]
    pub code: Option<String>,
}

impl MediaUpload {
    /// Public post URL, when a short code is available.
    #[must_use]
    pub fn permalink(&self) -> Option<String> {
        self.code
            .as_ref()
            .map(|code| format!("https://www.instagram.com/p/{code}/"))
    }
}

/// Where the video bytes come from.
#[derive(Debug, Clone)]
pub enum VideoSource {
    /// Bytes received from the caller, e.g. a multipart upload.
    Bytes { filename: String, data: Bytes },
    /// A path readable by the gateway host.
    Path(PathBuf),
}

/// Operations the wrapped Instagram client exposes to the façade.
#[async_trait]
pub trait InstagramApi: Send + Sync + 'static {
    /// Fresh username/password login, yielding a new session token.
    async fn login(&self, username: &str, password: &str) -> Result<SessionToken, ClientError>;

    /// Validate a saved session token. `ClientError::LoginRequired` means the
    /// session is dead and the caller should fall back to a fresh login.
    async fn resume(&self, token: &SessionToken) -> Result<(), ClientError>;

    /// Fetch the authenticated account's profile.
    async fn account_info(&self, token: &SessionToken) -> Result<AccountInfo, ClientError>;

    /// Upload a video clip with the given caption.
    async fn clip_upload(
        &self,
        token: &SessionToken,
        source: VideoSource,
        caption: &str,
    ) -> Result<MediaUpload, ClientError>;
}

/// reqwest-backed client for the gateway's HTTP surface.
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    auth_token: Option<Arc<str>>,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl GatewayClient {
    /// Create a client builder for the given gateway base URL.
    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> GatewayClientBuilder {
        GatewayClientBuilder {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            auth_token: None,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

/// Builder for [`GatewayClient`].
#[derive(Debug)]
pub struct GatewayClientBuilder {
    base_url: String,
    timeout: Duration,
    auth_token: Option<String>,
}

impl GatewayClientBuilder {
    /// Override the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bearer token the gateway itself requires, if any.
    #[must_use]
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn build(self) -> Result<GatewayClient, ClientError> {
        let http = reqwest::Client::builder().timeout(self.timeout).build()?;
        Ok(GatewayClient {
            http,
            base_url: self.base_url.into(),
            auth_token: self.auth_token.map(Into::into),
        })
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    session_token: String,
}

#[derive(Serialize)]
struct ResumeRequest<'a> {
    session_token: &'a str,
}

/// Convert a non-success gateway response into the matching error.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        Err(ClientError::LoginRequired)
    } else {
        Err(ClientError::Upstream {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl InstagramApi for GatewayClient {
    async fn login(&self, username: &str, password: &str) -> Result<SessionToken, ClientError> {
        debug!(%username, "logging in via gateway");
        let req = self
            .http
            .post(self.endpoint("/auth/login"))
            .json(&LoginRequest { username, password });
        let resp = check_status(self.apply_auth(req).send().await?).await?;
        let body: LoginResponse = resp.json().await?;
        Ok(SessionToken(body.session_token))
    }

    async fn resume(&self, token: &SessionToken) -> Result<(), ClientError> {
        debug!("validating saved session via gateway");
        let req = self
            .http
            .post(self.endpoint("/auth/resume"))
            .json(&ResumeRequest {
                session_token: token.as_str(),
            });
        check_status(self.apply_auth(req).send().await?).await?;
        Ok(())
    }

    async fn account_info(&self, token: &SessionToken) -> Result<AccountInfo, ClientError> {
        let req = self
            .http
            .get(self.endpoint("/account/info"))
            .header(SESSION_HEADER, token.as_str());
        let resp = check_status(self.apply_auth(req).send().await?).await?;
        Ok(resp.json().await?)
    }

    async fn clip_upload(
        &self,
        token: &SessionToken,
        source: VideoSource,
        caption: &str,
    ) -> Result<MediaUpload, ClientError> {
        let mut form = reqwest::multipart::Form::new().text("caption", caption.to_string());
        form = match source {
            VideoSource::Bytes { filename, data } => {
                let mime = mime_guess::from_path(&filename)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string();
                let part = reqwest::multipart::Part::bytes(data.to_vec())
                    .file_name(filename)
                    .mime_str(&mime)
                    .map_err(ClientError::Http)?;
                form.part("video", part)
            }
            VideoSource::Path(path) => form.text("video_path", path.display().to_string()),
        };

        let req = self
            .http
            .post(self.endpoint("/media/clip-upload"))
            .header(SESSION_HEADER, token.as_str())
            .multipart(form);
        let resp = check_status(self.apply_auth(req).send().await?).await?;
        let media: MediaUpload = resp.json().await?;
        debug!(media_id = %media.media_id, "clip upload acknowledged by gateway");
        Ok(media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permalink_requires_code() {
        let with_code = MediaUpload {
            media_id: "314159".into(),
            code: Some("C0FFEE".into()),
        };
        assert_eq!(
            with_code.permalink().as_deref(),
            Some("https://www.instagram.com/p/C0FFEE/")
        );

        let without = MediaUpload {
            media_id: "314159".into(),
            code: None,
        };
        assert_eq!(without.permalink(), None);
    }

    #[test]
    fn session_token_debug_is_redacted() {
        let token = SessionToken::from("very-secret");
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("very-secret"));
    }

    #[test]
    fn account_info_preserves_unknown_fields() {
        let raw = serde_json::json!({
            "username": "alice",
            "follower_count": 42,
            "external_url": "https://example.com"
        });
        let info: AccountInfo = serde_json::from_value(raw).expect("decode");
        assert_eq!(info.username, "alice");
        assert_eq!(info.follower_count, Some(42));
        assert_eq!(
            info.extra.get("external_url").and_then(|v| v.as_str()),
            Some("https://example.com")
        );
    }
}
