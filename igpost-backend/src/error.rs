use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use igpost_client::ClientError;
use igpost_session::SessionStoreError;

/// Top-level API error shared by all route handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("authentication error: {0}")]
    Authentication(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("session store error: {0}")]
    Session(#[from] SessionStoreError),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::SerdeJson(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = json!({ "error": self.to_string() });
        (status, Json(payload)).into_response()
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }
}

impl From<ClientError> for ApiError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::LoginRequired => {
                ApiError::Authentication("credentials rejected or session expired".into())
            }
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn errors_map_to_expected_statuses() {
        assert_eq!(
            status_of(ApiError::bad_request("ambiguous video source")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::authentication("no viable credential")),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ApiError::Upstream("gateway down".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(ApiError::Unexpected("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn login_required_becomes_401() {
        let err: ApiError = ClientError::LoginRequired.into();
        assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn upstream_failure_becomes_502() {
        let err: ApiError = ClientError::Upstream {
            status: 500,
            message: "internal".into(),
        }
        .into();
        assert_eq!(status_of(err), StatusCode::BAD_GATEWAY);
    }
}
