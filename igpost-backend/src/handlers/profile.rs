use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::Json;
use igpost_client::AccountInfo;

use crate::error::ApiError;
use crate::resolve::{resolve_session, Credentials};
use crate::state::AppState;

/// GET /profile
///
/// Resolves credentials (session id, saved session, or username/password),
/// then returns the account profile as reported by the wrapped client.
pub async fn profile(
    Extension(state): Extension<Arc<AppState>>,
    Query(credentials): Query<Credentials>,
) -> Result<Json<AccountInfo>, ApiError> {
    let token = resolve_session(&state, &credentials).await?;
    let info = state
        .client
        .account_info(&token)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(info))
}
