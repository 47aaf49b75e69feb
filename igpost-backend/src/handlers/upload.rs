use std::sync::Arc;

use axum::extract::{Extension, Multipart};
use axum::Json;
use bytes::Bytes;
use igpost_client::VideoSource;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::resolve::{resolve_session, Credentials};
use crate::state::AppState;

/// Collected multipart form fields for an upload request.
#[derive(Default)]
struct UploadForm {
    video: Option<(String, Bytes)>,
    video_path: Option<String>,
    description: Option<String>,
    credentials: Credentials,
}

/// POST /upload (multipart/form-data)
///
/// Exactly one of `video` (uploaded bytes) or `video_path` (a path readable
/// by the gateway host) must be present; an ambiguous or missing source is
/// rejected with 400 before any credential or network work happens.
pub async fn upload(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = collect_form(multipart).await?;

    let source = match (form.video, form.video_path) {
        (Some((filename, data)), None) => VideoSource::Bytes { filename, data },
        (None, Some(path)) => VideoSource::Path(path.into()),
        (Some(_), Some(_)) => {
            return Err(ApiError::bad_request(
                "provide exactly one of video and video_path, not both",
            ))
        }
        (None, None) => {
            return Err(ApiError::bad_request(
                "provide exactly one of video and video_path",
            ))
        }
    };
    let caption = form
        .description
        .ok_or_else(|| ApiError::bad_request("description is required"))?;

    let token = resolve_session(&state, &form.credentials).await?;
    let media = state
        .client
        .clip_upload(&token, source, &caption)
        .await
        .map_err(ApiError::from)?;
    info!(media_id = %media.media_id, "clip uploaded");

    Ok(Json(json!({
        "media_id": media.media_id,
        "code": media.code,
        "url": media.permalink(),
        "status": "ok",
    })))
}

async fn collect_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };
        match name.as_str() {
            "video" => {
                let filename = field
                    .file_name()
                    .filter(|f| !f.is_empty())
                    .unwrap_or("upload.mp4")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("could not read video: {e}")))?;
                // Browsers submit an empty file part when no file was chosen.
                if !data.is_empty() {
                    form.video = Some((filename, data));
                }
            }
            "video_path" => form.video_path = read_text(field, &name).await?,
            "description" => {
                if let Some(text) = read_text(field, &name).await? {
                    form.description = Some(text);
                }
            }
            "username" => form.credentials.username = read_text(field, &name).await?,
            "password" => form.credentials.password = read_text(field, &name).await?,
            "session_id" => form.credentials.session_id = read_text(field, &name).await?,
            "session_file" => form.credentials.session_file = read_text(field, &name).await?,
            _ => {}
        }
    }

    Ok(form)
}

/// Read a text field, treating an empty value as absent.
async fn read_text(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<Option<String>, ApiError> {
    let text = field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("could not read field {name}: {e}")))?;
    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}
