use axum::Json;
use axum::extract::{Multipart, State};
use serde::Serialize;
use vidgen_core::domain::UploadKind;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub file_path: String,
    pub file_type: UploadKind,
}

/// POST /api/upload
///
/// Multipart fields: `file` (required) and `type` (`image` or `video`,
/// default `image`).
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut kind = UploadKind::Image;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("type") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                kind = text
                    .trim()
                    .parse()
                    .map_err(|e: vidgen_core::domain::upload::UnknownUploadKind| {
                        AppError::BadRequest(e.to_string())
                    })?;
            }
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                file = Some((name, data.to_vec()));
            }
            _ => {}
        }
    }

    let (name, data) = file.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("No file selected".to_string()));
    }

    let stored = state.app.uploads.save(kind, &name, &data).await?;
    Ok(Json(UploadResponse {
        file_id: stored.file_id,
        file_path: stored.file_path.display().to_string(),
        file_type: stored.file_type,
    }))
}
