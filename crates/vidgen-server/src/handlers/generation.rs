use std::path::PathBuf;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use vidgen_core::app::{GenerationInputs, RunOptions};
use vidgen_core::config::{DEFAULT_DURATION, DEFAULT_RATIO, DEFAULT_WATERMARK};
use vidgen_core::domain::{GenerationMode, TaskId, TaskStatus, UploadKind};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    pub mode: Option<String>,
    pub text: Option<String>,
    pub image_id: Option<String>,
    pub video_id: Option<String>,
    pub ratio: Option<String>,
    pub duration: Option<u32>,
    pub watermark: Option<bool>,
    pub enhance_prompt: Option<bool>,
    pub style: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub task_id: TaskId,
    pub status: TaskStatus,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Upload id -> path, or a 400 when the id is foreign or the file is gone.
async fn resolve_upload(state: &AppState, kind: UploadKind, id: &str) -> AppResult<PathBuf> {
    let path = state.app.uploads.resolve(kind, id)?;
    match tokio::fs::try_exists(&path).await {
        Ok(true) => Ok(path),
        _ => Err(AppError::BadRequest(format!("Uploaded {kind} not found"))),
    }
}

/// POST /api/generate
///
/// Validates the request, creates a `pending` task and queues its run.
/// Nothing is created when validation fails or the queue is full.
pub async fn generate(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> AppResult<Json<GenerateResponse>> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mode = match non_blank(req.mode) {
        Some(mode) => mode
            .parse::<GenerationMode>()
            .map_err(|e| AppError::BadRequest(e.to_string()))?,
        None => GenerationMode::Text2Video,
    };
    let text = req.text.unwrap_or_default().trim().to_string();
    let image_id = non_blank(req.image_id);
    let video_id = non_blank(req.video_id);

    match mode {
        GenerationMode::Text2Video if text.is_empty() => {
            return Err(AppError::BadRequest(
                "Text prompt is required for text2video mode".to_string(),
            ));
        }
        GenerationMode::Image2Video if image_id.is_none() => {
            return Err(AppError::BadRequest(
                "Image is required for image2video mode".to_string(),
            ));
        }
        GenerationMode::Edit if image_id.is_none() && video_id.is_none() => {
            return Err(AppError::BadRequest(
                "Image or video is required for edit mode".to_string(),
            ));
        }
        GenerationMode::Edit if text.is_empty() => {
            return Err(AppError::BadRequest(
                "Edit instruction is required for edit mode".to_string(),
            ));
        }
        _ => {}
    }

    let duration = req.duration.unwrap_or(DEFAULT_DURATION);
    if duration == 0 {
        return Err(AppError::BadRequest("duration must be positive".to_string()));
    }

    // Every supplied id must resolve, even when the mode does not use it.
    let image = match &image_id {
        Some(id) => Some(resolve_upload(&state, UploadKind::Image, id).await?),
        None => None,
    };
    let video = match &video_id {
        Some(id) => Some(resolve_upload(&state, UploadKind::Video, id).await?),
        None => None,
    };

    let settings = &state.app.settings;
    let options = RunOptions {
        ratio: non_blank(req.ratio).unwrap_or_else(|| DEFAULT_RATIO.to_string()),
        duration,
        watermark: req.watermark.unwrap_or(DEFAULT_WATERMARK),
        enhance_prompt: req.enhance_prompt.unwrap_or(true),
        style: non_blank(req.style).unwrap_or_else(|| settings.prompt_style.clone()),
        language: non_blank(req.language).unwrap_or_else(|| settings.prompt_language.clone()),
    };
    let inputs = GenerationInputs { text, image, video };

    let record = state.app.enqueue(mode, inputs, options).await?;
    Ok(Json(GenerateResponse {
        task_id: record.id,
        status: record.status,
    }))
}
