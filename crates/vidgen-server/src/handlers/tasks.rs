use std::path::Path as FsPath;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use tokio_util::io::ReaderStream;
use vidgen_core::domain::{TaskId, TaskRecord, TaskResult, TaskStatus};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

fn parse_task_id(raw: &str) -> AppResult<TaskId> {
    raw.parse()
        .map_err(|_| AppError::NotFound("Task not found".to_string()))
}

/// GET /api/status/{task_id}
pub async fn status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Json<TaskRecord>> {
    let id = parse_task_id(&task_id)?;
    Ok(Json(state.app.store.get(id).await?))
}

/// GET /api/tasks
///
/// Every task, newest first.
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<TaskRecord>>> {
    Ok(Json(state.app.store.list().await?))
}

/// GET /api/download/{task_id}
pub async fn download(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Response> {
    let result = completed_result(&state, &task_id).await?;
    let disposition = format!("attachment; filename=\"{}\"", result.video_filename);
    stream_video(&result, Some(disposition)).await
}

/// GET /api/preview/{task_id}
pub async fn preview(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Response> {
    let result = completed_result(&state, &task_id).await?;
    stream_video(&result, None).await
}

async fn completed_result(state: &AppState, raw_id: &str) -> AppResult<TaskResult> {
    let record = state.app.store.get(parse_task_id(raw_id)?).await?;
    match (record.status, record.result) {
        (TaskStatus::Completed, Some(result)) => Ok(result),
        _ => Err(AppError::BadRequest("Video not ready yet".to_string())),
    }
}

fn video_content_type(path: &FsPath) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("webm") => "video/webm",
        _ => "video/mp4",
    }
}

async fn stream_video(result: &TaskResult, disposition: Option<String>) -> AppResult<Response> {
    let path = FsPath::new(&result.local_path);
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        Err(err) => return Err(AppError::InternalError(format!("open {}: {err}", path.display()))),
    };
    let size = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .len();

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, video_content_type(path))
        .header(header::CONTENT_LENGTH, size.to_string());
    if let Some(disposition) = disposition {
        let value = HeaderValue::from_str(&disposition)
            .map_err(|e| AppError::InternalError(e.to_string()))?;
        builder = builder.header(header::CONTENT_DISPOSITION, value);
    }

    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::InternalError(e.to_string()))
}
