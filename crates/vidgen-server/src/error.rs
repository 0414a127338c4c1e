use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use vidgen_core::app::{EnqueueError, SubmitError};
use vidgen_core::domain::{StoreError, UploadError};

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce `{"error": ..., "code": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// The run queue is full or closing.
    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<EnqueueError> for AppError {
    fn from(err: EnqueueError) -> Self {
        match err {
            EnqueueError::Queue(e) => AppError::Unavailable(e.to_string()),
            EnqueueError::Store(e) => AppError::Store(e),
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", msg.clone())
            }

            AppError::Store(StoreError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", "Task not found".to_string())
            }
            AppError::Store(StoreError::AlreadyExists(id)) => {
                (StatusCode::CONFLICT, "CONFLICT", format!("task {id} already exists"))
            }
            AppError::Store(err) => {
                tracing::error!(error = %err, "task store error");
                internal()
            }

            AppError::Upload(err @ (UploadError::DisallowedExtension { .. } | UploadError::InvalidId(_))) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
            }
            AppError::Upload(err) => {
                tracing::error!(error = %err, "upload storage error");
                internal()
            }

            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;
    use vidgen_core::domain::UploadKind;

    async fn parts(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[rstest]
    #[case(AppError::BadRequest("nope".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST")]
    #[case(AppError::NotFound("gone".into()), StatusCode::NOT_FOUND, "NOT_FOUND")]
    #[case(AppError::from(EnqueueError::Queue(SubmitError::Full)), StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE")]
    #[case(AppError::Store(StoreError::NotFound("task-01ARZ3NDEKTSV4RRFFQ69G5FAV".parse().unwrap())), StatusCode::NOT_FOUND, "NOT_FOUND")]
    #[case(AppError::InternalError("secret detail".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")]
    #[tokio::test]
    async fn maps_to_status_and_code(
        #[case] err: AppError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let (got_status, body) = parts(err).await;
        assert_eq!(got_status, status);
        assert_eq!(body["code"], code);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn internal_details_are_not_leaked() {
        let (_, body) = parts(AppError::InternalError("db password wrong".into())).await;
        assert_eq!(body["error"], "An internal error occurred");
    }

    #[tokio::test]
    async fn disallowed_extension_lists_allowed_types() {
        let err = AppError::Upload(UploadError::DisallowedExtension {
            kind: UploadKind::Image,
            allowed: "png, jpg".to_string(),
        });
        let (status, body) = parts(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("png, jpg"));
    }
}
