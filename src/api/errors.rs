use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::errors::AllocationError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    /// Like the `From` conversion, but storage failures are reported under `context`.
    pub(crate) fn allocation(err: AllocationError, context: impl FnOnce() -> String) -> Self {
        match err {
            AllocationError::Storage(source) => Self::internal(source, &context()),
            other => other.into(),
        }
    }

    pub(crate) fn exam_not_found(exam_id: i64) -> Self {
        Self::NotFound(format!("Exam {exam_id} not found"))
    }
}

impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::NoQuestions { .. } => Self::BadRequest(err.to_string()),
            AllocationError::SetNotFound { .. } => Self::NotFound(err.to_string()),
            AllocationError::NotAssigned { .. } => Self::NotFound(err.to_string()),
            AllocationError::Storage(source) => Self::internal(source, "Storage operation failed"),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        (status, Json(ErrorResponse { success: false, status: status.as_u16(), detail }))
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&body).expect("json"))
    }

    #[tokio::test]
    async fn allocation_errors_map_to_statuses() {
        let (status, body) = render(AllocationError::NoQuestions { exam_id: 9 }.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["status"], 400);
        assert!(body["detail"].as_str().unwrap_or_default().contains("exam 9"));

        let (status, _) =
            render(AllocationError::SetNotFound { exam_id: 9, set_number: 3 }.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = render(AllocationError::not_assigned("cand-1", 9).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["detail"].as_str().unwrap_or_default().contains("cand-1"));
    }

    #[tokio::test]
    async fn storage_errors_hide_details() {
        let err = AllocationError::Storage(sqlx::Error::PoolTimedOut);
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Storage operation failed");
    }

    #[tokio::test]
    async fn storage_errors_carry_operation_context() {
        let err = ApiError::allocation(AllocationError::Storage(sqlx::Error::PoolTimedOut), || {
            "Failed to assign student cand-4 to exam 12".to_string()
        });
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Failed to assign student cand-4 to exam 12");

        let err = ApiError::allocation(AllocationError::NoQuestions { exam_id: 12 }, || {
            unreachable!("context is only built for storage failures")
        });
        let (status, _) = render(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
