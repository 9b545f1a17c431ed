use async_trait::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::db::models::Exam;
use crate::repositories;

/// JSON body that has been deserialized and passed its `validator` rules.
/// Malformed bodies are reported with the regular error envelope.
pub(crate) struct ValidatedJson<T>(pub(crate) T);

#[async_trait]
impl<T> FromRequest<AppState> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Trims a candidate id taken from a path or query string and rejects blank ones.
pub(crate) fn require_student_id(raw: &str) -> Result<&str, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("student_id must not be empty".to_string()));
    }
    Ok(trimmed)
}

pub(crate) async fn require_exam(state: &AppState, exam_id: i64) -> Result<Exam, ApiError> {
    repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::exam_not_found(exam_id))
}
