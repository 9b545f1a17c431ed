use axum::extract::{Path, State};
use axum::Json;

use crate::api::errors::ApiError;
use crate::api::guards::{require_exam, require_student_id};
use crate::core::state::AppState;
use crate::schemas::candidate::{
    AccessResponse, CandidateQuestionsResponse, LifecycleResponse, PublicQuestion,
};
use crate::schemas::exam_set::AssignmentLookupResponse;
use crate::services::{lifecycle, session_projector};

pub(super) async fn get_questions(
    Path((student_id, exam_id)): Path<(String, i64)>,
    State(state): State<AppState>,
) -> Result<Json<CandidateQuestionsResponse>, ApiError> {
    let student_id = require_student_id(&student_id)?.to_string();
    require_exam(&state, exam_id).await?;

    let paper = session_projector::questions_for_student(state.db(), &student_id, exam_id)
        .await
        .map_err(|err| {
            ApiError::allocation(err, || {
                format!("Failed to load questions of exam {exam_id} for student {student_id}")
            })
        })?;
    let total_marks = paper.questions.iter().map(|question| i64::from(question.marks)).sum();

    Ok(Json(CandidateQuestionsResponse {
        success: true,
        student_id,
        exam_id,
        set_number: paper.assignment.set_number,
        slot_number: paper.assignment.slot_number,
        total_questions: paper.questions.len(),
        total_marks,
        questions: paper.questions.into_iter().map(PublicQuestion::from).collect(),
    }))
}

pub(super) async fn get_assignment(
    Path((student_id, exam_id)): Path<(String, i64)>,
    State(state): State<AppState>,
) -> Result<Json<AssignmentLookupResponse>, ApiError> {
    let student_id = require_student_id(&student_id)?;
    let assignment = lifecycle::get_assignment(state.db(), student_id, exam_id).await?;

    Ok(Json(AssignmentLookupResponse { success: true, assignment: assignment.into() }))
}

pub(super) async fn can_access(
    Path((student_id, exam_id)): Path<(String, i64)>,
    State(state): State<AppState>,
) -> Result<Json<AccessResponse>, ApiError> {
    let student_id = require_student_id(&student_id)?;
    require_exam(&state, exam_id).await?;

    let decision = lifecycle::can_access(state.db(), student_id, exam_id).await?;

    Ok(Json(AccessResponse {
        success: true,
        can_access: decision.can_access,
        reason: decision.reason.map(str::to_string),
        set_number: decision.set_number,
        has_started: decision.has_started,
    }))
}

pub(super) async fn start_exam(
    Path((student_id, exam_id)): Path<(String, i64)>,
    State(state): State<AppState>,
) -> Result<Json<LifecycleResponse>, ApiError> {
    let student_id = require_student_id(&student_id)?;
    let assignment =
        lifecycle::mark_started(state.db(), student_id, exam_id).await.map_err(|err| {
            ApiError::allocation(err, || {
                format!("Failed to start exam {exam_id} for student {student_id}")
            })
        })?;

    Ok(Json(LifecycleResponse {
        success: true,
        message: "Exam marked as started".to_string(),
        assignment: assignment.into(),
    }))
}

pub(super) async fn complete_exam(
    Path((student_id, exam_id)): Path<(String, i64)>,
    State(state): State<AppState>,
) -> Result<Json<LifecycleResponse>, ApiError> {
    let student_id = require_student_id(&student_id)?;
    let assignment =
        lifecycle::mark_completed(state.db(), student_id, exam_id).await.map_err(|err| {
            ApiError::allocation(err, || {
                format!("Failed to complete exam {exam_id} for student {student_id}")
            })
        })?;

    Ok(Json(LifecycleResponse {
        success: true,
        message: "Exam marked as completed".to_string(),
        assignment: assignment.into(),
    }))
}
