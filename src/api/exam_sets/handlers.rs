use axum::extract::{rejection::QueryRejection, Path, Query, State};
use axum::Json;

use crate::api::errors::ApiError;
use crate::api::guards::{require_exam, require_student_id, ValidatedJson};
use crate::core::state::AppState;
use crate::schemas::exam_set::{
    AssignResponse, AssignmentLookupResponse, AssignmentQuery, AutoAssignRequest,
    DeleteSetsResponse, EnrollRequest, EnrolledCandidate, EnrollmentResponse, FailedEnrollment,
    GenerateSetsResponse, ManualAssignRequest, SetDetailsResponse, SetListResponse,
    SetValidationResponse, StatisticsResponse,
};
use crate::services::balancer::{self, AssignmentOutcome};
use crate::services::enrollment::{self, EnrollmentRequest};
use crate::services::{lifecycle, set_generator, set_inspection, statistics};

pub(super) async fn generate_sets(
    Path(exam_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<GenerateSetsResponse>, ApiError> {
    require_exam(&state, exam_id).await?;

    let report = set_generator::generate_sets(state.db(), exam_id, state.set_count())
        .await
        .map_err(|err| {
            ApiError::allocation(err, || {
                format!("Failed to generate question sets for exam {exam_id}")
            })
        })?;

    Ok(Json(GenerateSetsResponse {
        success: true,
        message: format!("Generated {} question sets", report.sets.len()),
        exam_id,
        total_questions: report.total_questions,
        cleared_assignments: report.cleared_assignments,
        sets: report.sets.into_iter().map(Into::into).collect(),
    }))
}

pub(super) async fn list_sets(
    Path(exam_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<SetListResponse>, ApiError> {
    require_exam(&state, exam_id).await?;

    let sets = set_inspection::list_sets(state.db(), exam_id).await?;
    let has_question_sets = set_inspection::has_question_sets(state.db(), exam_id).await?;

    Ok(Json(SetListResponse {
        success: true,
        exam_id,
        has_question_sets,
        total_sets: sets.len(),
        sets: sets.into_iter().map(Into::into).collect(),
    }))
}

pub(super) async fn get_set_details(
    Path((exam_id, set_number)): Path<(i64, i32)>,
    State(state): State<AppState>,
) -> Result<Json<SetDetailsResponse>, ApiError> {
    require_exam(&state, exam_id).await?;

    let details = set_inspection::set_details(state.db(), exam_id, set_number).await?;

    Ok(Json(SetDetailsResponse {
        success: true,
        exam_id,
        set_id: details.set.id,
        set_number: details.set.set_number,
        is_active: details.set.is_active,
        created_at: crate::core::time::format_primitive(details.set.created_at),
        question_count: details.question_count,
        student_count: details.assigned,
    }))
}

pub(super) async fn validate_sets(
    Path(exam_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<SetValidationResponse>, ApiError> {
    require_exam(&state, exam_id).await?;

    let validation = set_inspection::validate_sets(state.db(), exam_id).await?;
    let all_sets_valid = validation.all_valid();

    Ok(Json(SetValidationResponse {
        success: true,
        exam_id,
        all_sets_valid,
        sets: validation.sets.into_iter().map(Into::into).collect(),
    }))
}

pub(super) async fn get_statistics(
    Path(exam_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    require_exam(&state, exam_id).await?;

    let stats = statistics::exam_statistics(state.db(), exam_id).await?;

    Ok(Json(StatisticsResponse {
        success: true,
        exam_id: stats.exam_id,
        total_sets: stats.total_sets,
        total_students_assigned: stats.total_assigned,
        students_started: stats.started,
        students_completed: stats.completed,
        set_distribution: stats.distribution.into_iter().map(Into::into).collect(),
    }))
}

pub(super) async fn delete_sets(
    Path(exam_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<DeleteSetsResponse>, ApiError> {
    require_exam(&state, exam_id).await?;

    let report = set_generator::delete_sets(state.db(), exam_id).await?;
    let message = if report.deleted_sets == 0 {
        "No question sets found to delete".to_string()
    } else {
        format!("Deleted {} question sets", report.deleted_sets)
    };

    Ok(Json(DeleteSetsResponse {
        success: true,
        message,
        deleted_count: report.deleted_sets,
        deleted_assignments: report.deleted_assignments,
    }))
}

pub(super) async fn auto_assign(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<AutoAssignRequest>,
) -> Result<Json<AssignResponse>, ApiError> {
    require_exam(&state, payload.exam_id).await?;

    let result = balancer::auto_assign(
        state.db(),
        &payload.student_id,
        payload.exam_id,
        state.set_count(),
    )
    .await
    .map_err(|err| {
        ApiError::allocation(err, || {
            format!("Failed to assign student {} to exam {}", payload.student_id, payload.exam_id)
        })
    })?;

    Ok(Json(result.into()))
}

pub(super) async fn manual_assign(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ManualAssignRequest>,
) -> Result<Json<AssignResponse>, ApiError> {
    require_exam(&state, payload.exam_id).await?;

    let result = balancer::manual_assign(
        state.db(),
        &payload.student_id,
        payload.exam_id,
        payload.set_number,
        payload.slot_number,
    )
    .await
    .map_err(|err| {
        ApiError::allocation(err, || {
            format!(
                "Failed to assign student {} to set {} of exam {}",
                payload.student_id, payload.set_number, payload.exam_id
            )
        })
    })?;

    Ok(Json(result.into()))
}

pub(super) async fn get_assignment(
    State(state): State<AppState>,
    query: Result<Query<AssignmentQuery>, QueryRejection>,
) -> Result<Json<AssignmentLookupResponse>, ApiError> {
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let student_id = require_student_id(&query.student_id)?;

    let assignment = lifecycle::get_assignment(state.db(), student_id, query.exam_id).await?;

    Ok(Json(AssignmentLookupResponse { success: true, assignment: assignment.into() }))
}

pub(super) async fn enroll_candidates(
    Path(exam_id): Path<i64>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<EnrollRequest>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let exam = require_exam(&state, exam_id).await?;

    let report = enrollment::enroll_candidates(
        state.db(),
        state.notifier(),
        EnrollmentRequest {
            exam: &exam,
            student_ids: &payload.student_ids,
            set_count: state.set_count(),
            exam_link: state.settings().allocation().exam_link(exam_id),
        },
    )
    .await
    .map_err(|err| {
        ApiError::allocation(err, || format!("Failed to enroll candidates into exam {exam_id}"))
    })?;

    let message = format!(
        "Enrolled {} candidates, {} failed",
        report.assigned.len(),
        report.failed.len()
    );

    Ok(Json(EnrollmentResponse {
        success: true,
        message,
        exam_id,
        assigned: report
            .assigned
            .into_iter()
            .map(|result| EnrolledCandidate {
                newly_assigned: matches!(result.outcome, AssignmentOutcome::Created),
                set_number: result.assignment.set_number,
                slot_number: result.assignment.slot_number,
                student_id: result.assignment.student_id,
            })
            .collect(),
        failed: report
            .failed
            .into_iter()
            .map(|failure| FailedEnrollment {
                student_id: failure.student_id,
                reason: failure.reason,
            })
            .collect(),
        notification_failures: report.notification_failures,
    }))
}
