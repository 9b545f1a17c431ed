use sqlx::PgPool;

use crate::core::time::primitive_now_utc;
use crate::db::models::Assignment;
use crate::repositories;
use crate::services::errors::AllocationError;

pub(crate) const NOT_ASSIGNED_REASON: &str = "Not assigned to this exam";
pub(crate) const ALREADY_COMPLETED_REASON: &str = "Exam already completed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AccessDecision {
    pub(crate) can_access: bool,
    pub(crate) reason: Option<&'static str>,
    pub(crate) set_number: Option<i32>,
    pub(crate) has_started: bool,
}

impl AccessDecision {
    pub(crate) fn evaluate(assignment: Option<&Assignment>) -> Self {
        match assignment {
            None => Self {
                can_access: false,
                reason: Some(NOT_ASSIGNED_REASON),
                set_number: None,
                has_started: false,
            },
            Some(row) if row.has_completed => Self {
                can_access: false,
                reason: Some(ALREADY_COMPLETED_REASON),
                set_number: Some(row.set_number),
                has_started: row.has_started,
            },
            Some(row) => Self {
                can_access: true,
                reason: None,
                set_number: Some(row.set_number),
                has_started: row.has_started,
            },
        }
    }
}

pub(crate) async fn get_assignment(
    pool: &PgPool,
    student_id: &str,
    exam_id: i64,
) -> Result<Assignment, AllocationError> {
    repositories::assignments::find(pool, student_id, exam_id)
        .await?
        .ok_or_else(|| AllocationError::not_assigned(student_id, exam_id))
}

pub(crate) async fn can_access(
    pool: &PgPool,
    student_id: &str,
    exam_id: i64,
) -> Result<AccessDecision, AllocationError> {
    let assignment = repositories::assignments::find(pool, student_id, exam_id).await?;
    Ok(AccessDecision::evaluate(assignment.as_ref()))
}

/// Sets the started flag once; later calls keep the first timestamp.
pub(crate) async fn mark_started(
    pool: &PgPool,
    student_id: &str,
    exam_id: i64,
) -> Result<Assignment, AllocationError> {
    let changed =
        repositories::assignments::mark_started(pool, student_id, exam_id, primitive_now_utc())
            .await?;
    let assignment = get_assignment(pool, student_id, exam_id).await?;

    if changed {
        tracing::info!(student_id, exam_id, set_number = assignment.set_number, "Exam started");
    }
    Ok(assignment)
}

/// Sets the completed flag once. Completion without a prior start is accepted.
pub(crate) async fn mark_completed(
    pool: &PgPool,
    student_id: &str,
    exam_id: i64,
) -> Result<Assignment, AllocationError> {
    let changed =
        repositories::assignments::mark_completed(pool, student_id, exam_id, primitive_now_utc())
            .await?;
    let assignment = get_assignment(pool, student_id, exam_id).await?;

    if changed {
        if !assignment.has_started {
            tracing::warn!(student_id, exam_id, "Exam completed without a recorded start");
        }
        tracing::info!(student_id, exam_id, set_number = assignment.set_number, "Exam completed");
    }
    Ok(assignment)
}
