use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::{format_optional, format_primitive};
use crate::db::models::Assignment;
use crate::services::balancer::{AssignmentOutcome, AssignmentResult};
use crate::services::set_generator::MaterializedSet;
use crate::services::set_inspection::{SetIntegrity, SetSummary};
use crate::services::statistics::SetLoad;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AutoAssignRequest {
    #[serde(alias = "studentId", deserialize_with = "deserialize_trimmed")]
    #[validate(length(min = 1, message = "student_id must not be empty"))]
    pub(crate) student_id: String,
    #[serde(alias = "examId")]
    #[validate(range(min = 1, message = "exam_id must be positive"))]
    pub(crate) exam_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ManualAssignRequest {
    #[serde(alias = "studentId", deserialize_with = "deserialize_trimmed")]
    #[validate(length(min = 1, message = "student_id must not be empty"))]
    pub(crate) student_id: String,
    #[serde(alias = "examId")]
    #[validate(range(min = 1, message = "exam_id must be positive"))]
    pub(crate) exam_id: i64,
    #[serde(alias = "setNumber")]
    #[validate(range(min = 1, message = "set_number must be positive"))]
    pub(crate) set_number: i32,
    /// Stored as given; occupancy is not checked for manual placement.
    #[serde(default = "default_slot_number")]
    #[serde(alias = "slotNumber")]
    pub(crate) slot_number: i32,
}

fn default_slot_number() -> i32 {
    1
}

/// Candidate ids are stored trimmed; blank ids are then caught by `length(min = 1)`.
fn deserialize_trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct EnrollRequest {
    #[serde(alias = "studentIds")]
    #[validate(length(min = 1, message = "student_ids must not be empty"))]
    pub(crate) student_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignmentQuery {
    #[serde(alias = "studentId", deserialize_with = "deserialize_trimmed")]
    pub(crate) student_id: String,
    #[serde(alias = "examId")]
    pub(crate) exam_id: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentResponse {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) exam_id: i64,
    pub(crate) set_number: i32,
    pub(crate) slot_number: i32,
    pub(crate) assigned_at: String,
    pub(crate) has_started: bool,
    pub(crate) started_at: Option<String>,
    pub(crate) has_completed: bool,
    pub(crate) completed_at: Option<String>,
}

impl From<Assignment> for AssignmentResponse {
    fn from(row: Assignment) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            exam_id: row.exam_id,
            set_number: row.set_number,
            slot_number: row.slot_number,
            assigned_at: format_primitive(row.assigned_at),
            has_started: row.has_started,
            started_at: format_optional(row.started_at),
            has_completed: row.has_completed,
            completed_at: format_optional(row.completed_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignResponse {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) mode: &'static str,
    pub(crate) outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) previous_set_number: Option<i32>,
    pub(crate) set_number: i32,
    pub(crate) slot_number: i32,
    pub(crate) assignment: AssignmentResponse,
}

impl From<AssignmentResult> for AssignResponse {
    fn from(result: AssignmentResult) -> Self {
        let set_number = result.assignment.set_number;
        let (outcome, message, previous_set_number) = match result.outcome {
            AssignmentOutcome::Created => {
                ("created", format!("Assigned to set {set_number}"), None)
            }
            AssignmentOutcome::AlreadyAssigned => {
                ("already_assigned", "Student already assigned to this exam".to_string(), None)
            }
            AssignmentOutcome::Unchanged => {
                ("unchanged", format!("Student already assigned to set {set_number}"), None)
            }
            AssignmentOutcome::Reassigned { previous_set } => (
                "reassigned",
                format!("Reassigned from set {previous_set} to set {set_number}"),
                Some(previous_set),
            ),
        };

        Self {
            success: true,
            message,
            mode: result.mode.as_str(),
            outcome,
            previous_set_number,
            set_number,
            slot_number: result.assignment.slot_number,
            assignment: result.assignment.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentLookupResponse {
    pub(crate) success: bool,
    pub(crate) assignment: AssignmentResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionSetResponse {
    pub(crate) id: String,
    pub(crate) set_number: i32,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
    pub(crate) question_count: usize,
    pub(crate) question_ids: Vec<i64>,
}

impl From<MaterializedSet> for QuestionSetResponse {
    fn from(value: MaterializedSet) -> Self {
        Self {
            id: value.set.id,
            set_number: value.set.set_number,
            is_active: value.set.is_active,
            created_at: format_primitive(value.set.created_at),
            question_count: value.question_ids.len(),
            question_ids: value.question_ids,
        }
    }
}

impl From<SetSummary> for QuestionSetResponse {
    fn from(value: SetSummary) -> Self {
        MaterializedSet { set: value.set, question_ids: value.question_ids }.into()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateSetsResponse {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) exam_id: i64,
    pub(crate) total_questions: usize,
    pub(crate) cleared_assignments: u64,
    pub(crate) sets: Vec<QuestionSetResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetListResponse {
    pub(crate) success: bool,
    pub(crate) exam_id: i64,
    pub(crate) has_question_sets: bool,
    pub(crate) total_sets: usize,
    pub(crate) sets: Vec<QuestionSetResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetDetailsResponse {
    pub(crate) success: bool,
    pub(crate) exam_id: i64,
    pub(crate) set_id: String,
    pub(crate) set_number: i32,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
    pub(crate) question_count: usize,
    pub(crate) student_count: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetIntegrityResponse {
    pub(crate) set_number: i32,
    pub(crate) question_count: usize,
    pub(crate) is_valid: bool,
    pub(crate) invalid_question_ids: Vec<i64>,
}

impl From<SetIntegrity> for SetIntegrityResponse {
    fn from(value: SetIntegrity) -> Self {
        Self {
            set_number: value.set_number,
            question_count: value.question_count,
            is_valid: value.is_valid(),
            invalid_question_ids: value.missing_ids,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SetValidationResponse {
    pub(crate) success: bool,
    pub(crate) exam_id: i64,
    pub(crate) all_sets_valid: bool,
    pub(crate) sets: Vec<SetIntegrityResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetLoadResponse {
    pub(crate) set_number: i32,
    pub(crate) assigned: i64,
}

impl From<SetLoad> for SetLoadResponse {
    fn from(value: SetLoad) -> Self {
        Self { set_number: value.set_number, assigned: value.assigned }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StatisticsResponse {
    pub(crate) success: bool,
    pub(crate) exam_id: i64,
    pub(crate) total_sets: i64,
    pub(crate) total_students_assigned: i64,
    pub(crate) students_started: i64,
    pub(crate) students_completed: i64,
    pub(crate) set_distribution: Vec<SetLoadResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteSetsResponse {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) deleted_count: u64,
    pub(crate) deleted_assignments: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrolledCandidate {
    pub(crate) student_id: String,
    pub(crate) set_number: i32,
    pub(crate) slot_number: i32,
    pub(crate) newly_assigned: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct FailedEnrollment {
    pub(crate) student_id: String,
    pub(crate) reason: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentResponse {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) exam_id: i64,
    pub(crate) assigned: Vec<EnrolledCandidate>,
    pub(crate) failed: Vec<FailedEnrollment>,
    pub(crate) notification_failures: usize,
}
