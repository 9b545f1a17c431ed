use thiserror::Error;

/// Failures the allocation core reports to its callers.
///
/// A lost insert race on `(student_id, exam_id)` is not listed: the balancer
/// recovers it by re-reading the winning row.
#[derive(Debug, Error)]
pub(crate) enum AllocationError {
    #[error("no questions found for exam {exam_id}")]
    NoQuestions { exam_id: i64 },
    #[error("question set {set_number} not found for exam {exam_id}")]
    SetNotFound { exam_id: i64, set_number: i32 },
    #[error("student {student_id} is not assigned to exam {exam_id}")]
    NotAssigned { student_id: String, exam_id: i64 },
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl AllocationError {
    pub(crate) fn not_assigned(student_id: &str, exam_id: i64) -> Self {
        Self::NotAssigned { student_id: student_id.to_string(), exam_id }
    }
}
