use std::collections::HashMap;

use sqlx::PgPool;

use crate::core::time::primitive_now_utc;
use crate::db::models::{Assignment, Question};
use crate::repositories;
use crate::services::errors::AllocationError;

#[derive(Debug, Clone)]
pub(crate) struct CandidatePaper {
    pub(crate) assignment: Assignment,
    pub(crate) questions: Vec<Question>,
}

/// Arranges `questions` in the order of `sequence`. Ids that no longer resolve are dropped.
pub(crate) fn order_by_sequence(sequence: &[i64], questions: Vec<Question>) -> Vec<Question> {
    let mut by_id: HashMap<i64, Question> =
        questions.into_iter().map(|question| (question.id, question)).collect();
    sequence.iter().filter_map(|id| by_id.remove(id)).collect()
}

/// Questions of the candidate's set in presentation order.
///
/// Also flags the assignment as started. That write is best effort: a failure is
/// logged and the questions are still returned.
pub(crate) async fn questions_for_student(
    pool: &PgPool,
    student_id: &str,
    exam_id: i64,
) -> Result<CandidatePaper, AllocationError> {
    let mut assignment = repositories::assignments::find(pool, student_id, exam_id)
        .await?
        .ok_or_else(|| AllocationError::not_assigned(student_id, exam_id))?;

    let set = repositories::question_sets::find_active(pool, exam_id, assignment.set_number)
        .await?
        .ok_or_else(|| {
            tracing::error!(
                student_id,
                exam_id,
                set_number = assignment.set_number,
                "Assignment points at a missing question set"
            );
            AllocationError::SetNotFound { exam_id, set_number: assignment.set_number }
        })?;

    let sequence = repositories::question_sets::list_item_ids(pool, &set.id).await?;
    let resolved = repositories::questions::list_by_ids(pool, &sequence).await?;
    let questions = order_by_sequence(&sequence, resolved);
    if questions.len() < sequence.len() {
        tracing::warn!(
            exam_id,
            set_number = set.set_number,
            missing = sequence.len() - questions.len(),
            "Skipping questions that no longer exist"
        );
    }

    let now = primitive_now_utc();
    match repositories::assignments::mark_started(pool, student_id, exam_id, now).await {
        Ok(true) => {
            assignment.has_started = true;
            assignment.started_at = Some(now);
            tracing::info!(student_id, exam_id, "Exam started on first question fetch");
        }
        Ok(false) => {}
        Err(err) => {
            tracing::warn!(error = %err, student_id, exam_id, "Failed to mark exam as started");
        }
    }

    Ok(CandidatePaper { assignment, questions })
}
