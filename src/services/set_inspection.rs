use std::collections::HashSet;

use sqlx::PgPool;

use crate::db::models::QuestionSet;
use crate::repositories;
use crate::services::errors::AllocationError;

#[derive(Debug, Clone)]
pub(crate) struct SetSummary {
    pub(crate) set: QuestionSet,
    pub(crate) question_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
pub(crate) struct SetDetails {
    pub(crate) set: QuestionSet,
    pub(crate) question_count: usize,
    pub(crate) assigned: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct SetIntegrity {
    pub(crate) set_number: i32,
    pub(crate) question_count: usize,
    pub(crate) missing_ids: Vec<i64>,
}

impl SetIntegrity {
    pub(crate) fn is_valid(&self) -> bool {
        self.missing_ids.is_empty()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SetValidation {
    pub(crate) exam_id: i64,
    pub(crate) sets: Vec<SetIntegrity>,
}

impl SetValidation {
    pub(crate) fn all_valid(&self) -> bool {
        self.sets.iter().all(SetIntegrity::is_valid)
    }
}

/// Ids of `sequence` absent from `known`, in sequence order.
pub(crate) fn missing_ids(sequence: &[i64], known: &HashSet<i64>) -> Vec<i64> {
    sequence.iter().copied().filter(|id| !known.contains(id)).collect()
}

pub(crate) async fn has_question_sets(
    pool: &PgPool,
    exam_id: i64,
) -> Result<bool, AllocationError> {
    Ok(repositories::question_sets::count_active(pool, exam_id).await? > 0)
}

pub(crate) async fn list_sets(
    pool: &PgPool,
    exam_id: i64,
) -> Result<Vec<SetSummary>, AllocationError> {
    let sets = repositories::question_sets::list_by_exam(pool, exam_id).await?;

    let mut summaries = Vec::with_capacity(sets.len());
    for set in sets {
        let question_ids = repositories::question_sets::list_item_ids(pool, &set.id).await?;
        summaries.push(SetSummary { set, question_ids });
    }
    Ok(summaries)
}

pub(crate) async fn set_details(
    pool: &PgPool,
    exam_id: i64,
    set_number: i32,
) -> Result<SetDetails, AllocationError> {
    let set = repositories::question_sets::find_active(pool, exam_id, set_number)
        .await?
        .ok_or(AllocationError::SetNotFound { exam_id, set_number })?;

    let question_ids = repositories::question_sets::list_item_ids(pool, &set.id).await?;
    let assigned = repositories::assignments::count_for_set(pool, exam_id, set_number).await?;

    Ok(SetDetails { set, question_count: question_ids.len(), assigned })
}

/// Checks every set against the current question bank of the exam.
pub(crate) async fn validate_sets(
    pool: &PgPool,
    exam_id: i64,
) -> Result<SetValidation, AllocationError> {
    let known: HashSet<i64> =
        repositories::questions::list_ids_by_exam(pool, exam_id).await?.into_iter().collect();

    let mut sets = Vec::new();
    for summary in list_sets(pool, exam_id).await? {
        let missing = missing_ids(&summary.question_ids, &known);
        if !missing.is_empty() {
            tracing::warn!(
                exam_id,
                set_number = summary.set.set_number,
                missing = missing.len(),
                "Question set references unknown questions"
            );
        }
        sets.push(SetIntegrity {
            set_number: summary.set.set_number,
            question_count: summary.question_ids.len(),
            missing_ids: missing,
        });
    }

    Ok(SetValidation { exam_id, sets })
}
