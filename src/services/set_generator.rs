use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{seq::SliceRandom, SeedableRng};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::core::metrics;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Question, QuestionSet};
use crate::repositories;
use crate::services::errors::AllocationError;

/// Spacing between per-set seeds derived from one base seed.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone)]
pub(crate) struct MaterializedSet {
    pub(crate) set: QuestionSet,
    pub(crate) question_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
pub(crate) struct GenerationReport {
    pub(crate) exam_id: i64,
    pub(crate) total_questions: usize,
    pub(crate) cleared_assignments: u64,
    pub(crate) sets: Vec<MaterializedSet>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct DeletionReport {
    pub(crate) deleted_assignments: u64,
    pub(crate) deleted_sets: u64,
}

/// Question ids keyed by section. `BTreeMap` fixes the alphabetical section order;
/// ids inside a section are sorted so every set starts from the same snapshot.
pub(crate) fn group_by_section(questions: &[Question]) -> BTreeMap<String, Vec<i64>> {
    let mut sections: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for question in questions {
        sections.entry(question.section.clone()).or_default().push(question.id);
    }
    for ids in sections.values_mut() {
        ids.sort_unstable();
    }
    sections
}

/// Shuffles each section independently and concatenates sections in key order.
pub(crate) fn shuffle_within_sections(
    sections: &BTreeMap<String, Vec<i64>>,
    seed: u64,
) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ordering = Vec::with_capacity(sections.values().map(Vec::len).sum());
    for ids in sections.values() {
        let mut shuffled = ids.clone();
        shuffled.shuffle(&mut rng);
        ordering.extend(shuffled);
    }
    ordering
}

/// One ordering per set number `1..=set_count`, each from its own seed.
pub(crate) fn build_orderings(
    sections: &BTreeMap<String, Vec<i64>>,
    set_count: i32,
    base_seed: u64,
) -> Vec<Vec<i64>> {
    (1..=set_count.max(0) as u64)
        .map(|set_number| {
            let seed = base_seed.wrapping_add(set_number.wrapping_mul(SEED_STRIDE));
            shuffle_within_sections(sections, seed)
        })
        .collect()
}

/// Replaces every set of the exam with `set_count` freshly shuffled ones.
///
/// Existing assignments are dropped first since they point at the old sets.
/// Runs as one transaction: callers observe either the old generation or the new one.
pub(crate) async fn generate_sets(
    pool: &PgPool,
    exam_id: i64,
    set_count: i32,
) -> Result<GenerationReport, AllocationError> {
    let mut tx = pool.begin().await?;
    repositories::question_sets::acquire_exam_lock(&mut *tx, exam_id).await?;

    let report = regenerate(&mut tx, exam_id, set_count).await?;
    tx.commit().await?;

    metrics::sets_generated(report.sets.len());
    tracing::info!(
        exam_id,
        total_questions = report.total_questions,
        set_count = report.sets.len(),
        cleared_assignments = report.cleared_assignments,
        "Generated question sets"
    );

    Ok(report)
}

/// Generates sets only when the exam has no active ones. Returns `None` when nothing
/// was generated. The check is repeated under the exam lock so two callers racing on
/// an empty exam generate once.
pub(crate) async fn ensure_sets(
    pool: &PgPool,
    exam_id: i64,
    set_count: i32,
) -> Result<Option<GenerationReport>, AllocationError> {
    if repositories::question_sets::count_active(pool, exam_id).await? > 0 {
        return Ok(None);
    }

    let mut tx = pool.begin().await?;
    repositories::question_sets::acquire_exam_lock(&mut *tx, exam_id).await?;

    if repositories::question_sets::count_active(&mut *tx, exam_id).await? > 0 {
        tx.commit().await?;
        return Ok(None);
    }

    let report = regenerate(&mut tx, exam_id, set_count).await?;
    tx.commit().await?;

    metrics::sets_generated(report.sets.len());
    tracing::info!(exam_id, set_count = report.sets.len(), "Lazily generated question sets");

    Ok(Some(report))
}

async fn regenerate(
    tx: &mut Transaction<'_, Postgres>,
    exam_id: i64,
    set_count: i32,
) -> Result<GenerationReport, AllocationError> {
    let questions = repositories::questions::list_by_exam(&mut **tx, exam_id).await?;
    if questions.is_empty() {
        return Err(AllocationError::NoQuestions { exam_id });
    }

    let cleared_assignments = repositories::assignments::delete_by_exam(&mut **tx, exam_id).await?;
    let cleared_sets = repositories::question_sets::delete_by_exam(&mut **tx, exam_id).await?;
    if cleared_assignments > 0 || cleared_sets > 0 {
        tracing::warn!(
            exam_id,
            cleared_assignments,
            cleared_sets,
            "Clearing previous question sets and their assignments"
        );
    }

    let sections = group_by_section(&questions);
    let orderings = build_orderings(&sections, set_count, rand::random::<u64>());
    let now = primitive_now_utc();

    let mut sets = Vec::with_capacity(orderings.len());
    for (index, question_ids) in orderings.into_iter().enumerate() {
        let set_id = Uuid::new_v4().to_string();
        let set = repositories::question_sets::create(
            &mut **tx,
            repositories::question_sets::CreateQuestionSet {
                id: &set_id,
                exam_id,
                set_number: index as i32 + 1,
                created_at: now,
            },
        )
        .await?;
        repositories::question_sets::insert_items(&mut **tx, &set_id, &question_ids).await?;

        sets.push(MaterializedSet { set, question_ids });
    }

    Ok(GenerationReport {
        exam_id,
        total_questions: questions.len(),
        cleared_assignments,
        sets,
    })
}

/// Removes all sets of an exam together with every assignment pointing at them.
pub(crate) async fn delete_sets(
    pool: &PgPool,
    exam_id: i64,
) -> Result<DeletionReport, AllocationError> {
    let mut tx = pool.begin().await?;
    repositories::question_sets::acquire_exam_lock(&mut *tx, exam_id).await?;

    let deleted_assignments = repositories::assignments::delete_by_exam(&mut *tx, exam_id).await?;
    let deleted_sets = repositories::question_sets::delete_by_exam(&mut *tx, exam_id).await?;
    tx.commit().await?;

    if deleted_assignments > 0 {
        tracing::warn!(exam_id, deleted_assignments, "Deleted assignments with question sets");
    }
    tracing::info!(exam_id, deleted_sets, "Deleted question sets");

    Ok(DeletionReport { deleted_assignments, deleted_sets })
}
