use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::core::metrics;
use crate::core::time::primitive_now_utc;
use crate::db::{self, models::Assignment};
use crate::repositories;
use crate::services::errors::AllocationError;
use crate::services::set_generator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssignmentMode {
    Automatic,
    Manual,
}

impl AssignmentMode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "auto",
            Self::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssignmentOutcome {
    /// A new row was written by this call.
    Created,
    /// The candidate already held an assignment, possibly written by a concurrent call.
    AlreadyAssigned,
    /// Manual assignment onto the set the candidate already holds.
    Unchanged,
    /// Manual assignment replaced a row pointing at another set.
    Reassigned { previous_set: i32 },
}

#[derive(Debug, Clone)]
pub(crate) struct AssignmentResult {
    pub(crate) assignment: Assignment,
    pub(crate) outcome: AssignmentOutcome,
    pub(crate) mode: AssignmentMode,
}

/// Least occupied active set, ties going to the lowest set number.
///
/// Returns `(set_number, slot_number)` where the slot is the next 1-based ordinal in
/// that set, or `None` when the exam has no active sets.
pub(crate) fn pick_least_loaded(
    active_sets: &[i32],
    occupancy: &HashMap<i32, i64>,
) -> Option<(i32, i32)> {
    active_sets
        .iter()
        .map(|set_number| (occupancy.get(set_number).copied().unwrap_or(0), *set_number))
        .min()
        .map(|(assigned, set_number)| (set_number, assigned as i32 + 1))
}

/// Enrolls a candidate into the least loaded set, generating sets on first use.
///
/// Safe to retry and to call concurrently for the same pair: exactly one row is
/// written and every caller gets that row back.
pub(crate) async fn auto_assign(
    pool: &PgPool,
    student_id: &str,
    exam_id: i64,
    set_count: i32,
) -> Result<AssignmentResult, AllocationError> {
    let mode = AssignmentMode::Automatic;

    if let Some(existing) = repositories::assignments::find(pool, student_id, exam_id).await? {
        tracing::debug!(student_id, exam_id, set_number = existing.set_number, "Already assigned");
        return Ok(AssignmentResult {
            assignment: existing,
            outcome: AssignmentOutcome::AlreadyAssigned,
            mode,
        });
    }

    set_generator::ensure_sets(pool, exam_id, set_count).await?;

    let active_sets = repositories::question_sets::list_active_numbers(pool, exam_id).await?;
    let occupancy: HashMap<i32, i64> =
        repositories::assignments::occupancy_by_set(pool, exam_id)
            .await?
            .into_iter()
            .map(|row| (row.set_number, row.assigned))
            .collect();

    let (set_number, slot_number) = pick_least_loaded(&active_sets, &occupancy)
        .ok_or(AllocationError::SetNotFound { exam_id, set_number: 1 })?;

    let id = Uuid::new_v4().to_string();
    let created = repositories::assignments::create(
        pool,
        repositories::assignments::CreateAssignment {
            id: &id,
            student_id,
            exam_id,
            set_number,
            slot_number,
            assigned_at: primitive_now_utc(),
        },
    )
    .await;

    match created {
        Ok(assignment) => {
            metrics::assignment_created(mode.as_str());
            tracing::info!(
                student_id,
                exam_id,
                set_number,
                slot_number,
                mode = mode.as_str(),
                "Assigned candidate to question set"
            );
            Ok(AssignmentResult { assignment, outcome: AssignmentOutcome::Created, mode })
        }
        Err(err) if db::is_unique_violation(&err) => {
            recover_race(pool, student_id, exam_id, mode, err).await
        }
        Err(err) => Err(err.into()),
    }
}

/// Puts a candidate onto a specific set, replacing any assignment to another set.
///
/// The slot number is stored as given.
pub(crate) async fn manual_assign(
    pool: &PgPool,
    student_id: &str,
    exam_id: i64,
    set_number: i32,
    slot_number: i32,
) -> Result<AssignmentResult, AllocationError> {
    let mode = AssignmentMode::Manual;

    if repositories::question_sets::find_active(pool, exam_id, set_number).await?.is_none() {
        return Err(AllocationError::SetNotFound { exam_id, set_number });
    }

    let existing = repositories::assignments::find(pool, student_id, exam_id).await?;
    if let Some(existing) = existing.as_ref().filter(|row| row.set_number == set_number) {
        return Ok(AssignmentResult {
            assignment: existing.clone(),
            outcome: AssignmentOutcome::Unchanged,
            mode,
        });
    }

    let mut tx = pool.begin().await?;
    if let Some(previous) = &existing {
        repositories::assignments::delete_by_id(&mut *tx, &previous.id).await?;
    }

    let id = Uuid::new_v4().to_string();
    let created = repositories::assignments::create(
        &mut *tx,
        repositories::assignments::CreateAssignment {
            id: &id,
            student_id,
            exam_id,
            set_number,
            slot_number,
            assigned_at: primitive_now_utc(),
        },
    )
    .await;

    let assignment = match created {
        Ok(assignment) => assignment,
        Err(err) if db::is_unique_violation(&err) => {
            drop(tx);
            return recover_race(pool, student_id, exam_id, mode, err).await;
        }
        Err(err) => return Err(err.into()),
    };
    tx.commit().await?;

    metrics::assignment_created(mode.as_str());
    let outcome = match existing {
        Some(previous) => {
            tracing::warn!(
                student_id,
                exam_id,
                previous_set = previous.set_number,
                set_number,
                "Manually reassigned candidate"
            );
            AssignmentOutcome::Reassigned { previous_set: previous.set_number }
        }
        None => {
            tracing::info!(student_id, exam_id, set_number, slot_number, "Manually assigned");
            AssignmentOutcome::Created
        }
    };

    Ok(AssignmentResult { assignment, outcome, mode })
}

/// A concurrent call inserted the row first; hand its row back as if it had been found.
async fn recover_race(
    pool: &PgPool,
    student_id: &str,
    exam_id: i64,
    mode: AssignmentMode,
    conflict: sqlx::Error,
) -> Result<AssignmentResult, AllocationError> {
    let Some(winner) = repositories::assignments::find(pool, student_id, exam_id).await? else {
        // The winning row vanished again (e.g. a regeneration in between).
        return Err(conflict.into());
    };

    metrics::assignment_race_recovered(mode.as_str());
    tracing::info!(
        student_id,
        exam_id,
        set_number = winner.set_number,
        mode = mode.as_str(),
        "Recovered concurrent assignment insert"
    );

    Ok(AssignmentResult { assignment: winner, outcome: AssignmentOutcome::AlreadyAssigned, mode })
}
