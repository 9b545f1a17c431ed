use time::PrimitiveDateTime;

use crate::db::models::Assignment;

pub(crate) const COLUMNS: &str = "\
    id, student_id, exam_id, set_number, slot_number, assigned_at, \
    has_started, started_at, has_completed, completed_at";

pub(crate) struct CreateAssignment<'a> {
    pub(crate) id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) exam_id: i64,
    pub(crate) set_number: i32,
    pub(crate) slot_number: i32,
    pub(crate) assigned_at: PrimitiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SetOccupancyRow {
    pub(crate) set_number: i32,
    pub(crate) assigned: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AssignmentTotalsRow {
    pub(crate) assigned: i64,
    pub(crate) started: i64,
    pub(crate) completed: i64,
}

pub(crate) async fn find(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    exam_id: i64,
) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "SELECT {COLUMNS} FROM exam_assignments WHERE student_id = $1 AND exam_id = $2"
    ))
    .bind(student_id)
    .bind(exam_id)
    .fetch_optional(executor)
    .await
}

/// Plain insert: a concurrent duplicate surfaces as a unique violation for the caller to recover.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateAssignment<'_>,
) -> Result<Assignment, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "INSERT INTO exam_assignments (
            id, student_id, exam_id, set_number, slot_number, assigned_at,
            has_started, has_completed
         ) VALUES ($1,$2,$3,$4,$5,$6,FALSE,FALSE)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.student_id)
    .bind(params.exam_id)
    .bind(params.set_number)
    .bind(params.slot_number)
    .bind(params.assigned_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn occupancy_by_set(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: i64,
) -> Result<Vec<SetOccupancyRow>, sqlx::Error> {
    sqlx::query_as::<_, SetOccupancyRow>(
        "SELECT set_number, COUNT(*) AS assigned
         FROM exam_assignments
         WHERE exam_id = $1
         GROUP BY set_number
         ORDER BY set_number",
    )
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn count_for_set(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: i64,
    set_number: i32,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM exam_assignments WHERE exam_id = $1 AND set_number = $2",
    )
    .bind(exam_id)
    .bind(set_number)
    .fetch_one(executor)
    .await
}

pub(crate) async fn totals(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: i64,
) -> Result<AssignmentTotalsRow, sqlx::Error> {
    sqlx::query_as::<_, AssignmentTotalsRow>(
        "SELECT COUNT(*) AS assigned,
                COUNT(*) FILTER (WHERE has_started) AS started,
                COUNT(*) FILTER (WHERE has_completed) AS completed
         FROM exam_assignments
         WHERE exam_id = $1",
    )
    .bind(exam_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn delete_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM exam_assignments WHERE id = $1").bind(id).execute(executor).await?;
    Ok(())
}

pub(crate) async fn delete_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM exam_assignments WHERE exam_id = $1")
        .bind(exam_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Flips `has_started` once; returns false when it was already set or no row matched.
pub(crate) async fn mark_started(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    exam_id: i64,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exam_assignments
         SET has_started = TRUE,
             started_at = $1
         WHERE student_id = $2
           AND exam_id = $3
           AND has_started = FALSE",
    )
    .bind(now)
    .bind(student_id)
    .bind(exam_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn mark_completed(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    exam_id: i64,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exam_assignments
         SET has_completed = TRUE,
             completed_at = $1
         WHERE student_id = $2
           AND exam_id = $3
           AND has_completed = FALSE",
    )
    .bind(now)
    .bind(student_id)
    .bind(exam_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
