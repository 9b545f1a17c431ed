use time::PrimitiveDateTime;

use crate::db::models::QuestionSet;

pub(crate) const COLUMNS: &str = "id, exam_id, set_number, is_active, created_at";

pub(crate) struct CreateQuestionSet<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: i64,
    pub(crate) set_number: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Serializes set generation per exam for the lifetime of the transaction.
pub(crate) async fn acquire_exam_lock(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("question_sets:{exam_id}"))
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateQuestionSet<'_>,
) -> Result<QuestionSet, sqlx::Error> {
    sqlx::query_as::<_, QuestionSet>(&format!(
        "INSERT INTO question_sets (id, exam_id, set_number, is_active, created_at)
         VALUES ($1,$2,$3,TRUE,$4)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.set_number)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

/// Writes the whole ordered id sequence in one statement; `position` is zero-based.
pub(crate) async fn insert_items(
    executor: impl sqlx::PgExecutor<'_>,
    question_set_id: &str,
    question_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO question_set_items (question_set_id, position, question_id)
         SELECT $1, (item.ord - 1)::INTEGER, item.question_id
         FROM UNNEST($2::BIGINT[]) WITH ORDINALITY AS item(question_id, ord)",
    )
    .bind(question_set_id)
    .bind(question_ids)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn list_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: i64,
) -> Result<Vec<QuestionSet>, sqlx::Error> {
    sqlx::query_as::<_, QuestionSet>(&format!(
        "SELECT {COLUMNS} FROM question_sets WHERE exam_id = $1 ORDER BY set_number, created_at"
    ))
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_active_numbers(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: i64,
) -> Result<Vec<i32>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT set_number FROM question_sets
         WHERE exam_id = $1 AND is_active = TRUE
         ORDER BY set_number",
    )
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_active(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: i64,
    set_number: i32,
) -> Result<Option<QuestionSet>, sqlx::Error> {
    sqlx::query_as::<_, QuestionSet>(&format!(
        "SELECT {COLUMNS} FROM question_sets
         WHERE exam_id = $1 AND set_number = $2 AND is_active = TRUE"
    ))
    .bind(exam_id)
    .bind(set_number)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn count_active(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM question_sets WHERE exam_id = $1 AND is_active = TRUE",
    )
    .bind(exam_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_item_ids(
    executor: impl sqlx::PgExecutor<'_>,
    question_set_id: &str,
) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT question_id
         FROM question_set_items
         WHERE question_set_id = $1
         ORDER BY position",
    )
    .bind(question_set_id)
    .fetch_all(executor)
    .await
}

/// Items go with their set through `ON DELETE CASCADE`.
pub(crate) async fn delete_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM question_sets WHERE exam_id = $1")
        .bind(exam_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}
