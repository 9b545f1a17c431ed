use crate::db::models::Question;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, section, question_type, question_text, options, answer, marks, q_no, created_at";

/// Storage order is not meaningful; callers group and order themselves.
pub(crate) async fn list_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: i64,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE exam_id = $1"))
        .bind(exam_id)
        .fetch_all(executor)
        .await
}

pub(crate) async fn list_by_ids(
    executor: impl sqlx::PgExecutor<'_>,
    ids: &[i64],
) -> Result<Vec<Question>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(executor)
        .await
}

pub(crate) async fn list_ids_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: i64,
) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM questions WHERE exam_id = $1 ORDER BY id")
        .bind(exam_id)
        .fetch_all(executor)
        .await
}
