use sqlx::PgPool;

use crate::db::models::Candidate;

const COLUMNS: &str = "id, full_name, email, access_code, created_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Candidate>, sqlx::Error> {
    sqlx::query_as::<_, Candidate>(&format!("SELECT {COLUMNS} FROM candidates WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}
