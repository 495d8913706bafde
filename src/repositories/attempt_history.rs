use sqlx::PgPool;

use crate::db::models::AttemptHistoryEntry;

pub(crate) async fn create_if_absent(
    executor: impl sqlx::PgExecutor<'_>,
    entry: &AttemptHistoryEntry,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO attempt_history (student_id, test_id, score, out_of_marks, attempted_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (student_id, test_id) DO NOTHING",
    )
    .bind(&entry.student_id)
    .bind(&entry.test_id)
    .bind(entry.score)
    .bind(entry.out_of_marks)
    .bind(entry.attempted_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_by_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<AttemptHistoryEntry>, sqlx::Error> {
    sqlx::query_as::<_, AttemptHistoryEntry>(
        "SELECT student_id, test_id, score, out_of_marks, attempted_at
         FROM attempt_history
         WHERE student_id = $1
         ORDER BY attempted_at DESC",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}
