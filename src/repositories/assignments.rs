use sqlx::PgPool;
use time::PrimitiveDateTime;

/// Adds pairs that are not present yet; returns how many were new.
pub(crate) async fn insert_many(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_ids: &[String],
    assigned_at: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    if student_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        "INSERT INTO test_assignments (test_id, student_id, assigned_at)
         SELECT $1, student_id, $3 FROM UNNEST($2::varchar[]) AS student_id
         ON CONFLICT (test_id, student_id) DO NOTHING",
    )
    .bind(test_id)
    .bind(student_ids)
    .bind(assigned_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

pub(crate) async fn exists(
    pool: &PgPool,
    test_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM test_assignments WHERE test_id = $1 AND student_id = $2)",
    )
    .bind(test_id)
    .bind(student_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_student_ids(
    pool: &PgPool,
    test_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT student_id FROM test_assignments WHERE test_id = $1 ORDER BY student_id",
    )
    .bind(test_id)
    .fetch_all(pool)
    .await
}
