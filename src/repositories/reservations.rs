use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Reservation;

pub(crate) const COLUMNS: &str =
    "test_id, student_id, answers, submitted_at, reserved_at, committed_at";

/// Conditional insert into the submitted set. `true` means the caller now owns the attempt.
pub(crate) async fn create_if_absent(
    pool: &PgPool,
    reservation: &Reservation,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO test_submissions (test_id, student_id, answers, submitted_at, reserved_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (test_id, student_id) DO NOTHING",
    )
    .bind(&reservation.test_id)
    .bind(&reservation.student_id)
    .bind(&reservation.answers)
    .bind(reservation.submitted_at)
    .bind(reservation.reserved_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Drops an uncommitted reservation. Committed rows are never released.
pub(crate) async fn release(
    pool: &PgPool,
    test_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM test_submissions
         WHERE test_id = $1 AND student_id = $2 AND committed_at IS NULL",
    )
    .bind(test_id)
    .bind(student_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn exists(
    pool: &PgPool,
    test_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM test_submissions WHERE test_id = $1 AND student_id = $2)",
    )
    .bind(test_id)
    .bind(student_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn lock_for_commit(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_id: &str,
) -> Result<Option<Reservation>, sqlx::Error> {
    sqlx::query_as::<_, Reservation>(&format!(
        "SELECT {COLUMNS} FROM test_submissions
         WHERE test_id = $1 AND student_id = $2
         FOR UPDATE"
    ))
    .bind(test_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn mark_committed(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_id: &str,
    committed_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE test_submissions SET committed_at = $3
         WHERE test_id = $1 AND student_id = $2 AND committed_at IS NULL",
    )
    .bind(test_id)
    .bind(student_id)
    .bind(committed_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn list_student_ids(
    pool: &PgPool,
    test_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT student_id FROM test_submissions WHERE test_id = $1 ORDER BY student_id",
    )
    .bind(test_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_test_ids_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT test_id FROM test_submissions WHERE student_id = $1")
        .bind(student_id)
        .fetch_all(pool)
        .await
}

/// Reservations that never got a result, oldest first.
pub(crate) async fn list_uncommitted(
    pool: &PgPool,
    reserved_before: PrimitiveDateTime,
    limit: i64,
) -> Result<Vec<Reservation>, sqlx::Error> {
    sqlx::query_as::<_, Reservation>(&format!(
        "SELECT {COLUMNS} FROM test_submissions
         WHERE committed_at IS NULL AND reserved_at < $1
         ORDER BY reserved_at
         LIMIT $2"
    ))
    .bind(reserved_before)
    .bind(limit.clamp(1, 10_000))
    .fetch_all(pool)
    .await
}
