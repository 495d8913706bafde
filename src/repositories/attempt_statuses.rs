use time::PrimitiveDateTime;

use crate::db::models::AttemptStatusRecord;
use crate::db::types::AttemptStatus;

pub(crate) const COLUMNS: &str = "student_id, test_id, status, started_at, ended_at, updated_at";

pub(crate) async fn find(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_id: &str,
) -> Result<Option<AttemptStatusRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttemptStatusRecord>(&format!(
        "SELECT {COLUMNS} FROM attempt_statuses WHERE test_id = $1 AND student_id = $2"
    ))
    .bind(test_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

/// First start wins `started_at`; a submitted row is returned untouched.
pub(crate) async fn mark_in_progress(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_id: &str,
    now: PrimitiveDateTime,
) -> Result<AttemptStatusRecord, sqlx::Error> {
    sqlx::query_as::<_, AttemptStatusRecord>(&format!(
        "INSERT INTO attempt_statuses (student_id, test_id, status, started_at, updated_at)
         VALUES ($1, $2, $3, $4, $4)
         ON CONFLICT (student_id, test_id) DO UPDATE
         SET status = CASE WHEN attempt_statuses.status = $5 THEN attempt_statuses.status
                           ELSE EXCLUDED.status END,
             started_at = COALESCE(attempt_statuses.started_at, EXCLUDED.started_at),
             updated_at = CASE WHEN attempt_statuses.status = $5 THEN attempt_statuses.updated_at
                               ELSE EXCLUDED.updated_at END
         RETURNING {COLUMNS}"
    ))
    .bind(student_id)
    .bind(test_id)
    .bind(AttemptStatus::InProgress)
    .bind(now)
    .bind(AttemptStatus::Submitted)
    .fetch_one(executor)
    .await
}

pub(crate) async fn mark_submitted(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_id: &str,
    ended_at: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO attempt_statuses (student_id, test_id, status, ended_at, updated_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (student_id, test_id) DO UPDATE
         SET status = EXCLUDED.status,
             ended_at = EXCLUDED.ended_at,
             updated_at = EXCLUDED.updated_at",
    )
    .bind(student_id)
    .bind(test_id)
    .bind(AttemptStatus::Submitted)
    .bind(ended_at)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(())
}
