use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::DivergenceCounts;
use crate::db::types::AttemptStatus;

/// Counts pairs on which the submitted set, results, history and statuses disagree.
/// Reservations younger than `settled_before` are still in flight and not counted.
pub(crate) async fn count_divergences(
    pool: &PgPool,
    settled_before: PrimitiveDateTime,
) -> Result<DivergenceCounts, sqlx::Error> {
    sqlx::query_as::<_, DivergenceCounts>(
        "SELECT
            (SELECT COUNT(*) FROM test_submissions s
             WHERE s.reserved_at < $1
               AND NOT EXISTS (SELECT 1 FROM results r
                               WHERE r.test_id = s.test_id AND r.student_id = s.student_id))
                AS reserved_without_result,
            (SELECT COUNT(*) FROM results r
             WHERE NOT EXISTS (SELECT 1 FROM test_submissions s
                               WHERE s.test_id = r.test_id AND s.student_id = r.student_id))
                AS result_without_reservation,
            (SELECT COUNT(*) FROM results r
             WHERE NOT EXISTS (SELECT 1 FROM attempt_history h
                               WHERE h.test_id = r.test_id AND h.student_id = r.student_id))
                AS result_without_history,
            (SELECT COUNT(*) FROM attempt_history h
             WHERE NOT EXISTS (SELECT 1 FROM results r
                               WHERE r.test_id = h.test_id AND r.student_id = h.student_id))
                AS history_without_result,
            (SELECT COUNT(*) FROM results r
             WHERE NOT EXISTS (SELECT 1 FROM attempt_statuses a
                               WHERE a.test_id = r.test_id AND a.student_id = r.student_id
                                 AND a.status = $2))
                AS result_without_submitted_status",
    )
    .bind(settled_before)
    .bind(AttemptStatus::Submitted)
    .fetch_one(pool)
    .await
}
