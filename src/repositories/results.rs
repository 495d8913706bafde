use sqlx::PgPool;

use crate::db::models::ResultRecord;

pub(crate) const COLUMNS: &str = "\
    id, test_id, student_id, teacher_id, score, out_of_marks, answers, attempted_at, \
    duration_taken_seconds, feedback, created_at";

pub(crate) async fn create_if_absent(
    executor: impl sqlx::PgExecutor<'_>,
    result: &ResultRecord,
) -> Result<bool, sqlx::Error> {
    let outcome = sqlx::query(
        "INSERT INTO results (
            id, test_id, student_id, teacher_id, score, out_of_marks, answers, attempted_at,
            duration_taken_seconds, feedback, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
        ON CONFLICT (test_id, student_id) DO NOTHING",
    )
    .bind(&result.id)
    .bind(&result.test_id)
    .bind(&result.student_id)
    .bind(&result.teacher_id)
    .bind(result.score)
    .bind(result.out_of_marks)
    .bind(&result.answers)
    .bind(result.attempted_at)
    .bind(result.duration_taken_seconds)
    .bind(&result.feedback)
    .bind(result.created_at)
    .execute(executor)
    .await?;

    Ok(outcome.rows_affected() > 0)
}

pub(crate) async fn find_by_test_and_student(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_id: &str,
) -> Result<Option<ResultRecord>, sqlx::Error> {
    sqlx::query_as::<_, ResultRecord>(&format!(
        "SELECT {COLUMNS} FROM results WHERE test_id = $1 AND student_id = $2"
    ))
    .bind(test_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_by_test(
    pool: &PgPool,
    test_id: &str,
) -> Result<Vec<ResultRecord>, sqlx::Error> {
    sqlx::query_as::<_, ResultRecord>(&format!(
        "SELECT {COLUMNS} FROM results WHERE test_id = $1 ORDER BY attempted_at, student_id"
    ))
    .bind(test_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn update_feedback(
    pool: &PgPool,
    test_id: &str,
    student_id: &str,
    feedback: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE results SET feedback = $3 WHERE test_id = $1 AND student_id = $2",
    )
    .bind(test_id)
    .bind(student_id)
    .bind(feedback)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
