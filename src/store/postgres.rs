use async_trait::async_trait;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{
    AttemptHistoryEntry, AttemptStatusRecord, DivergenceCounts, ExamTest, Reservation,
    ResultRecord, Student,
};
use crate::repositories;
use crate::store::{AttemptCommit, AttemptStore, CommitOutcome, StoreError};

#[derive(Clone)]
pub(crate) struct PgAttemptStore {
    pool: PgPool,
}

impl PgAttemptStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptStore for PgAttemptStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_test(&self, test_id: &str) -> Result<Option<ExamTest>, StoreError> {
        Ok(repositories::exam_tests::find_by_id(&self.pool, test_id).await?)
    }

    async fn create_test(&self, test: &ExamTest, assignees: &[String]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        repositories::exam_tests::create(&mut *tx, test).await?;
        repositories::assignments::insert_many(&mut *tx, &test.id, assignees, test.created_at)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn tests_assigned_to(&self, student_id: &str) -> Result<Vec<ExamTest>, StoreError> {
        Ok(repositories::exam_tests::list_assigned_to(&self.pool, student_id).await?)
    }

    async fn find_student_by_account(
        &self,
        account_id: &str,
    ) -> Result<Option<Student>, StoreError> {
        Ok(repositories::students::find_by_account(&self.pool, account_id).await?)
    }

    async fn roster_ids(
        &self,
        organization: Option<&str>,
        class_name: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        Ok(repositories::students::list_roster_ids(&self.pool, organization, class_name).await?)
    }

    async fn existing_student_ids(
        &self,
        student_ids: &[String],
    ) -> Result<Vec<String>, StoreError> {
        Ok(repositories::students::existing_ids(&self.pool, student_ids).await?)
    }

    async fn assign_students(
        &self,
        test_id: &str,
        student_ids: &[String],
        now: PrimitiveDateTime,
    ) -> Result<u64, StoreError> {
        Ok(repositories::assignments::insert_many(&self.pool, test_id, student_ids, now).await?)
    }

    async fn is_assigned(&self, test_id: &str, student_id: &str) -> Result<bool, StoreError> {
        Ok(repositories::assignments::exists(&self.pool, test_id, student_id).await?)
    }

    async fn assigned_student_ids(&self, test_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(repositories::assignments::list_student_ids(&self.pool, test_id).await?)
    }

    async fn reserve_submission(&self, reservation: &Reservation) -> Result<bool, StoreError> {
        Ok(repositories::reservations::create_if_absent(&self.pool, reservation).await?)
    }

    async fn release_reservation(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(repositories::reservations::release(&self.pool, test_id, student_id).await?)
    }

    async fn is_submitted(&self, test_id: &str, student_id: &str) -> Result<bool, StoreError> {
        Ok(repositories::reservations::exists(&self.pool, test_id, student_id).await?)
    }

    async fn submitted_student_ids(&self, test_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(repositories::reservations::list_student_ids(&self.pool, test_id).await?)
    }

    async fn submitted_test_ids(&self, student_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(repositories::reservations::list_test_ids_for_student(&self.pool, student_id).await?)
    }

    async fn uncommitted_reservations(
        &self,
        reserved_before: PrimitiveDateTime,
        limit: u32,
    ) -> Result<Vec<Reservation>, StoreError> {
        Ok(repositories::reservations::list_uncommitted(
            &self.pool,
            reserved_before,
            i64::from(limit),
        )
        .await?)
    }

    async fn commit_attempt(&self, commit: &AttemptCommit) -> Result<CommitOutcome, StoreError> {
        let test_id = commit.result.test_id.as_str();
        let student_id = commit.result.student_id.as_str();

        let mut tx = self.pool.begin().await?;

        // Row lock serializes the request path against the reconciler for this pair.
        let reservation =
            repositories::reservations::lock_for_commit(&mut *tx, test_id, student_id).await?;
        let Some(reservation) = reservation else {
            return Err(StoreError::ReservationMissing {
                test_id: test_id.to_string(),
                student_id: student_id.to_string(),
            });
        };
        if reservation.committed_at.is_some() {
            return Ok(CommitOutcome::AlreadyCommitted);
        }

        let outcome = if repositories::results::create_if_absent(&mut *tx, &commit.result).await? {
            repositories::attempt_history::create_if_absent(&mut *tx, &commit.history).await?;
            repositories::attempt_statuses::mark_submitted(
                &mut *tx,
                test_id,
                student_id,
                commit.result.attempted_at,
                commit.committed_at,
            )
            .await?;
            CommitOutcome::Committed
        } else {
            // An earlier result stands; bring the other views in line with it.
            let existing =
                repositories::results::find_by_test_and_student(&mut *tx, test_id, student_id)
                    .await?
                    .ok_or_else(|| StoreError::Conflict("result changed during commit".into()))?;
            repositories::attempt_history::create_if_absent(
                &mut *tx,
                &AttemptHistoryEntry::from(&existing),
            )
            .await?;
            repositories::attempt_statuses::mark_submitted(
                &mut *tx,
                test_id,
                student_id,
                existing.attempted_at,
                commit.committed_at,
            )
            .await?;
            CommitOutcome::AlreadyCommitted
        };
        repositories::reservations::mark_committed(
            &mut *tx,
            test_id,
            student_id,
            commit.committed_at,
        )
        .await?;

        tx.commit().await?;
        Ok(outcome)
    }

    async fn attempt_status(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> Result<Option<AttemptStatusRecord>, StoreError> {
        Ok(repositories::attempt_statuses::find(&self.pool, test_id, student_id).await?)
    }

    async fn mark_in_progress(
        &self,
        test_id: &str,
        student_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<AttemptStatusRecord, StoreError> {
        Ok(repositories::attempt_statuses::mark_in_progress(&self.pool, test_id, student_id, now)
            .await?)
    }

    async fn find_result(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> Result<Option<ResultRecord>, StoreError> {
        Ok(repositories::results::find_by_test_and_student(&self.pool, test_id, student_id)
            .await?)
    }

    async fn results_for_test(&self, test_id: &str) -> Result<Vec<ResultRecord>, StoreError> {
        Ok(repositories::results::list_by_test(&self.pool, test_id).await?)
    }

    async fn history_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttemptHistoryEntry>, StoreError> {
        Ok(repositories::attempt_history::list_by_student(&self.pool, student_id).await?)
    }

    async fn set_feedback(
        &self,
        test_id: &str,
        student_id: &str,
        feedback: Option<&str>,
    ) -> Result<bool, StoreError> {
        Ok(repositories::results::update_feedback(&self.pool, test_id, student_id, feedback)
            .await?)
    }

    async fn divergences(
        &self,
        settled_before: PrimitiveDateTime,
    ) -> Result<DivergenceCounts, StoreError> {
        Ok(repositories::consistency::count_divergences(&self.pool, settled_before).await?)
    }
}
