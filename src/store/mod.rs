pub(crate) mod postgres;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::db::models::{
    AttemptHistoryEntry, AttemptStatusRecord, DivergenceCounts, ExamTest, Reservation,
    ResultRecord, Student,
};

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    /// Another writer touched the same rows; the operation is safe to retry.
    #[error("concurrent update conflict: {0}")]
    Conflict(String),
    #[error("no reservation for test {test_id} and student {student_id}")]
    ReservationMissing { test_id: String, student_id: String },
    /// A write broke a storage constraint, such as reserving an unassigned pair.
    #[error("constraint violated: {0}")]
    ConstraintViolation(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Database(sqlx::Error),
}

impl StoreError {
    pub(crate) fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => {
                    return Self::Conflict(db_err.message().to_string());
                }
                Some(FOREIGN_KEY_VIOLATION | UNIQUE_VIOLATION) => {
                    return Self::ConstraintViolation(db_err.message().to_string());
                }
                _ => {}
            }
        }
        Self::Database(err)
    }
}

/// Everything the synchronizer writes for one attempt, applied all-or-nothing.
#[derive(Debug, Clone)]
pub(crate) struct AttemptCommit {
    pub(crate) result: ResultRecord,
    pub(crate) history: AttemptHistoryEntry,
    pub(crate) committed_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommitOutcome {
    Committed,
    /// A result for the pair already exists and is kept. History, status and the
    /// reservation's commit mark are brought in line with it.
    AlreadyCommitted,
}

/// Persistence seam for tests, the roster, the submitted set and the derived views.
#[async_trait]
pub(crate) trait AttemptStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_test(&self, test_id: &str) -> Result<Option<ExamTest>, StoreError>;

    /// Persists a new test together with its initial assigned set.
    async fn create_test(&self, test: &ExamTest, assignees: &[String]) -> Result<(), StoreError>;

    async fn tests_assigned_to(&self, student_id: &str) -> Result<Vec<ExamTest>, StoreError>;

    async fn find_student_by_account(
        &self,
        account_id: &str,
    ) -> Result<Option<Student>, StoreError>;

    async fn roster_ids(
        &self,
        organization: Option<&str>,
        class_name: Option<&str>,
    ) -> Result<Vec<String>, StoreError>;

    async fn existing_student_ids(&self, student_ids: &[String])
        -> Result<Vec<String>, StoreError>;

    /// Adds students to the assigned set; returns how many were new.
    async fn assign_students(
        &self,
        test_id: &str,
        student_ids: &[String],
        now: PrimitiveDateTime,
    ) -> Result<u64, StoreError>;

    async fn is_assigned(&self, test_id: &str, student_id: &str) -> Result<bool, StoreError>;

    async fn assigned_student_ids(&self, test_id: &str) -> Result<Vec<String>, StoreError>;

    /// Atomic insert-if-absent into the submitted set.
    async fn reserve_submission(&self, reservation: &Reservation) -> Result<bool, StoreError>;

    /// Removes a reservation that has no committed result yet.
    async fn release_reservation(&self, test_id: &str, student_id: &str)
        -> Result<bool, StoreError>;

    async fn is_submitted(&self, test_id: &str, student_id: &str) -> Result<bool, StoreError>;

    async fn submitted_student_ids(&self, test_id: &str) -> Result<Vec<String>, StoreError>;

    async fn submitted_test_ids(&self, student_id: &str) -> Result<Vec<String>, StoreError>;

    async fn uncommitted_reservations(
        &self,
        reserved_before: PrimitiveDateTime,
        limit: u32,
    ) -> Result<Vec<Reservation>, StoreError>;

    /// Writes result, history entry and submitted status in one unit.
    async fn commit_attempt(&self, commit: &AttemptCommit) -> Result<CommitOutcome, StoreError>;

    async fn attempt_status(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> Result<Option<AttemptStatusRecord>, StoreError>;

    async fn mark_in_progress(
        &self,
        test_id: &str,
        student_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<AttemptStatusRecord, StoreError>;

    async fn find_result(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> Result<Option<ResultRecord>, StoreError>;

    async fn results_for_test(&self, test_id: &str) -> Result<Vec<ResultRecord>, StoreError>;

    async fn history_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttemptHistoryEntry>, StoreError>;

    async fn set_feedback(
        &self,
        test_id: &str,
        student_id: &str,
        feedback: Option<&str>,
    ) -> Result<bool, StoreError>;

    async fn divergences(
        &self,
        settled_before: PrimitiveDateTime,
    ) -> Result<DivergenceCounts, StoreError>;
}
