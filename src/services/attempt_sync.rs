use sqlx::types::Json;
use uuid::Uuid;

use crate::core::metrics::ATTEMPTS_SUBMITTED;
use crate::core::state::AppState;
use crate::db::models::{AttemptHistoryEntry, ExamTest, Reservation, ResultRecord};
use crate::services::admission;
use crate::services::errors::AttemptError;
use crate::services::retry::retry_on_conflict;
use crate::services::schedule_window::{self, SubmissionWindow};
use crate::services::scoring;
use crate::store::{AttemptCommit, CommitOutcome};

#[derive(Debug)]
pub(crate) struct FinalizedAttempt {
    pub(crate) result: ResultRecord,
    pub(crate) outcome: CommitOutcome,
}

/// How long a commit may keep trying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommitDeadline {
    /// Every commit attempt re-checks the window; a close voids the admission.
    WindowClose,
    /// Reconciler repairs of admissions made while the window was open.
    Unbounded,
}

/// Scores an admitted reservation and commits result, history and status together.
/// Safe to repeat: a pair that already has a result keeps it.
pub(crate) async fn finalize_reservation(
    state: &AppState,
    test: &ExamTest,
    reservation: &Reservation,
    deadline: CommitDeadline,
) -> Result<FinalizedAttempt, AttemptError> {
    let store = state.store();
    let sheet = scoring::score(test.questions(), &reservation.answers.0);

    let started_at = store
        .attempt_status(&reservation.test_id, &reservation.student_id)
        .await?
        .and_then(|status| status.started_at);
    let duration_taken_seconds =
        started_at.map(|started| (reservation.submitted_at - started).whole_seconds().max(0));

    let now = state.now();
    let result = ResultRecord {
        id: Uuid::new_v4().to_string(),
        test_id: reservation.test_id.clone(),
        student_id: reservation.student_id.clone(),
        teacher_id: test.teacher_id.clone(),
        score: sheet.score,
        out_of_marks: sheet.out_of_marks,
        answers: Json(sheet.records),
        attempted_at: reservation.submitted_at,
        duration_taken_seconds,
        feedback: None,
        created_at: now,
    };
    let commit = AttemptCommit {
        history: AttemptHistoryEntry::from(&result),
        result,
        committed_at: now,
    };

    let commit_ref = &commit;
    let outcome = retry_on_conflict(state.settings(), "commit", move || async move {
        if deadline == CommitDeadline::WindowClose
            && schedule_window::submission_window(state.now(), test) == SubmissionWindow::Closed
        {
            return Ok(None);
        }
        store.commit_attempt(commit_ref).await.map(Some)
    })
    .await?;

    let Some(outcome) = outcome else {
        admission::release(store, &reservation.test_id, &reservation.student_id).await?;
        tracing::info!(
            test_id = %reservation.test_id,
            student_id = %reservation.student_id,
            "Window closed before the commit landed"
        );
        return Err(AttemptError::WindowClosed);
    };

    match outcome {
        CommitOutcome::Committed => {
            metrics::counter!(ATTEMPTS_SUBMITTED).increment(1);
            tracing::info!(
                test_id = %reservation.test_id,
                student_id = %reservation.student_id,
                score = commit.result.score,
                out_of_marks = commit.result.out_of_marks,
                "Attempt committed"
            );
            Ok(FinalizedAttempt { result: commit.result, outcome })
        }
        CommitOutcome::AlreadyCommitted => {
            let existing = store
                .find_result(&reservation.test_id, &reservation.student_id)
                .await?
                .ok_or(AttemptError::ResultNotFound)?;
            tracing::info!(
                test_id = %reservation.test_id,
                student_id = %reservation.student_id,
                "Attempt was already committed"
            );
            Ok(FinalizedAttempt { result: existing, outcome })
        }
    }
}
