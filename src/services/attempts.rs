use std::collections::HashSet;

use crate::core::metrics;
use crate::core::redis::start_attempt_key;
use crate::core::state::AppState;
use crate::db::models::{AttemptHistoryEntry, AttemptStatusRecord, ExamTest, ResultRecord, Student};
use crate::services::admission::{self, Admission};
use crate::services::assignment::ensure_assigned;
use crate::services::attempt_sync::{finalize_reservation, CommitDeadline};
use crate::services::errors::AttemptError;
use crate::services::schedule_window::{self, SubmissionWindow, TestStatus};

#[derive(Debug)]
pub(crate) struct AttemptOverview {
    pub(crate) test: ExamTest,
    pub(crate) status: TestStatus,
    pub(crate) progress: Option<AttemptStatusRecord>,
}

#[derive(Debug)]
pub(crate) struct AssignedTest {
    pub(crate) test: ExamTest,
    pub(crate) status: TestStatus,
}

pub(crate) async fn resolve_student(
    state: &AppState,
    account_id: &str,
) -> Result<Student, AttemptError> {
    state
        .store()
        .find_student_by_account(account_id)
        .await?
        .ok_or(AttemptError::StudentProfileNotFound)
}

async fn load_test(state: &AppState, test_id: &str) -> Result<ExamTest, AttemptError> {
    state.store().find_test(test_id).await?.ok_or(AttemptError::TestNotFound)
}

pub(crate) async fn get_attempt_status(
    state: &AppState,
    student_id: &str,
    test_id: &str,
) -> Result<AttemptOverview, AttemptError> {
    let test = load_test(state, test_id).await?;
    ensure_assigned(state.store(), test_id, student_id).await?;

    let has_submitted = state.store().is_submitted(test_id, student_id).await?;
    let progress = state.store().attempt_status(test_id, student_id).await?;
    let status = schedule_window::evaluate_test(state.now(), &test, has_submitted);

    Ok(AttemptOverview { test, status, progress })
}

pub(crate) async fn list_assigned_tests(
    state: &AppState,
    student_id: &str,
) -> Result<Vec<AssignedTest>, AttemptError> {
    let tests = state.store().tests_assigned_to(student_id).await?;
    let submitted: HashSet<String> =
        state.store().submitted_test_ids(student_id).await?.into_iter().collect();
    let now = state.now();

    Ok(tests
        .into_iter()
        .map(|test| {
            let status = schedule_window::evaluate_test(now, &test, submitted.contains(&test.id));
            AssignedTest { test, status }
        })
        .collect())
}

/// Records the client-reported start of an attempt. Repeated starts keep the first timestamp.
pub(crate) async fn start_attempt(
    state: &AppState,
    student_id: &str,
    test_id: &str,
) -> Result<AttemptStatusRecord, AttemptError> {
    let test = load_test(state, test_id).await?;
    ensure_assigned(state.store(), test_id, student_id).await?;

    let has_submitted = state.store().is_submitted(test_id, student_id).await?;
    let now = state.now();
    if has_submitted {
        return Err(AttemptError::AlreadySubmitted);
    }
    match schedule_window::submission_window(now, &test) {
        SubmissionWindow::Open => {}
        SubmissionWindow::NotYetOpen => return Err(AttemptError::NotYetOpen),
        SubmissionWindow::Closed => return Err(AttemptError::WindowClosed),
    }

    let window_seconds = state.settings().attempts().start_rate_limit_seconds;
    match state.redis().rate_limit(&start_attempt_key(test_id, student_id), 1, window_seconds).await
    {
        Ok(true) => {}
        Ok(false) => return Err(AttemptError::RateLimited),
        Err(err) => {
            tracing::warn!(test_id, student_id, error = %err, "Start rate limit unavailable");
        }
    }

    let record = state.store().mark_in_progress(test_id, student_id, now).await?;
    tracing::info!(test_id, student_id, status = ?record.status, "Attempt started");
    Ok(record)
}

/// Full submit pipeline: registry, window, admission, window re-check, scoring and commit.
pub(crate) async fn submit_attempt(
    state: &AppState,
    student_id: &str,
    test_id: &str,
    answers: Vec<Option<i64>>,
) -> Result<ResultRecord, AttemptError> {
    let outcome = run_submission(state, student_id, test_id, answers).await;
    if let Err(err) = &outcome {
        metrics::record_rejection(err.code());
        match err {
            AttemptError::Store(_) | AttemptError::PersistenceConflict { .. } => {
                tracing::error!(test_id, student_id, error = %err, "Submission failed");
            }
            _ => {
                tracing::info!(test_id, student_id, reason = err.code(), "Submission rejected");
            }
        }
    }
    outcome
}

async fn run_submission(
    state: &AppState,
    student_id: &str,
    test_id: &str,
    answers: Vec<Option<i64>>,
) -> Result<ResultRecord, AttemptError> {
    let store = state.store();
    let test = load_test(state, test_id).await?;
    ensure_assigned(store, test_id, student_id).await?;

    let now = state.now();
    match schedule_window::submission_window(now, &test) {
        SubmissionWindow::Open => {}
        SubmissionWindow::NotYetOpen => return Err(AttemptError::NotYetOpen),
        SubmissionWindow::Closed => {
            // A closed window still reports a finished attempt as such.
            if store.is_submitted(test_id, student_id).await? {
                return Err(AttemptError::AlreadySubmitted);
            }
            return Err(AttemptError::WindowClosed);
        }
    }

    let reservation = match admission::try_begin_submission(
        store,
        state.settings(),
        test_id,
        student_id,
        answers,
        now,
    )
    .await?
    {
        Admission::Admitted(reservation) => reservation,
        Admission::Rejected => return Err(AttemptError::AlreadySubmitted),
    };

    if schedule_window::submission_window(state.now(), &test) == SubmissionWindow::Closed {
        admission::release(store, test_id, student_id).await?;
        return Err(AttemptError::WindowClosed);
    }

    let finalized =
        finalize_reservation(state, &test, &reservation, CommitDeadline::WindowClose).await?;
    Ok(finalized.result)
}

pub(crate) async fn attempt_history(
    state: &AppState,
    student_id: &str,
) -> Result<Vec<AttemptHistoryEntry>, AttemptError> {
    Ok(state.store().history_for_student(student_id).await?)
}

pub(crate) async fn own_result(
    state: &AppState,
    student_id: &str,
    test_id: &str,
) -> Result<ResultRecord, AttemptError> {
    load_test(state, test_id).await?;
    ensure_assigned(state.store(), test_id, student_id).await?;
    state.store().find_result(test_id, student_id).await?.ok_or(AttemptError::ResultNotFound)
}
