use serde::Serialize;
use time::{Duration, PrimitiveDateTime};

use crate::db::models::ExamTest;

/// Temporal state of one test for one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum TestStatus {
    Upcoming,
    Ongoing,
    #[serde(rename = "submitted")]
    Completed,
    Closed,
}

/// The only place test status is derived. Window is `[scheduled_at, scheduled_at + duration)`;
/// an unscheduled test stays upcoming until it is attempted.
pub(crate) fn evaluate(
    now: PrimitiveDateTime,
    scheduled_at: Option<PrimitiveDateTime>,
    duration_minutes: i32,
    has_submitted: bool,
) -> TestStatus {
    if has_submitted {
        return TestStatus::Completed;
    }
    let Some(opens_at) = scheduled_at else {
        return TestStatus::Upcoming;
    };
    let closes_at = closes_at(opens_at, duration_minutes);

    if now < opens_at {
        TestStatus::Upcoming
    } else if now < closes_at {
        TestStatus::Ongoing
    } else {
        TestStatus::Closed
    }
}

/// Exclusive end of a window. A non-positive duration closes it at the opening instant.
pub(crate) fn closes_at(opens_at: PrimitiveDateTime, duration_minutes: i32) -> PrimitiveDateTime {
    opens_at + Duration::minutes(i64::from(duration_minutes.max(0)))
}

pub(crate) fn evaluate_test(
    now: PrimitiveDateTime,
    test: &ExamTest,
    has_submitted: bool,
) -> TestStatus {
    evaluate(now, test.scheduled_at, test.duration_minutes, has_submitted)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubmissionWindow {
    Open,
    NotYetOpen,
    Closed,
}

/// Whether a not-yet-submitted attempt may be written at `now`.
pub(crate) fn submission_window(now: PrimitiveDateTime, test: &ExamTest) -> SubmissionWindow {
    match evaluate_test(now, test, false) {
        TestStatus::Ongoing => SubmissionWindow::Open,
        TestStatus::Upcoming if test.scheduled_at.is_none() => SubmissionWindow::Open,
        TestStatus::Upcoming => SubmissionWindow::NotYetOpen,
        TestStatus::Closed | TestStatus::Completed => SubmissionWindow::Closed,
    }
}
