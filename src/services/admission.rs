use sqlx::types::Json;
use time::PrimitiveDateTime;

use crate::core::config::Settings;
use crate::db::models::Reservation;
use crate::services::errors::AttemptError;
use crate::services::retry::retry_on_conflict;
use crate::store::AttemptStore;

#[derive(Debug)]
pub(crate) enum Admission {
    Admitted(Reservation),
    Rejected,
}

/// Claims the (test, student) pair with one conditional insert into the submitted set.
/// Only the caller that actually inserted the row is admitted.
pub(crate) async fn try_begin_submission(
    store: &dyn AttemptStore,
    settings: &Settings,
    test_id: &str,
    student_id: &str,
    answers: Vec<Option<i64>>,
    now: PrimitiveDateTime,
) -> Result<Admission, AttemptError> {
    let reservation = Reservation {
        test_id: test_id.to_string(),
        student_id: student_id.to_string(),
        answers: Json(answers),
        submitted_at: now,
        reserved_at: now,
        committed_at: None,
    };

    let reservation_ref = &reservation;
    let inserted =
        retry_on_conflict(settings, "reserve", move || store.reserve_submission(reservation_ref))
            .await?;

    if inserted {
        Ok(Admission::Admitted(reservation))
    } else {
        Ok(Admission::Rejected)
    }
}

/// Undoes an admission that a later gate refused. Committed reservations stay.
pub(crate) async fn release(
    store: &dyn AttemptStore,
    test_id: &str,
    student_id: &str,
) -> Result<(), AttemptError> {
    let released = store.release_reservation(test_id, student_id).await?;
    if !released {
        tracing::warn!(test_id, student_id, "Reservation was not released");
    }
    Ok(())
}
