use anyhow::{Context, Result};
use time::Duration;

use crate::core::metrics::{RESERVATIONS_REPAIRED, VIEW_DIVERGENCE};
use crate::core::state::AppState;
use crate::db::models::DivergenceCounts;
use crate::services::attempt_sync::{finalize_reservation, CommitDeadline};
use crate::store::CommitOutcome;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RepairSummary {
    pub(crate) scanned: usize,
    pub(crate) repaired: usize,
    pub(crate) already_committed: usize,
    pub(crate) skipped: usize,
    pub(crate) failed: usize,
}

fn settled_before(state: &AppState) -> time::PrimitiveDateTime {
    let grace = state.settings().attempts().reconcile_grace_seconds;
    state.now() - Duration::seconds(grace.min(i64::MAX as u64) as i64)
}

/// Commits reservations that were admitted but never got a result, re-scoring the stored
/// answers. Reservations inside the grace period belong to requests still in flight.
pub(crate) async fn repair_orphaned_reservations(state: &AppState) -> Result<RepairSummary> {
    let store = state.store();
    let batch = state.settings().attempts().reconcile_batch_size;
    let pending = store
        .uncommitted_reservations(settled_before(state), batch)
        .await
        .context("Failed to list uncommitted reservations")?;

    let mut summary = RepairSummary { scanned: pending.len(), ..RepairSummary::default() };

    for reservation in pending {
        let test = match store.find_test(&reservation.test_id).await {
            Ok(Some(test)) => test,
            Ok(None) => {
                tracing::warn!(
                    test_id = %reservation.test_id,
                    student_id = %reservation.student_id,
                    "Reservation references a missing test"
                );
                summary.skipped += 1;
                continue;
            }
            Err(err) => {
                tracing::error!(test_id = %reservation.test_id, error = %err, "Failed to load test");
                summary.failed += 1;
                continue;
            }
        };

        match finalize_reservation(state, &test, &reservation, CommitDeadline::Unbounded).await {
            Ok(finalized) if finalized.outcome == CommitOutcome::Committed => {
                metrics::counter!(RESERVATIONS_REPAIRED).increment(1);
                tracing::warn!(
                    test_id = %reservation.test_id,
                    student_id = %reservation.student_id,
                    score = finalized.result.score,
                    "Repaired orphaned reservation"
                );
                summary.repaired += 1;
            }
            Ok(_) => summary.already_committed += 1,
            Err(err) => {
                tracing::error!(
                    test_id = %reservation.test_id,
                    student_id = %reservation.student_id,
                    error = %err,
                    "Failed to repair reservation"
                );
                summary.failed += 1;
            }
        }
    }

    if summary.scanned > 0 {
        tracing::info!(?summary, "Reservation repair pass finished");
    }
    Ok(summary)
}

/// Read-only check that the submitted set, results, history and statuses agree.
pub(crate) async fn audit_views(state: &AppState) -> Result<DivergenceCounts> {
    let counts = state
        .store()
        .divergences(settled_before(state))
        .await
        .context("Failed to count view divergences")?;

    let total = counts.total();
    if total > 0 {
        metrics::counter!(VIEW_DIVERGENCE).increment(total as u64);
        tracing::warn!(?counts, total, "Attempt views diverged");
    } else {
        tracing::debug!("Attempt views consistent");
    }
    Ok(counts)
}
