use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::state::AppState;
use crate::tasks::reconcile;

pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handles = vec![
        tokio::spawn(repair_loop(state.clone(), shutdown_rx.clone())),
        tokio::spawn(audit_loop(state.clone(), shutdown_rx)),
    ];

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }

    Ok(())
}

async fn repair_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let period = state.settings().attempts().reconcile_interval_seconds;
    let mut tick = interval(Duration::from_secs(period));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = reconcile::repair_orphaned_reservations(&state).await {
                    tracing::error!(error = %err, "repair_orphaned_reservations failed");
                }
            }
        }
    }
}

async fn audit_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let period = state.settings().attempts().audit_interval_seconds;
    let mut tick = interval(Duration::from_secs(period));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = reconcile::audit_views(&state).await {
                    tracing::error!(error = %err, "audit_views failed");
                }
            }
        }
    }
}
