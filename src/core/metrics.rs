use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

pub(crate) const ATTEMPTS_SUBMITTED: &str = "attempts_submitted_total";
pub(crate) const ATTEMPTS_REJECTED: &str = "attempts_rejected_total";
pub(crate) const COMMIT_RETRIES: &str = "attempt_commit_retries_total";
pub(crate) const RESERVATIONS_REPAIRED: &str = "attempt_reservations_repaired_total";
pub(crate) const VIEW_DIVERGENCE: &str = "attempt_view_divergence_total";

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);

    metrics::describe_counter!(ATTEMPTS_SUBMITTED, "Attempts scored and committed");
    metrics::describe_counter!(ATTEMPTS_REJECTED, "Submissions rejected, labelled by reason");
    metrics::describe_counter!(COMMIT_RETRIES, "Commit retries after storage conflicts");
    metrics::describe_counter!(RESERVATIONS_REPAIRED, "Orphaned reservations committed later");
    metrics::describe_counter!(VIEW_DIVERGENCE, "Cross-view divergences seen by the audit");

    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_rejection(reason: &'static str) {
    metrics::counter!(ATTEMPTS_REJECTED, "reason" => reason).increment(1);
}
