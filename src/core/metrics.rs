use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    if PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn sets_generated(set_count: usize) {
    metrics::counter!("exam_sets_generated_total").increment(set_count as u64);
}

pub(crate) fn assignment_created(mode: &'static str) {
    metrics::counter!("exam_assignments_created_total", "mode" => mode).increment(1);
}

pub(crate) fn assignment_race_recovered(mode: &'static str) {
    metrics::counter!("exam_assignment_races_recovered_total", "mode" => mode).increment(1);
}

pub(crate) fn notification_failed() {
    metrics::counter!("exam_notifications_failed_total").increment(1);
}
