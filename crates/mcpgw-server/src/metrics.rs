//! Prometheus recorder and `/metrics` rendering.
//!
//! Metric names live in `mcpgw_gateway::telemetry`; this module only owns
//! the exporter side.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus recorder as the global `metrics` recorder.
///
/// Call once at startup, before any metric is recorded. Fails if another
/// recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format, or an empty body without a recorder.
pub fn render(handle: Option<&PrometheusHandle>) -> String {
    handle.map(PrometheusHandle::render).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::Recorder;

    #[test]
    fn renders_recorded_counter() {
        // Local recorder, no global install.
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let key = metrics::Key::from_name(mcpgw_gateway::telemetry::SESSIONS_CREATED_TOTAL);
        let meta = metrics::Metadata::new(module_path!(), metrics::Level::INFO, None);
        recorder.register_counter(&key, &meta).increment(3);

        let text = render(Some(&handle));
        assert!(text.contains("gateway_sessions_created_total 3"), "{text}");
    }

    #[test]
    fn render_without_recorder_is_empty() {
        assert!(render(None).is_empty());
    }
}
