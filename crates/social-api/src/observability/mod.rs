//! Observability module for Social API.
//!
//! Provides metrics definitions and the Prometheus recorder setup.

pub mod metrics;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder and return a handle for rendering.
///
/// Can only succeed once per process.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}
