//! Prometheus recorder for the `--metrics` flag
//!
//! The runtime counters (`auth_requests_total`, `auth_refresh_total`,
//! `auth_replays_total`, `auth_session_terminations_total`) are rendered in the
//! Prometheus text format to stderr after the request completes.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")
}
