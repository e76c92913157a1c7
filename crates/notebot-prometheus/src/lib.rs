// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for the Notebot pipeline.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. When enabled,
//! the exporter serves the text format over HTTP on the configured address.

pub mod recording;

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use notebot_core::{AdapterType, HealthStatus, NotebotError, PluginAdapter};

pub use recording::{
    record_download, record_event, record_event_latency, register_metrics, set_active_users,
};

const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Prometheus metrics adapter.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Installs the recorder globally and serves it on `listen_address`.
    ///
    /// Only one recorder can be installed per process. Must be called from
    /// within a Tokio runtime, which drives the HTTP listener.
    pub fn install(listen_address: &str) -> Result<Self, NotebotError> {
        let addr: SocketAddr = listen_address.parse().map_err(|e| {
            NotebotError::Config(format!(
                "prometheus.listen_address {listen_address:?} is invalid: {e}"
            ))
        })?;

        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(addr)
            .build()
            .map_err(|e| {
                NotebotError::Internal(format!("failed to build Prometheus exporter: {e}"))
            })?;
        let handle = recorder.handle();
        metrics::set_global_recorder(recorder).map_err(|e| {
            NotebotError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        tokio::spawn(async move {
            if let Err(e) = exporter.await {
                tracing::error!(error = ?e, "prometheus exporter stopped");
            }
        });
        let upkeep = handle.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(UPKEEP_INTERVAL);
            loop {
                interval.tick().await;
                upkeep.run_upkeep();
            }
        });

        recording::register_metrics();

        tracing::info!(address = %addr, "prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Get a reference to the Prometheus handle for rendering.
    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, NotebotError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), NotebotError> {
        Ok(())
    }
}
