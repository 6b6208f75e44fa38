// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server runtime orchestration.
//!
//! Startup order:
//!
//! 1. Build the demo namespace
//! 2. Build the namespace controller from the sampling configuration
//! 3. Create the configured probes and wait for their initial values
//! 4. Spawn the simulated mass writer and the probe drain loops
//!
//! Shutdown runs in reverse: background tasks stop, probes are deleted, then
//! the controller stops its tick jobs and sampling tasks. Once
//! [`ServerRuntime::run`] returns no tick callback runs again.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use uademo_config::{load_config, ProbeConfig, PushDeliveryConfig, SamplingConfig, UademoConfig};
use uademo_core::AddressSpace;
use uademo_sampling::{
    AlwaysSample, DataItem, DeliveryClassifier, MonitoredItemId, NamespaceController,
    NumericBelow, PrefixClassifier, QueuedDataItem, SamplingRevision,
};

use crate::demo::{drain_probe, DemoNamespace};
use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// Wiring helpers
// =============================================================================

/// Builds the delivery classifier selected by the configuration.
pub fn classifier_for(config: &PushDeliveryConfig) -> Arc<dyn DeliveryClassifier> {
    match config {
        PushDeliveryConfig::None => Arc::new(AlwaysSample),
        PushDeliveryConfig::Prefix { prefix } => Arc::new(PrefixClassifier::new(prefix.clone())),
        PushDeliveryConfig::NumericBelow { threshold } => Arc::new(NumericBelow::new(*threshold)),
    }
}

/// Builds the parameter revision policy from the configuration.
pub fn revision_for(config: &SamplingConfig) -> SamplingRevision {
    SamplingRevision::new()
        .with_interval_bounds(config.min_sampling_interval_ms, config.max_sampling_interval_ms)
        .with_max_queue_size(config.max_queue_size)
        .with_push_interval(config.push_revised_interval_ms)
}

/// Item id for the probe at `index`. Ids start at 1.
fn probe_item_id(index: usize) -> BinResult<MonitoredItemId> {
    u32::try_from(index)
        .ok()
        .and_then(|index| index.checked_add(1))
        .map(MonitoredItemId)
        .ok_or_else(|| {
            BinError::config("probe index exceeds the monitored item id range")
                .with_context(format!("probes[{}]", index))
        })
}

/// Creates the configured probes as queued items with revised parameters.
///
/// # Errors
///
/// Fails if a probe target cannot be parsed or the probe index has no item id.
pub fn create_probes(
    controller: &NamespaceController,
    probes: &[ProbeConfig],
) -> BinResult<Vec<Arc<QueuedDataItem>>> {
    probes
        .iter()
        .enumerate()
        .map(|(index, probe)| {
            let id = probe_item_id(index)?;
            let read_value_id = probe
                .read_value_id()
                .map_err(|e| BinError::from(e).with_context(format!("probes[{}]", index)))?;
            let revised = controller.on_create_data_item(
                &read_value_id,
                probe.sampling_interval_ms,
                probe.queue_size,
            );

            debug!(
                probe = index,
                node_id = %read_value_id.node_id,
                requested_interval = probe.sampling_interval_ms,
                revised_interval = revised.sampling_interval,
                queue_size = revised.queue_size,
                "Probe revised"
            );

            Ok(Arc::new(QueuedDataItem::new(
                id,
                read_value_id,
                revised.sampling_interval,
                revised.queue_size,
                probe.monitoring_mode,
            )))
        })
        .collect()
}

fn as_data_items(probes: &[Arc<QueuedDataItem>]) -> Vec<Arc<dyn DataItem>> {
    probes
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn DataItem>)
        .collect()
}

// =============================================================================
// RunSummary
// =============================================================================

/// What a completed run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Nodes in the demo namespace.
    pub node_count: usize,
    /// Probes created.
    pub probes: usize,
    /// Probes delivered by sampling.
    pub sampled: usize,
    /// Probes delivered by change notification.
    pub subscribed: usize,
    /// Values delivered across all probes.
    pub delivered: u64,
}

// =============================================================================
// ServerRuntime
// =============================================================================

/// The demo server runtime.
pub struct ServerRuntime {
    config: Arc<UademoConfig>,
    shutdown: ShutdownCoordinator,
    writer_enabled: bool,
    duration: Option<Duration>,
}

impl ServerRuntime {
    /// Creates a new runtime.
    pub fn new(config: UademoConfig) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: ShutdownCoordinator::new(),
            writer_enabled: true,
            duration: None,
        }
    }

    /// The configuration the runtime runs with.
    pub fn config(&self) -> &UademoConfig {
        &self.config
    }

    /// Returns a handle that can stop the runtime.
    pub fn shutdown_handle(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    /// Runs the server until shutdown is signaled or the duration elapses.
    pub async fn run(self) -> BinResult<RunSummary> {
        info!(
            name = %self.config.server.name,
            namespace_uri = %self.config.server.namespace_uri,
            version = uademo_core::VERSION,
            "Starting uademo server"
        );

        let demo = DemoNamespace::build(self.config.server.namespace_index, &self.config.demo)?;

        let address_space: Arc<dyn AddressSpace> = demo.nodes().clone();
        let controller = NamespaceController::builder(address_space)
            .classifier(classifier_for(&self.config.sampling.push_delivery))
            .revision(revision_for(&self.config.sampling))
            .build();

        let probes = match create_probes(&controller, &self.config.probes) {
            Ok(probes) => probes,
            Err(e) => {
                controller.shutdown().await;
                return Err(e);
            }
        };
        let items = as_data_items(&probes);

        for handle in controller.on_data_items_created(&items) {
            if let Err(e) = handle.wait().await {
                warn!(error = %e, "Probe startup failed");
            }
        }

        let mut tasks: Vec<JoinHandle<()>> = Vec::new();

        let writer_interval = self.config.demo.mass_update_interval_ms;
        if self.writer_enabled && writer_interval > 0 && !demo.mass_nodes().is_empty() {
            let writer = demo.writer(Duration::from_millis(writer_interval));
            tasks.push(tokio::spawn(writer.run(self.shutdown.shutdown_signal())));
        }
        for probe in &probes {
            tasks.push(tokio::spawn(drain_probe(
                Arc::clone(probe),
                self.shutdown.shutdown_signal(),
            )));
        }

        info!(
            nodes = demo.nodes().len(),
            probes = probes.len(),
            sampled = controller.sampled_count(),
            subscribed = controller.subscribed_count(),
            "uademo server is ready"
        );

        let mut summary = RunSummary {
            node_count: demo.nodes().len(),
            probes: probes.len(),
            sampled: controller.sampled_count(),
            subscribed: controller.subscribed_count(),
            delivered: 0,
        };

        match self.duration {
            Some(duration) => {
                tokio::select! {
                    _ = self.shutdown.wait_for_shutdown() => {}
                    _ = tokio::time::sleep(duration) => {
                        info!(duration_secs = duration.as_secs(), "Run duration elapsed");
                    }
                }
            }
            None => self.shutdown.wait_for_shutdown().await,
        }
        self.shutdown.initiate_shutdown();

        info!("Shutdown initiated, cleaning up...");

        for result in join_all(tasks).await {
            if let Err(e) = result {
                warn!(error = %e, "Background task failed");
            }
        }

        controller.on_data_items_deleted(&items);
        controller.shutdown().await;

        summary.delivered = probes.iter().map(|p| p.delivered_count()).sum();

        info!(delivered = summary.delivered, "uademo server shutdown complete");
        Ok(summary)
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for constructing the server runtime.
#[derive(Default)]
pub struct RuntimeBuilder {
    config_path: Option<PathBuf>,
    config: Option<UademoConfig>,
    writer_enabled: Option<bool>,
    duration: Option<Duration>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: UademoConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Enables or disables the simulated mass writer.
    pub fn writer_enabled(mut self, enabled: bool) -> Self {
        self.writer_enabled = Some(enabled);
        self
    }

    /// Stops the run after `duration` instead of waiting for a signal.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Builds the runtime. Without a config or path, built-in defaults are
    /// used.
    pub fn build(self) -> BinResult<ServerRuntime> {
        let config = match (self.config, self.config_path) {
            (Some(cfg), _) => cfg,
            (None, Some(path)) => load_config(&path).map_err(|e| {
                BinError::from(e).with_context(format!("Failed to load config from {}", path.display()))
            })?,
            (None, None) => {
                info!("No configuration file given, using built-in defaults");
                let config = UademoConfig::default();
                config.validate()?;
                config
            }
        };

        let mut runtime = ServerRuntime::new(config);
        runtime.writer_enabled = self.writer_enabled.unwrap_or(true);
        runtime.duration = self.duration;
        Ok(runtime)
    }
}

// =============================================================================
// Tests
// =============================================================================
