// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! A [`NamespaceController`] over the fixture namespace, with a timeout on
//! the test body and a controller shutdown afterwards.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uademo_core::{AddressSpace, NodeId, NodeManager, ReadValueId};
use uademo_sampling::{
    DataItem, DeliveryClassifier, MonitoredItemId, NamespaceController, PrefixClassifier,
    QueuedDataItem, SamplingResult, SamplingRevision,
};

use super::fixtures::NodeFixtures;
use super::init_test_logging;

// =============================================================================
// Test Harness
// =============================================================================

/// Configuration for the test harness.
#[derive(Clone)]
pub struct TestHarnessConfig {
    /// Name of the test (used for logging).
    pub test_name: String,

    /// Timeout for the test body.
    pub timeout: Duration,

    /// Classifier the controller uses.
    pub classifier: Arc<dyn DeliveryClassifier>,

    /// Revision policy the controller uses.
    pub revision: SamplingRevision,

    /// Whether to enable tracing for the test.
    pub enable_tracing: bool,
}

impl Default for TestHarnessConfig {
    fn default() -> Self {
        Self {
            test_name: "unknown_test".to_string(),
            timeout: Duration::from_secs(30),
            classifier: Arc::new(PrefixClassifier::default()),
            revision: SamplingRevision::new(),
            enable_tracing: false,
        }
    }
}

impl TestHarnessConfig {
    /// Create a new config with a test name.
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            ..Default::default()
        }
    }

    /// Set the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the classifier.
    pub fn classifier(mut self, classifier: Arc<dyn DeliveryClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Set the revision policy.
    pub fn revision(mut self, revision: SamplingRevision) -> Self {
        self.revision = revision;
        self
    }

    /// Enable tracing.
    pub fn with_tracing(mut self) -> Self {
        self.enable_tracing = true;
        self
    }
}

/// A controller wired to the fixture namespace.
pub struct TestHarness {
    config: TestHarnessConfig,
    nodes: Arc<NodeManager>,
    controller: NamespaceController,
}

impl TestHarness {
    /// Creates a harness. Must be called inside a tokio runtime.
    pub fn new(config: TestHarnessConfig) -> Self {
        if config.enable_tracing {
            init_test_logging();
        }

        let nodes = NodeFixtures::namespace();
        let address_space: Arc<dyn AddressSpace> = nodes.clone();
        let controller = NamespaceController::builder(address_space)
            .classifier(Arc::clone(&config.classifier))
            .revision(config.revision.clone())
            .build();

        tracing::debug!(test = %config.test_name, "Test harness created");

        Self {
            config,
            nodes,
            controller,
        }
    }

    /// Creates a harness with default settings.
    pub fn with_name(test_name: impl Into<String>) -> Self {
        Self::new(TestHarnessConfig::new(test_name))
    }

    /// The fixture node store.
    pub fn nodes(&self) -> &Arc<NodeManager> {
        &self.nodes
    }

    /// The controller under test.
    pub fn controller(&self) -> &NamespaceController {
        &self.controller
    }

    /// Creates a Value item with parameters revised by the controller.
    pub fn item(&self, id: u32, node_id: NodeId, requested_interval: f64) -> Arc<QueuedDataItem> {
        let read_value_id = ReadValueId::value(node_id);
        let revised = self
            .controller
            .on_create_data_item(&read_value_id, requested_interval, 10);
        Arc::new(QueuedDataItem::new(
            MonitoredItemId(id),
            read_value_id,
            revised.sampling_interval,
            revised.queue_size,
            Default::default(),
        ))
    }

    /// Hands `items` to the controller and waits for every sampled startup.
    pub async fn create(&self, items: &[Arc<QueuedDataItem>]) -> SamplingResult<()> {
        for handle in self.controller.on_data_items_created(&as_data_items(items)) {
            handle.wait().await?;
        }
        Ok(())
    }

    /// Deletes `items` through the controller.
    pub fn delete(&self, items: &[Arc<QueuedDataItem>]) {
        self.controller.on_data_items_deleted(&as_data_items(items));
    }

    /// Writes an Int32 into a fixture node.
    pub fn write(&self, node_id: &NodeId, value: i32) {
        self.nodes
            .get_variable(node_id)
            .expect("fixture node exists")
            .write(value)
            .expect("fixture write accepted");
    }

    /// Runs `test` with a timeout, then shuts the controller down.
    ///
    /// # Panics
    ///
    /// Panics if the test body exceeds the configured timeout.
    pub async fn run<F, Fut, T>(self, test: F) -> T
    where
        F: FnOnce(Arc<TestHarness>) -> Fut,
        Fut: Future<Output = T>,
    {
        let timeout = self.config.timeout;
        let name = self.config.test_name.clone();
        let this = Arc::new(self);

        let result = tokio::time::timeout(timeout, test(Arc::clone(&this)))
            .await
            .unwrap_or_else(|_| panic!("test '{}' timed out after {:?}", name, timeout));

        this.controller.shutdown().await;
        result
    }
}

/// Upcasts queued items to the trait the controller takes.
pub fn as_data_items(items: &[Arc<QueuedDataItem>]) -> Vec<Arc<dyn DataItem>> {
    items
        .iter()
        .map(|item| Arc::clone(item) as Arc<dyn DataItem>)
        .collect()
}
