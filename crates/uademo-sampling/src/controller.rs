// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Monitored item lifecycle callbacks for one namespace.
//!
//! The subscription layer calls into [`NamespaceController`] whenever a client
//! creates, modifies or deletes monitored items, or changes their monitoring
//! mode. The controller picks a delivery strategy per item and tracks the live
//! instances.
//!
//! ```text
//!  on_data_items_created ──▶ resolve node ──▶ classify
//!                                              ├── Sampled    ──▶ SampledItem    ──▶ TickManager
//!                                              └── Subscribed ──▶ SubscribedItem ──▶ node observer
//!
//!  on_data_items_modified      ──▶ SampledItem::modify_rate
//!  on_data_items_deleted       ──▶ shutdown + forget
//!  on_monitoring_mode_changed  ──▶ set_sampling_enabled
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, error, info, warn};

use uademo_core::node::AddressSpace;
use uademo_core::types::ReadValueId;

use crate::classify::{Delivery, DeliveryClassifier, PrefixClassifier};
use crate::item::{DataItem, MonitoredItemId};
use crate::revision::{RevisedParameters, SamplingRevision};
use crate::sampled::{SampledItem, StartupHandle};
use crate::sampler::NodeSampler;
use crate::scope::SamplingScope;
use crate::subscribed::SubscribedItem;
use crate::tick::TickManager;

/// Tracks the delivery instances behind a namespace's monitored items.
pub struct NamespaceController {
    address_space: Arc<dyn AddressSpace>,
    classifier: Arc<dyn DeliveryClassifier>,
    revision: SamplingRevision,
    scope: SamplingScope,
    ticks: TickManager,
    sampled: DashMap<MonitoredItemId, Arc<SampledItem>>,
    subscribed: DashMap<MonitoredItemId, Arc<SubscribedItem>>,
}

impl NamespaceController {
    /// Starts building a controller over `address_space`.
    pub fn builder(address_space: Arc<dyn AddressSpace>) -> NamespaceControllerBuilder {
        NamespaceControllerBuilder::new(address_space)
    }

    /// The tick manager shared by sampled items.
    pub fn tick_manager(&self) -> &TickManager {
        &self.ticks
    }

    /// The task scope shared by sampled items and tick jobs.
    pub fn scope(&self) -> &SamplingScope {
        &self.scope
    }

    /// The revision policy.
    pub fn revision(&self) -> &SamplingRevision {
        &self.revision
    }

    /// Classifies the node a monitored item targets.
    pub fn delivery_for(&self, read_value_id: &ReadValueId) -> Delivery {
        self.classifier.classify(&read_value_id.node_id)
    }

    // =========================================================================
    // Revision hooks
    // =========================================================================

    /// Revises the parameters of an item about to be created.
    pub fn on_create_data_item(
        &self,
        read_value_id: &ReadValueId,
        requested_interval: f64,
        requested_queue_size: u32,
    ) -> RevisedParameters {
        self.revision.revise(
            self.delivery_for(read_value_id),
            requested_interval,
            requested_queue_size,
        )
    }

    /// Revises the parameters of an existing item about to be modified.
    pub fn on_modify_data_item(
        &self,
        read_value_id: &ReadValueId,
        requested_interval: f64,
        requested_queue_size: u32,
    ) -> RevisedParameters {
        self.on_create_data_item(read_value_id, requested_interval, requested_queue_size)
    }

    // =========================================================================
    // Lifecycle callbacks
    // =========================================================================

    /// Starts delivery for newly created items.
    ///
    /// Items whose node cannot be resolved are skipped. The returned handles
    /// resolve once each sampled item has delivered its initial value and
    /// registered for ticks; subscribed items start synchronously and have no
    /// handle.
    pub fn on_data_items_created(&self, items: &[Arc<dyn DataItem>]) -> Vec<StartupHandle> {
        let mut handles = Vec::new();

        for item in items {
            let read_value_id = item.read_value_id();
            let Some(node) = self.address_space.get(&read_value_id.node_id) else {
                debug!(
                    item_id = %item.id(),
                    node_id = %read_value_id.node_id,
                    "Node not found, skipping monitored item"
                );
                continue;
            };

            let sampling_enabled = item.monitoring_mode().is_sampling_enabled();

            match self.delivery_for(read_value_id) {
                Delivery::Sampled => {
                    let sampler = Arc::new(NodeSampler::new(node, read_value_id.clone()));
                    let sampled = SampledItem::new(
                        Arc::clone(item),
                        sampler,
                        self.scope.clone(),
                        self.ticks.clone(),
                    );
                    sampled.set_sampling_enabled(sampling_enabled);

                    match sampled.startup() {
                        Ok(handle) => {
                            handles.push(handle);
                            self.retire(item.id());
                            self.sampled.insert(item.id(), sampled);
                        }
                        Err(e) => {
                            error!(item_id = %item.id(), error = %e, "Sampled item startup failed");
                        }
                    }
                }
                Delivery::Subscribed => {
                    let subscribed = match SubscribedItem::new(Arc::clone(item), node) {
                        Ok(subscribed) => subscribed,
                        Err(e) => {
                            warn!(item_id = %item.id(), error = %e, "Cannot subscribe monitored item");
                            continue;
                        }
                    };
                    subscribed.set_sampling_enabled(sampling_enabled);

                    match subscribed.startup() {
                        Ok(()) => {
                            self.retire(item.id());
                            self.subscribed.insert(item.id(), subscribed);
                        }
                        Err(e) => {
                            error!(item_id = %item.id(), error = %e, "Subscribed item startup failed");
                        }
                    }
                }
            }
        }

        debug!(
            requested = items.len(),
            sampled = self.sampled.len(),
            subscribed = self.subscribed.len(),
            "Monitored items created"
        );
        handles
    }

    /// Applies revised sampling intervals. Subscribed items are unaffected.
    pub fn on_data_items_modified(&self, items: &[Arc<dyn DataItem>]) {
        for item in items {
            let Some(sampled) = self.sampled.get(&item.id()).map(|e| Arc::clone(e.value())) else {
                continue;
            };
            if let Err(e) = sampled.modify_rate(item.sampling_interval()) {
                warn!(
                    item_id = %item.id(),
                    interval_ms = item.sampling_interval(),
                    error = %e,
                    "Failed to modify sampling rate"
                );
            }
        }
    }

    /// Stops and forgets the given items. Unknown items are ignored.
    pub fn on_data_items_deleted(&self, items: &[Arc<dyn DataItem>]) {
        for item in items {
            self.retire(item.id());
        }
    }

    /// Stops and forgets whichever instance currently serves `id`.
    fn retire(&self, id: MonitoredItemId) {
        if let Some((_, sampled)) = self.sampled.remove(&id) {
            sampled.shutdown();
        }
        if let Some((_, subscribed)) = self.subscribed.remove(&id) {
            subscribed.shutdown();
        }
    }

    /// Mirrors each item's monitoring mode onto its delivery instance.
    pub fn on_monitoring_mode_changed(&self, items: &[Arc<dyn DataItem>]) {
        for item in items {
            let enabled = item.monitoring_mode().is_sampling_enabled();
            if let Some(sampled) = self.sampled.get(&item.id()) {
                sampled.set_sampling_enabled(enabled);
            }
            if let Some(subscribed) = self.subscribed.get(&item.id()) {
                subscribed.set_sampling_enabled(enabled);
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of tracked sampled items.
    pub fn sampled_count(&self) -> usize {
        self.sampled.len()
    }

    /// Number of tracked subscribed items.
    pub fn subscribed_count(&self) -> usize {
        self.subscribed.len()
    }

    /// The sampled item tracked for `id`.
    pub fn sampled_item(&self, id: MonitoredItemId) -> Option<Arc<SampledItem>> {
        self.sampled.get(&id).map(|e| Arc::clone(e.value()))
    }

    /// The subscribed item tracked for `id`.
    pub fn subscribed_item(&self, id: MonitoredItemId) -> Option<Arc<SubscribedItem>> {
        self.subscribed.get(&id).map(|e| Arc::clone(e.value()))
    }

    /// Stops every tracked item, then the tick manager, then the scope.
    ///
    /// Once this returns no tick callback or sampling task is running.
    pub async fn shutdown(&self) {
        let sampled: Vec<_> = self.sampled.iter().map(|e| Arc::clone(e.value())).collect();
        self.sampled.clear();
        let subscribed: Vec<_> = self.subscribed.iter().map(|e| Arc::clone(e.value())).collect();
        self.subscribed.clear();

        for item in &sampled {
            item.shutdown();
        }
        for item in &subscribed {
            item.shutdown();
        }

        self.ticks.shutdown().await;
        self.scope.shutdown().await;

        info!(
            sampled = sampled.len(),
            subscribed = subscribed.len(),
            "Namespace controller stopped"
        );
    }
}

impl std::fmt::Debug for NamespaceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceController")
            .field("sampled", &self.sampled.len())
            .field("subscribed", &self.subscribed.len())
            .field("ticks", &self.ticks)
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`NamespaceController`].
pub struct NamespaceControllerBuilder {
    address_space: Arc<dyn AddressSpace>,
    classifier: Arc<dyn DeliveryClassifier>,
    revision: SamplingRevision,
    scope: Option<SamplingScope>,
}

impl NamespaceControllerBuilder {
    fn new(address_space: Arc<dyn AddressSpace>) -> Self {
        Self {
            address_space,
            classifier: Arc::new(PrefixClassifier::default()),
            revision: SamplingRevision::default(),
            scope: None,
        }
    }

    /// Sets the push-versus-poll classifier.
    pub fn classifier(mut self, classifier: Arc<dyn DeliveryClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Sets the revision policy.
    pub fn revision(mut self, revision: SamplingRevision) -> Self {
        self.revision = revision;
        self
    }

    /// Uses an existing task scope.
    pub fn scope(mut self, scope: SamplingScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Builds the controller.
    ///
    /// # Panics
    ///
    /// Panics when no scope was given and this is called outside a tokio runtime.
    pub fn build(self) -> NamespaceController {
        let scope = self.scope.unwrap_or_else(SamplingScope::current);
        let ticks = TickManager::new(scope.clone());

        NamespaceController {
            address_space: self.address_space,
            classifier: self.classifier,
            revision: self.revision,
            scope,
            ticks,
            sampled: DashMap::new(),
            subscribed: DashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use uademo_core::memory::{NodeManager, VariableNode};
    use uademo_core::types::{data_types, MonitoringMode, NodeId, Variant};

    use crate::classify::AlwaysSample;
    use crate::item::QueuedDataItem;

    fn address_space() -> Arc<NodeManager> {
        let nodes = NodeManager::new();
        nodes
            .add_node(
                VariableNode::builder(NodeId::string(2, "Static/Double"))
                    .data_type(data_types::DOUBLE)
                    .value(42.0)
                    .build(),
            )
            .unwrap();
        nodes
            .add_node(
                VariableNode::builder(NodeId::string(2, "Mass/A/000"))
                    .data_type(data_types::INT32)
                    .value(0)
                    .build(),
            )
            .unwrap();
        Arc::new(nodes)
    }

    fn queued(id: u32, node: &str, interval: f64, mode: MonitoringMode) -> Arc<QueuedDataItem> {
        Arc::new(QueuedDataItem::new(
            MonitoredItemId(id),
            ReadValueId::value(NodeId::string(2, node)),
            interval,
            10,
            mode,
        ))
    }

    fn as_items(items: &[&Arc<QueuedDataItem>]) -> Vec<Arc<dyn DataItem>> {
        items.iter().map(|i| Arc::clone(*i) as Arc<dyn DataItem>).collect()
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_routes_by_classifier() {
        let controller = NamespaceController::builder(address_space()).build();
        let polled = queued(1, "Static/Double", 100.0, MonitoringMode::Reporting);
        let pushed = queued(2, "Mass/A/000", 0.0, MonitoringMode::Reporting);
        let missing = queued(3, "Nope", 100.0, MonitoringMode::Reporting);

        let handles = controller.on_data_items_created(&as_items(&[&polled, &pushed, &missing]));
        assert_eq!(handles.len(), 1);
        for handle in handles {
            handle.wait().await.unwrap();
        }

        assert_eq!(controller.sampled_count(), 1);
        assert_eq!(controller.subscribed_count(), 1);
        assert_eq!(controller.tick_manager().active_rates(), vec![100]);
        assert_eq!(polled.drain()[0].value, Some(Variant::Double(42.0)));
        assert_eq!(pushed.drain()[0].value, Some(Variant::Int32(0)));

        // Modify and delete of an unknown item are no-ops.
        controller.on_data_items_modified(&as_items(&[&missing]));
        controller.on_data_items_deleted(&as_items(&[&missing]));

        controller.shutdown().await;
        assert_eq!(controller.tick_manager().job_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_modify_moves_rate() {
        let controller = NamespaceController::builder(address_space())
            .classifier(Arc::new(AlwaysSample))
            .build();
        let item = queued(1, "Static/Double", 100.0, MonitoringMode::Reporting);
        for handle in controller.on_data_items_created(&as_items(&[&item])) {
            handle.wait().await.unwrap();
        }

        item.revise(250.0, 10);
        controller.on_data_items_modified(&as_items(&[&item]));
        assert_eq!(controller.tick_manager().active_rates(), vec![250]);
        assert_eq!(
            controller.sampled_item(MonitoredItemId(1)).unwrap().current_rate(),
            Some(250)
        );

        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitoring_mode_seeds_and_toggles() {
        let nodes = address_space();
        let controller = NamespaceController::builder(nodes.clone()).build();
        let item = queued(1, "Mass/A/000", 0.0, MonitoringMode::Disabled);
        controller.on_data_items_created(&as_items(&[&item]));

        let subscribed = controller.subscribed_item(MonitoredItemId(1)).unwrap();
        assert!(!subscribed.sampling_enabled());

        let node = nodes.get_variable(&NodeId::string(2, "Mass/A/000")).unwrap();
        item.drain();
        node.write(7).unwrap();
        assert!(item.is_empty());

        item.set_monitoring_mode(MonitoringMode::Reporting);
        controller.on_monitoring_mode_changed(&as_items(&[&item]));
        node.write(8).unwrap();
        assert_eq!(item.drain()[0].value, Some(Variant::Int32(8)));

        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_stops_delivery() {
        let controller = NamespaceController::builder(address_space()).build();
        let item = queued(1, "Static/Double", 100.0, MonitoringMode::Reporting);
        for handle in controller.on_data_items_created(&as_items(&[&item])) {
            handle.wait().await.unwrap();
        }

        controller.on_data_items_deleted(&as_items(&[&item]));
        controller.on_data_items_deleted(&as_items(&[&item]));
        assert_eq!(controller.sampled_count(), 0);
        assert_eq!(controller.tick_manager().job_count(), 0);

        let delivered = item.delivered_count();
        sleep_ms(1000).await;
        assert_eq!(item.delivered_count(), delivered);

        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_revision_hooks() {
        let controller = NamespaceController::builder(address_space())
            .revision(SamplingRevision::new().with_push_interval(0.0))
            .build();

        let mass = ReadValueId::value(NodeId::string(2, "Mass/A/000"));
        let revised = controller.on_create_data_item(&mass, 500.0, 20);
        assert_eq!(revised.sampling_interval, 0.0);
        assert_eq!(revised.queue_size, 20);

        let other = ReadValueId::value(NodeId::string(2, "Static/Double"));
        let revised = controller.on_modify_data_item(&other, 0.0, 20);
        assert_eq!(revised.sampling_interval, 100.0);
    }
}
