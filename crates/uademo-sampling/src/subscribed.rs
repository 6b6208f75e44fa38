// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Push delivery: a monitored item fed by attribute change notifications.
//!
//! No tick is involved. The item reads its attribute once at startup and then
//! forwards every change the node reports for that attribute. This only
//! delivers correct values for nodes whose every write goes through a path
//! that notifies observers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use uademo_core::lifecycle::{Lifecycle, LifecycleState};
use uademo_core::node::{AccessContext, AttributeObserver, AttributeValue, ObserverId, UaNode};
use uademo_core::types::{AttributeId, DataValue, NodeId, StatusCode};

use crate::error::{SamplingError, SamplingResult};
use crate::item::DataItem;

/// A monitored item delivered by attribute change notifications.
pub struct SubscribedItem {
    item: Arc<dyn DataItem>,
    node: Arc<dyn UaNode>,
    target: AttributeId,
    sampling_enabled: AtomicBool,
    lifecycle: Lifecycle,
    observer: Mutex<Option<ObserverId>>,
}

impl SubscribedItem {
    /// Creates an item in the `NEW` state with sampling enabled.
    ///
    /// # Errors
    ///
    /// Returns [`SamplingError::UnknownAttribute`] if the item's attribute id
    /// does not name a known attribute.
    pub fn new(item: Arc<dyn DataItem>, node: Arc<dyn UaNode>) -> SamplingResult<Arc<Self>> {
        let read_value_id = item.read_value_id();
        let target = AttributeId::try_from(read_value_id.attribute_id).map_err(|_| {
            SamplingError::unknown_attribute(&read_value_id.node_id, read_value_id.attribute_id)
        })?;

        Ok(Arc::new(Self {
            item,
            node,
            target,
            sampling_enabled: AtomicBool::new(true),
            lifecycle: Lifecycle::new(),
            observer: Mutex::new(None),
        }))
    }

    /// The monitored item being served.
    pub fn item(&self) -> &Arc<dyn DataItem> {
        &self.item
    }

    /// The attribute being forwarded.
    pub fn target_attribute(&self) -> AttributeId {
        self.target
    }

    /// Returns `true` if changes are forwarded.
    pub fn sampling_enabled(&self) -> bool {
        self.sampling_enabled.load(Ordering::SeqCst)
    }

    /// Enables or suppresses forwarding without removing the observer.
    pub fn set_sampling_enabled(&self, enabled: bool) {
        self.sampling_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Returns `true` while an observer is registered on the node.
    pub fn is_observing(&self) -> bool {
        self.observer.lock().is_some()
    }

    /// Delivers the current value and starts observing the node.
    ///
    /// # Errors
    ///
    /// Fails with [`SamplingError::Lifecycle`] unless the item is `NEW`.
    pub fn startup(self: &Arc<Self>) -> SamplingResult<()> {
        self.lifecycle.start()?;

        let current = self
            .node
            .get_attribute(&AccessContext::Internal, self.target)
            .map(AttributeValue::into_data_value)
            .unwrap_or_else(|| DataValue::from_status(StatusCode::BAD_ATTRIBUTE_ID_INVALID));

        let observer: Arc<dyn AttributeObserver> = Arc::new(ChangeForwarder {
            item: Arc::downgrade(self),
        });

        self.lifecycle.with_running(|| {
            self.item.set_value(current);
            let id = self.node.add_attribute_observer(observer);
            *self.observer.lock() = Some(id);
        });

        debug!(
            item_id = %self.item.id(),
            node_id = %self.node.node_id(),
            attribute = %self.target,
            "Subscribed item observing node"
        );
        Ok(())
    }

    fn on_change(&self, attribute_id: AttributeId, value: &AttributeValue) {
        if attribute_id != self.target || !self.sampling_enabled() {
            return;
        }
        let value = value.clone().into_data_value();
        self.lifecycle.with_running(|| self.item.set_value(value));
    }

    /// Stops forwarding and removes the observer. Never fails, even before startup.
    pub fn shutdown(&self) {
        let previous = self.lifecycle.stop_quietly();
        if let Some(id) = self.observer.lock().take() {
            self.node.remove_attribute_observer(id);
        }
        if previous.is_running() {
            debug!(item_id = %self.item.id(), "Subscribed item stopped");
        }
    }
}

impl std::fmt::Debug for SubscribedItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscribedItem")
            .field("item_id", &self.item.id())
            .field("target", &self.target)
            .field("state", &self.state())
            .field("sampling_enabled", &self.sampling_enabled())
            .finish()
    }
}

struct ChangeForwarder {
    item: Weak<SubscribedItem>,
}

impl AttributeObserver for ChangeForwarder {
    fn attribute_changed(&self, _node_id: &NodeId, attribute_id: AttributeId, value: &AttributeValue) {
        if let Some(item) = self.item.upgrade() {
            item.on_change(attribute_id, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uademo_core::error::LifecycleError;
    use uademo_core::memory::VariableNode;
    use uademo_core::types::{data_types, MonitoringMode, ReadValueId, Variant};

    use crate::item::{MonitoredItemId, QueuedDataItem};

    fn mass_node() -> Arc<VariableNode> {
        Arc::new(
            VariableNode::builder(NodeId::string(2, "Mass/A/000"))
                .data_type(data_types::INT32)
                .value(0)
                .build(),
        )
    }

    fn queued(attribute_id: u32) -> Arc<QueuedDataItem> {
        Arc::new(QueuedDataItem::new(
            MonitoredItemId(9),
            ReadValueId::new(NodeId::string(2, "Mass/A/000"), attribute_id),
            0.0,
            10,
            MonitoringMode::Reporting,
        ))
    }

    #[test]
    fn test_startup_delivers_current_and_forwards_changes() {
        let node = mass_node();
        let item = queued(AttributeId::Value.code());
        let subscribed = SubscribedItem::new(item.clone(), node.clone()).unwrap();

        subscribed.startup().unwrap();
        assert_eq!(item.drain()[0].value, Some(Variant::Int32(0)));
        assert_eq!(node.observer_count(), 1);

        node.write(5).unwrap();
        node.write(6).unwrap();
        let values: Vec<_> = item.drain().into_iter().map(|dv| dv.value).collect();
        assert_eq!(values, vec![Some(Variant::Int32(5)), Some(Variant::Int32(6))]);
    }

    #[test]
    fn test_raw_attribute_is_coerced() {
        let node = mass_node();
        let item = queued(AttributeId::DisplayName.code());
        let subscribed = SubscribedItem::new(item.clone(), node.clone()).unwrap();
        subscribed.startup().unwrap();

        let initial = item.drain().remove(0);
        assert_eq!(initial.value, Some(Variant::String("000".into())));
        assert!(initial.source_timestamp.is_some());

        // Value changes are not the target attribute.
        node.write(1).unwrap();
        assert!(item.is_empty());

        subscribed.on_change(AttributeId::DisplayName, &Variant::from("renamed").into());
        assert_eq!(
            item.drain()[0].value,
            Some(Variant::String("renamed".into()))
        );
    }

    #[test]
    fn test_unknown_attribute_fails_construction() {
        let err = SubscribedItem::new(queued(0), mass_node()).unwrap_err();
        assert!(matches!(err, SamplingError::UnknownAttribute { attribute_id: 0, .. }));
    }

    #[test]
    fn test_sampling_disabled_suppresses() {
        let node = mass_node();
        let item = queued(AttributeId::Value.code());
        let subscribed = SubscribedItem::new(item.clone(), node.clone()).unwrap();
        subscribed.startup().unwrap();
        item.drain();

        subscribed.set_sampling_enabled(false);
        node.write(1).unwrap();
        assert!(item.is_empty());
        assert!(subscribed.is_observing());

        subscribed.set_sampling_enabled(true);
        node.write(2).unwrap();
        assert_eq!(item.len(), 1);
    }

    #[test]
    fn test_shutdown_idempotent_and_removes_observer() {
        let node = mass_node();
        let item = queued(AttributeId::Value.code());

        let never_started = SubscribedItem::new(item.clone(), node.clone()).unwrap();
        never_started.shutdown();
        never_started.shutdown();

        let subscribed = SubscribedItem::new(item.clone(), node.clone()).unwrap();
        subscribed.startup().unwrap();
        assert!(matches!(
            subscribed.startup(),
            Err(SamplingError::Lifecycle(LifecycleError::IllegalState { .. }))
        ));

        subscribed.shutdown();
        subscribed.shutdown();
        assert_eq!(node.observer_count(), 0);
        assert!(!subscribed.is_observing());

        item.drain();
        node.write(3).unwrap();
        assert!(item.is_empty());
    }
}
