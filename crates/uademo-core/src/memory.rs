// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory variable nodes and the node manager that owns them.
//!
//! [`VariableNode::write_value`] is the only write path and always notifies
//! attribute observers, which is what makes push delivery safe for the
//! nodes that use it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use crate::error::{NodeError, NodeResult};
use crate::node::{AccessContext, AddressSpace, AttributeObserver, AttributeValue, ObserverId, UaNode};
use crate::range::NumericRange;
use crate::types::{
    data_types, AttributeId, DataValue, NodeId, QualifiedName, StatusCode, TimestampsToReturn,
    Variant,
};

/// Node class code for variables.
const NODE_CLASS_VARIABLE: i32 = 2;

/// CurrentRead | CurrentWrite.
const ACCESS_LEVEL_READ_WRITE: u32 = 0x03;

// =============================================================================
// ValueSource
// =============================================================================

/// Produces a fresh value each time the Value attribute is read.
pub trait ValueSource: Send + Sync {
    /// Produces the current value.
    fn produce(&self) -> NodeResult<Variant>;
}

impl<F> ValueSource for F
where
    F: Fn() -> NodeResult<Variant> + Send + Sync,
{
    fn produce(&self) -> NodeResult<Variant> {
        self()
    }
}

// =============================================================================
// VariableNode
// =============================================================================

/// A variable node holding a single value.
pub struct VariableNode {
    node_id: NodeId,
    browse_name: QualifiedName,
    display_name: String,
    description: Option<String>,
    data_type: NodeId,
    value_rank: i32,
    minimum_sampling_interval: f64,
    value: RwLock<DataValue>,
    source: Option<Arc<dyn ValueSource>>,
    observers: Mutex<Vec<(ObserverId, Arc<dyn AttributeObserver>)>>,
    next_observer: AtomicU64,
}

impl VariableNode {
    /// Starts building a node.
    pub fn builder(node_id: NodeId) -> VariableNodeBuilder {
        VariableNodeBuilder::new(node_id)
    }

    /// Returns the browse name.
    pub fn browse_name(&self) -> &QualifiedName {
        &self.browse_name
    }

    /// Returns the data type id.
    pub fn data_type(&self) -> &NodeId {
        &self.data_type
    }

    /// Returns the number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    /// Returns the current value, producing one from the dynamic source if set.
    pub fn value(&self) -> NodeResult<DataValue> {
        match &self.source {
            Some(source) => source.produce().map(DataValue::new_now),
            None => Ok(self.value.read().clone()),
        }
    }

    /// Replaces the value and notifies every observer.
    ///
    /// # Errors
    ///
    /// Returns `BadTypeMismatch` if the variant does not match the node's
    /// data type.
    pub fn write_value(&self, value: DataValue) -> Result<(), StatusCode> {
        if let Some(v) = &value.value {
            if !self.accepts(v) {
                return Err(StatusCode::BAD_TYPE_MISMATCH);
            }
        }

        *self.value.write() = value.clone();

        let observers: Vec<_> = self.observers.lock().iter().map(|(_, o)| o.clone()).collect();
        let changed = AttributeValue::Data(value);
        for observer in observers {
            observer.attribute_changed(&self.node_id, AttributeId::Value, &changed);
        }
        Ok(())
    }

    /// Writes a Good value stamped with the current time.
    pub fn write(&self, value: impl Into<Variant>) -> Result<(), StatusCode> {
        self.write_value(DataValue::new_now(value))
    }

    fn accepts(&self, value: &Variant) -> bool {
        if self.data_type == data_types::BASE_DATA_TYPE {
            return true;
        }
        let expected = match value {
            Variant::Empty => return true,
            Variant::Array(items) => return items.iter().all(|item| self.accepts(item)),
            Variant::Boolean(_) => data_types::BOOLEAN,
            Variant::Int32(_) => data_types::INT32,
            Variant::Int64(_) => data_types::INT64,
            Variant::UInt32(_) => data_types::UINT32,
            Variant::Float(_) => data_types::FLOAT,
            Variant::Double(_) => data_types::DOUBLE,
            Variant::String(_) => data_types::STRING,
            Variant::DateTime(_) => data_types::DATE_TIME,
        };
        expected == self.data_type
    }
}

impl UaNode for VariableNode {
    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn get_attribute(&self, _ctx: &AccessContext, attribute_id: AttributeId) -> Option<AttributeValue> {
        let raw = match attribute_id {
            AttributeId::NodeId => Variant::String(self.node_id.to_string()),
            AttributeId::NodeClass => Variant::Int32(NODE_CLASS_VARIABLE),
            AttributeId::BrowseName => Variant::String(self.browse_name.to_string()),
            AttributeId::DisplayName => Variant::String(self.display_name.clone()),
            AttributeId::Description => {
                Variant::String(self.description.clone().unwrap_or_default())
            }
            AttributeId::WriteMask | AttributeId::UserWriteMask => Variant::UInt32(0),
            AttributeId::Value => {
                let value = self.value().unwrap_or_else(|e| {
                    tracing::warn!(node_id = %self.node_id, error = %e, "Value source failed");
                    DataValue::from_status(StatusCode::BAD_INTERNAL_ERROR)
                });
                return Some(AttributeValue::Data(value));
            }
            AttributeId::DataType => Variant::String(self.data_type.to_string()),
            AttributeId::ValueRank => Variant::Int32(self.value_rank),
            AttributeId::AccessLevel | AttributeId::UserAccessLevel => {
                Variant::UInt32(ACCESS_LEVEL_READ_WRITE)
            }
            AttributeId::MinimumSamplingInterval => Variant::Double(self.minimum_sampling_interval),
            AttributeId::Historizing => Variant::Boolean(false),
            _ => return None,
        };
        Some(AttributeValue::Raw(raw))
    }

    fn read_attribute(
        &self,
        ctx: &AccessContext,
        attribute_id: AttributeId,
        timestamps: TimestampsToReturn,
        index_range: Option<&str>,
        data_encoding: Option<&QualifiedName>,
    ) -> NodeResult<DataValue> {
        if let Some(encoding) = data_encoding {
            if attribute_id != AttributeId::Value {
                return Ok(DataValue::from_status(StatusCode::BAD_DATA_ENCODING_INVALID));
            }
            if *encoding != QualifiedName::default_binary() {
                return Ok(DataValue::from_status(StatusCode::BAD_DATA_ENCODING_UNSUPPORTED));
            }
        }

        let mut value = if attribute_id == AttributeId::Value {
            self.value()?
        } else {
            match self.get_attribute(ctx, attribute_id) {
                Some(attr) => attr.into_data_value(),
                None => return Ok(DataValue::from_status(StatusCode::BAD_ATTRIBUTE_ID_INVALID)),
            }
        };

        if let Some(text) = index_range {
            let range = match text.parse::<NumericRange>() {
                Ok(range) => range,
                Err(e) => return Ok(DataValue::from_status(e.status_code())),
            };
            if let Some(v) = &value.value {
                match range.apply(v) {
                    Ok(sliced) => value.value = Some(sliced),
                    Err(status) => return Ok(DataValue::from_status(status)),
                }
            }
        }

        Ok(value.with_timestamps(timestamps))
    }

    fn add_attribute_observer(&self, observer: Arc<dyn AttributeObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, observer));
        id
    }

    fn remove_attribute_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }
}

impl std::fmt::Debug for VariableNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableNode")
            .field("node_id", &self.node_id)
            .field("data_type", &self.data_type)
            .field("dynamic", &self.source.is_some())
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Builder for [`VariableNode`].
pub struct VariableNodeBuilder {
    node_id: NodeId,
    browse_name: Option<QualifiedName>,
    display_name: Option<String>,
    description: Option<String>,
    data_type: NodeId,
    value_rank: i32,
    minimum_sampling_interval: f64,
    value: DataValue,
    source: Option<Arc<dyn ValueSource>>,
}

impl VariableNodeBuilder {
    fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            browse_name: None,
            display_name: None,
            description: None,
            data_type: data_types::BASE_DATA_TYPE,
            value_rank: -1,
            minimum_sampling_interval: 0.0,
            value: DataValue::from_status(StatusCode::BAD_WAITING_FOR_INITIAL_DATA),
            source: None,
        }
    }

    /// Sets the browse name (namespace taken from the node id).
    pub fn browse_name(mut self, name: impl Into<String>) -> Self {
        self.browse_name = Some(QualifiedName::new(self.node_id.namespace_index, name));
        self
    }

    /// Sets the display name.
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Sets the data type.
    pub fn data_type(mut self, data_type: NodeId) -> Self {
        self.data_type = data_type;
        self
    }

    /// Sets the value rank (-1 scalar, 1 one-dimensional array).
    pub fn value_rank(mut self, rank: i32) -> Self {
        self.value_rank = rank;
        self
    }

    /// Sets the minimum sampling interval in milliseconds.
    pub fn minimum_sampling_interval(mut self, millis: f64) -> Self {
        self.minimum_sampling_interval = millis;
        self
    }

    /// Sets the initial value.
    pub fn value(mut self, value: impl Into<Variant>) -> Self {
        self.value = DataValue::new_now(value);
        self
    }

    /// Makes the node dynamic.
    pub fn source(mut self, source: impl ValueSource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Builds the node.
    pub fn build(self) -> VariableNode {
        let browse_name = self.browse_name.unwrap_or_else(|| {
            let name = match self.node_id.as_string() {
                Some(s) => s.rsplit('/').next().unwrap_or(s).to_string(),
                None => self.node_id.to_string(),
            };
            QualifiedName::new(self.node_id.namespace_index, name)
        });
        let display_name = self.display_name.unwrap_or_else(|| browse_name.name.clone());

        VariableNode {
            node_id: self.node_id,
            browse_name,
            display_name,
            description: self.description,
            data_type: self.data_type,
            value_rank: self.value_rank,
            minimum_sampling_interval: self.minimum_sampling_interval,
            value: RwLock::new(self.value),
            source: self.source,
            observers: Mutex::new(Vec::new()),
            next_observer: AtomicU64::new(1),
        }
    }
}

// =============================================================================
// NodeManager
// =============================================================================

/// Concurrent in-memory store of variable nodes.
#[derive(Default)]
pub struct NodeManager {
    nodes: DashMap<NodeId, Arc<VariableNode>>,
}

impl NodeManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::DuplicateNode`] if the id is taken.
    pub fn add_node(&self, node: VariableNode) -> NodeResult<Arc<VariableNode>> {
        match self.nodes.entry(node.node_id.clone()) {
            Entry::Occupied(entry) => Err(NodeError::duplicate_node(entry.key())),
            Entry::Vacant(entry) => {
                let node = Arc::new(node);
                entry.insert(node.clone());
                tracing::trace!(node_id = %node.node_id, "Added node");
                Ok(node)
            }
        }
    }

    /// Removes a node.
    pub fn remove_node(&self, node_id: &NodeId) -> Option<Arc<VariableNode>> {
        self.nodes.remove(node_id).map(|(_, node)| node)
    }

    /// Gets a node with its concrete type.
    pub fn get_variable(&self, node_id: &NodeId) -> Option<Arc<VariableNode>> {
        self.nodes.get(node_id).map(|r| r.value().clone())
    }

    /// Returns all node ids.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|r| r.key().clone()).collect()
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl AddressSpace for NodeManager {
    fn get(&self, node_id: &NodeId) -> Option<Arc<dyn UaNode>> {
        self.get_variable(node_id).map(|n| n as Arc<dyn UaNode>)
    }
}

impl std::fmt::Debug for NodeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeManager")
            .field("node_count", &self.nodes.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn int_node(id: &str, value: i32) -> VariableNode {
        VariableNode::builder(NodeId::string(2, id))
            .data_type(data_types::INT32)
            .minimum_sampling_interval(100.0)
            .value(value)
            .build()
    }

    fn read(node: &VariableNode, attr: AttributeId, range: Option<&str>) -> DataValue {
        node.read_attribute(&AccessContext::Internal, attr, TimestampsToReturn::Both, range, None)
            .unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let node = VariableNode::builder(NodeId::string(2, "Mass/A/001")).build();
        assert_eq!(node.browse_name().name, "001");
        assert_eq!(node.data_type(), &data_types::BASE_DATA_TYPE);
        assert_eq!(
            node.value().unwrap().status,
            StatusCode::BAD_WAITING_FOR_INITIAL_DATA
        );
    }

    #[test]
    fn test_read_value_and_attributes() {
        let node = int_node("Static/Int32", 5);
        assert_eq!(read(&node, AttributeId::Value, None).value, Some(Variant::Int32(5)));
        assert_eq!(
            read(&node, AttributeId::MinimumSamplingInterval, None).value,
            Some(Variant::Double(100.0))
        );
        assert_eq!(
            read(&node, AttributeId::Executable, None).status,
            StatusCode::BAD_ATTRIBUTE_ID_INVALID
        );
    }

    #[test]
    fn test_read_index_range() {
        let node = VariableNode::builder(NodeId::string(2, "Array"))
            .data_type(data_types::INT32)
            .value_rank(1)
            .value(vec![10, 20, 30])
            .build();

        let sliced = read(&node, AttributeId::Value, Some("1:5"));
        assert_eq!(
            sliced.value,
            Some(Variant::Array(vec![Variant::Int32(20), Variant::Int32(30)]))
        );
        assert_eq!(
            read(&node, AttributeId::Value, Some("7")).status,
            StatusCode::BAD_INDEX_RANGE_NO_DATA
        );
        assert_eq!(
            read(&node, AttributeId::Value, Some("x")).status,
            StatusCode::BAD_INDEX_RANGE_INVALID
        );

        let scalar = int_node("Scalar", 1);
        assert_eq!(
            read(&scalar, AttributeId::Value, Some("0")).status,
            StatusCode::BAD_INDEX_RANGE_INVALID
        );
    }

    #[test]
    fn test_read_data_encoding() {
        let node = int_node("Enc", 1);
        let ctx = AccessContext::Internal;
        let ts = TimestampsToReturn::Both;

        let ok = node
            .read_attribute(&ctx, AttributeId::Value, ts, None, Some(&QualifiedName::default_binary()))
            .unwrap();
        assert!(ok.is_good());

        let xml = QualifiedName::new(0, "Default XML");
        let unsupported = node
            .read_attribute(&ctx, AttributeId::Value, ts, None, Some(&xml))
            .unwrap();
        assert_eq!(unsupported.status, StatusCode::BAD_DATA_ENCODING_UNSUPPORTED);

        let invalid = node
            .read_attribute(&ctx, AttributeId::DisplayName, ts, None, Some(&xml))
            .unwrap();
        assert_eq!(invalid.status, StatusCode::BAD_DATA_ENCODING_INVALID);
    }

    #[test]
    fn test_dynamic_source() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let node = VariableNode::builder(NodeId::string(2, "Dynamic/Counter"))
            .data_type(data_types::INT32)
            .source(move || {
                Ok::<_, NodeError>(Variant::Int32(counter.fetch_add(1, Ordering::SeqCst) as i32))
            })
            .build();

        assert_eq!(read(&node, AttributeId::Value, None).value, Some(Variant::Int32(0)));
        assert_eq!(read(&node, AttributeId::Value, None).value, Some(Variant::Int32(1)));

        let failing = VariableNode::builder(NodeId::string(2, "Dynamic/Broken"))
            .source(|| Err::<Variant, _>(NodeError::value_source("ns=2;s=Dynamic/Broken", "offline")))
            .build();
        assert!(failing
            .read_attribute(&AccessContext::Internal, AttributeId::Value, TimestampsToReturn::Both, None, None)
            .is_err());
        let attr = failing
            .get_attribute(&AccessContext::Internal, AttributeId::Value)
            .unwrap()
            .into_data_value();
        assert_eq!(attr.status, StatusCode::BAD_INTERNAL_ERROR);
    }

    #[test]
    fn test_write_notifies_observers() {
        let node = int_node("Mass/A/000", 0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = node.add_attribute_observer(Arc::new(
            move |_: &NodeId, attr: AttributeId, value: &AttributeValue| {
                sink.lock().push((attr, value.clone().into_data_value().value));
            },
        ));

        node.write(7).unwrap();
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(seen.lock()[0], (AttributeId::Value, Some(Variant::Int32(7))));

        assert!(node.remove_attribute_observer(id));
        assert!(!node.remove_attribute_observer(id));
        node.write(8).unwrap();
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_write_type_mismatch() {
        let node = int_node("Typed", 0);
        assert_eq!(node.write(1.5f64), Err(StatusCode::BAD_TYPE_MISMATCH));
        assert_eq!(node.value().unwrap().value, Some(Variant::Int32(0)));
    }

    #[test]
    fn test_node_manager() {
        let manager = NodeManager::new();
        manager.add_node(int_node("A", 1)).unwrap();
        assert!(matches!(
            manager.add_node(int_node("A", 2)),
            Err(NodeError::DuplicateNode { .. })
        ));
        assert_eq!(manager.len(), 1);

        let id = NodeId::string(2, "A");
        let node = manager.get(&id).unwrap();
        assert_eq!(node.node_id(), &id);
        assert!(manager.get(&NodeId::string(2, "B")).is_none());

        assert!(manager.remove_node(&id).is_some());
        assert!(manager.is_empty());
    }
}
