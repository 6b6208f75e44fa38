// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built nodes, monitored items and configuration documents.

use std::sync::Arc;

use uademo_core::types::data_types;
use uademo_core::{MonitoringMode, NodeId, NodeManager, NodeResult, ReadValueId, VariableNode, Variant};
use uademo_sampling::{MonitoredItemId, QueuedDataItem};

/// Namespace index every fixture node lives in.
pub const TEST_NS: u16 = 2;

/// Number of mass nodes in [`NodeFixtures::namespace`].
pub const FIXTURE_MASS_NODES: u32 = 10;

// =============================================================================
// Node Fixtures
// =============================================================================

/// Fixture providing a small demo-like namespace.
pub struct NodeFixtures;

impl NodeFixtures {
    /// A writable Int32 variable starting at 0.
    pub fn counter_id() -> NodeId {
        NodeId::string(TEST_NS, "Test/Counter")
    }

    /// A Double variable producing a fresh random value on every read.
    pub fn random_id() -> NodeId {
        NodeId::string(TEST_NS, "Test/Random")
    }

    /// An Int32 array variable holding `[10, 20, 30, 40, 50]`.
    pub fn array_id() -> NodeId {
        NodeId::string(TEST_NS, "Test/Array")
    }

    /// A numeric-id Int32 variable.
    pub fn numeric_id() -> NodeId {
        NodeId::numeric(TEST_NS, 5001)
    }

    /// The `index`-th mass node, `Mass/A/<index>`.
    pub fn mass_id(index: u32) -> NodeId {
        NodeId::string(TEST_NS, format!("Mass/A/{:03}", index))
    }

    /// A node id that resolves to nothing.
    pub fn missing_id() -> NodeId {
        NodeId::string(TEST_NS, "Test/DoesNotExist")
    }

    /// Builds the fixture namespace.
    pub fn namespace() -> Arc<NodeManager> {
        let nodes = Arc::new(NodeManager::new());

        let fixtures = [
            VariableNode::builder(Self::counter_id())
                .data_type(data_types::INT32)
                .value(0i32),
            VariableNode::builder(Self::random_id())
                .data_type(data_types::DOUBLE)
                .source(|| -> NodeResult<Variant> { Ok(Variant::Double(rand_like())) }),
            VariableNode::builder(Self::array_id())
                .data_type(data_types::INT32)
                .value_rank(1)
                .value(vec![10i32, 20, 30, 40, 50]),
            VariableNode::builder(Self::numeric_id())
                .data_type(data_types::INT32)
                .value(0i32),
        ];
        for builder in fixtures {
            nodes
                .add_node(builder.build())
                .expect("fixture node ids are unique");
        }

        for i in 0..FIXTURE_MASS_NODES {
            nodes
                .add_node(
                    VariableNode::builder(Self::mass_id(i))
                        .data_type(data_types::INT32)
                        .value(0i32)
                        .build(),
                )
                .expect("fixture node ids are unique");
        }

        nodes
    }
}

/// A cheap changing value that avoids pulling a RNG into the test crate.
fn rand_like() -> f64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static SEED: AtomicU64 = AtomicU64::new(1);
    let n = SEED.fetch_add(1, Ordering::Relaxed);
    (n.wrapping_mul(2_654_435_761) % 10_000) as f64 / 100.0
}

// =============================================================================
// Item Fixtures
// =============================================================================

/// Fixture providing monitored items.
pub struct ItemFixtures;

impl ItemFixtures {
    /// Queue size used by item fixtures.
    pub const QUEUE_SIZE: u32 = 100;

    /// A Value item in Reporting mode.
    pub fn value_item(id: u32, node_id: NodeId, sampling_interval: f64) -> Arc<QueuedDataItem> {
        Self::item(id, ReadValueId::value(node_id), sampling_interval, MonitoringMode::Reporting)
    }

    /// An item for an arbitrary read target and mode.
    pub fn item(
        id: u32,
        read_value_id: ReadValueId,
        sampling_interval: f64,
        mode: MonitoringMode,
    ) -> Arc<QueuedDataItem> {
        Arc::new(QueuedDataItem::new(
            MonitoredItemId(id),
            read_value_id,
            sampling_interval,
            Self::QUEUE_SIZE,
            mode,
        ))
    }
}

// =============================================================================
// Config Fixtures
// =============================================================================

/// Fixture providing configuration documents.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// A complete YAML document.
    pub fn yaml() -> &'static str {
        r#"
server:
  name: "yaml-demo"
  namespace_uri: "urn:uademo:test"
  namespace_index: 3
sampling:
  min_sampling_interval_ms: 50
  max_sampling_interval_ms: 60000
  max_queue_size: 500
  push_revised_interval_ms: 0
  push_delivery:
    mode: prefix
    prefix: "Mass"
demo:
  dynamic_nodes: true
  mass_folders: 2
  mass_nodes_per_folder: 50
  mass_update_interval_ms: 250
probes:
  - node_id: "ns=3;s=Dynamic/RandomInt32"
    sampling_interval_ms: 500
  - node_id: "ns=3;s=Mass/A/000"
    queue_size: 5
    monitoring_mode: sampling
logging:
  level: debug
  format: json
"#
    }

    /// A TOML document selecting numeric push delivery.
    pub fn toml() -> &'static str {
        r#"
[server]
name = "toml-demo"

[sampling]
min_sampling_interval_ms = 250.0

[sampling.push_delivery]
mode = "numeric_below"
threshold = 100

[demo]
mass_folders = 1
mass_nodes_per_folder = 10

[[probes]]
node_id = "ns=2;i=42"
attribute = "13"
"#
    }

    /// A JSON document disabling push delivery.
    pub fn json() -> &'static str {
        r#"{
  "server": { "name": "json-demo" },
  "sampling": { "push_delivery": { "mode": "none" } },
  "logging": { "level": "warn", "format": "compact" }
}"#
    }
}
