// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The demo address space and the tasks that animate it.
//!
//! ```text
//! ns=<idx>
//! ├── Dynamic/
//! │   ├── RandomInt32     fresh random value on every read
//! │   ├── RandomInt64
//! │   ├── RandomFloat
//! │   ├── RandomDouble
//! │   └── RandomBoolean
//! └── Mass/
//!     ├── A/000 .. A/999  Int32, written by the simulated writer
//!     ├── B/...
//!     └── ...
//! ```
//!
//! Dynamic nodes are classified as sampled by default: their value only
//! exists when read. Mass nodes only change when written, so they are the
//! natural candidates for push delivery.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace};

use uademo_config::DemoConfig;
use uademo_core::types::data_types;
use uademo_core::{NodeId, NodeManager, NodeResult, VariableNode, Variant};
use uademo_sampling::QueuedDataItem;

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownSignal;

/// Root of the random-value nodes.
pub const DYNAMIC_FOLDER: &str = "Dynamic";

/// Root of the mass-generated nodes.
pub const MASS_FOLDER: &str = "Mass";

/// Nodes written per simulated writer round.
pub const WRITER_BATCH_SIZE: usize = 100;

// =============================================================================
// DemoNamespace
// =============================================================================

/// The populated demo address space.
pub struct DemoNamespace {
    nodes: Arc<NodeManager>,
    namespace_index: u16,
    mass_nodes: Vec<NodeId>,
}

impl DemoNamespace {
    /// Builds the namespace described by `config` in `namespace_index`.
    ///
    /// # Errors
    ///
    /// Fails if two generated nodes collide.
    pub fn build(namespace_index: u16, config: &DemoConfig) -> BinResult<Self> {
        let nodes = Arc::new(NodeManager::new());

        if config.dynamic_nodes {
            add_dynamic_nodes(&nodes, namespace_index)?;
        }
        let mass_nodes = add_mass_nodes(
            &nodes,
            namespace_index,
            config.mass_folders,
            config.mass_nodes_per_folder,
        )?;

        info!(
            namespace_index,
            node_count = nodes.len(),
            mass_nodes = mass_nodes.len(),
            "Demo namespace built"
        );

        Ok(Self {
            nodes,
            namespace_index,
            mass_nodes,
        })
    }

    /// The node store.
    pub fn nodes(&self) -> &Arc<NodeManager> {
        &self.nodes
    }

    /// The namespace index the nodes live in.
    pub fn namespace_index(&self) -> u16 {
        self.namespace_index
    }

    /// Ids of the mass variables in creation order.
    pub fn mass_nodes(&self) -> &[NodeId] {
        &self.mass_nodes
    }

    /// Creates the simulated writer over the mass nodes.
    pub fn writer(&self, interval: Duration) -> MassWriter {
        MassWriter {
            nodes: Arc::clone(&self.nodes),
            targets: self.mass_nodes.clone(),
            interval,
            batch_size: WRITER_BATCH_SIZE,
            cursor: 0,
            counter: 0,
        }
    }
}

fn add_dynamic_nodes(nodes: &NodeManager, namespace_index: u16) -> BinResult<()> {
    let folder = NodeId::string(namespace_index, DYNAMIC_FOLDER);

    let random_nodes = [
        VariableNode::builder(folder.resolve("RandomInt32"))
            .data_type(data_types::INT32)
            .source(|| -> NodeResult<Variant> { Ok(Variant::Int32(rand::random())) }),
        VariableNode::builder(folder.resolve("RandomInt64"))
            .data_type(data_types::INT64)
            .source(|| -> NodeResult<Variant> { Ok(Variant::Int64(rand::random())) }),
        VariableNode::builder(folder.resolve("RandomFloat"))
            .data_type(data_types::FLOAT)
            .source(|| -> NodeResult<Variant> { Ok(Variant::Float(rand::random())) }),
        VariableNode::builder(folder.resolve("RandomDouble"))
            .data_type(data_types::DOUBLE)
            .source(|| -> NodeResult<Variant> { Ok(Variant::Double(rand::random())) }),
        VariableNode::builder(folder.resolve("RandomBoolean"))
            .data_type(data_types::BOOLEAN)
            .source(|| -> NodeResult<Variant> { Ok(Variant::Boolean(rand::random())) }),
    ];

    for builder in random_nodes {
        nodes
            .add_node(builder.build())
            .map_err(|e| BinError::from(e).with_context("adding dynamic nodes"))?;
    }
    Ok(())
}

fn add_mass_nodes(
    nodes: &NodeManager,
    namespace_index: u16,
    folders: u32,
    per_folder: u32,
) -> BinResult<Vec<NodeId>> {
    let root = NodeId::string(namespace_index, MASS_FOLDER);
    let width = index_width(per_folder);
    let mut ids = Vec::with_capacity(folders as usize * per_folder as usize);

    for letter in folder_names(folders) {
        let folder = root.resolve(&letter);
        for j in 0..per_folder {
            let node_id = folder.resolve(&format!("{:0width$}", j, width = width));
            let node = VariableNode::builder(node_id.clone())
                .data_type(data_types::INT32)
                .value(0i32)
                .build();
            nodes
                .add_node(node)
                .map_err(|e| BinError::from(e).with_context("adding mass nodes"))?;
            ids.push(node_id);
        }
    }

    debug!(folders, per_folder, "Mass nodes added");
    Ok(ids)
}

/// Folder names `A`, `B`, ... for the first `count` letters.
pub fn folder_names(count: u32) -> impl Iterator<Item = String> {
    (b'A'..=b'Z')
        .take(count as usize)
        .map(|c| char::from(c).to_string())
}

/// Zero-padded width for mass indices: at least three digits.
pub fn index_width(per_folder: u32) -> usize {
    let last = per_folder.saturating_sub(1);
    last.to_string().len().max(3)
}

// =============================================================================
// MassWriter
// =============================================================================

/// Writes increasing values into a rolling window of mass nodes.
pub struct MassWriter {
    nodes: Arc<NodeManager>,
    targets: Vec<NodeId>,
    interval: Duration,
    batch_size: usize,
    cursor: usize,
    counter: i32,
}

impl MassWriter {
    /// Overrides the number of nodes written per round.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Writes the next window of nodes. Returns how many were written.
    pub fn write_round(&mut self) -> usize {
        if self.targets.is_empty() {
            return 0;
        }

        self.counter = self.counter.wrapping_add(1);
        let mut written = 0;

        for _ in 0..self.batch_size.min(self.targets.len()) {
            let node_id = &self.targets[self.cursor];
            self.cursor = (self.cursor + 1) % self.targets.len();

            let Some(node) = self.nodes.get_variable(node_id) else {
                continue;
            };
            match node.write(self.counter) {
                Ok(()) => written += 1,
                Err(status) => trace!(node_id = %node_id, status = %status, "Mass write rejected"),
            }
        }
        written
    }

    /// Writes a round every interval until `shutdown` resolves.
    pub async fn run(mut self, mut shutdown: ShutdownSignal) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            interval_ms = self.interval.as_millis() as u64,
            targets = self.targets.len(),
            batch_size = self.batch_size,
            "Mass writer started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let written = self.write_round();
                    trace!(written, counter = self.counter, "Mass writer round");
                }
            }
        }

        debug!("Mass writer stopped");
    }
}

// =============================================================================
// Probe draining
// =============================================================================

/// Logs every value delivered to `item` until `shutdown` resolves.
pub async fn drain_probe(item: Arc<QueuedDataItem>, mut shutdown: ShutdownSignal) {
    let item_id = uademo_sampling::DataItem::id(item.as_ref());
    let node_id = uademo_sampling::DataItem::read_value_id(item.as_ref())
        .node_id
        .clone();

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = item.changed() => {
                for value in item.drain() {
                    info!(
                        item_id = %item_id,
                        node_id = %node_id,
                        status = %value.status,
                        value = %value,
                        "Probe value"
                    );
                }
            }
        }
    }

    debug!(
        item_id = %item_id,
        delivered = item.delivered_count(),
        overflows = item.overflow_count(),
        "Probe drain stopped"
    );
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uademo_core::node::{AccessContext, AddressSpace, UaNode};
    use uademo_core::{AttributeId, TimestampsToReturn};

    fn small_config() -> DemoConfig {
        DemoConfig {
            dynamic_nodes: true,
            mass_folders: 2,
            mass_nodes_per_folder: 5,
            mass_update_interval_ms: 100,
        }
    }

    #[test]
    fn test_index_width() {
        assert_eq!(index_width(0), 3);
        assert_eq!(index_width(10), 3);
        assert_eq!(index_width(1000), 3);
        assert_eq!(index_width(1001), 4);
        assert_eq!(index_width(100_000), 5);
    }

    #[test]
    fn test_folder_names() {
        let names: Vec<_> = folder_names(3).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(folder_names(40).count(), 26);
    }

    #[test]
    fn test_build_namespace() {
        let demo = DemoNamespace::build(2, &small_config()).unwrap();

        assert_eq!(demo.namespace_index(), 2);
        assert_eq!(demo.mass_nodes().len(), 10);
        assert_eq!(demo.nodes().len(), 15);
        assert_eq!(demo.mass_nodes()[0], NodeId::string(2, "Mass/A/000"));
        assert_eq!(demo.mass_nodes()[9], NodeId::string(2, "Mass/B/004"));
        assert!(demo
            .nodes()
            .get(&NodeId::string(2, "Dynamic/RandomDouble"))
            .is_some());
    }

    #[test]
    fn test_dynamic_nodes_disabled() {
        let config = DemoConfig {
            dynamic_nodes: false,
            ..small_config()
        };
        let demo = DemoNamespace::build(3, &config).unwrap();
        assert_eq!(demo.nodes().len(), 10);
        assert!(demo
            .nodes()
            .get(&NodeId::string(3, "Dynamic/RandomInt32"))
            .is_none());
    }

    #[test]
    fn test_dynamic_node_reads_typed_values() {
        let demo = DemoNamespace::build(2, &small_config()).unwrap();
        let node = demo
            .nodes()
            .get(&NodeId::string(2, "Dynamic/RandomBoolean"))
            .unwrap();

        let value = node
            .read_attribute(
                &AccessContext::Internal,
                AttributeId::Value,
                TimestampsToReturn::Both,
                None,
                None,
            )
            .unwrap();
        assert!(value.is_good());
        assert!(matches!(value.value, Some(Variant::Boolean(_))));
    }

    #[test]
    fn test_writer_rolls_over_targets() {
        let demo = DemoNamespace::build(2, &small_config()).unwrap();
        let mut writer = demo.writer(Duration::from_millis(10)).with_batch_size(4);

        assert_eq!(writer.write_round(), 4);
        assert_eq!(writer.write_round(), 4);
        assert_eq!(writer.write_round(), 4);

        // Third round wrapped around to the first nodes.
        let first = demo.nodes().get_variable(&demo.mass_nodes()[0]).unwrap();
        assert_eq!(first.value().unwrap().value, Some(Variant::Int32(3)));
        let last = demo.nodes().get_variable(&demo.mass_nodes()[9]).unwrap();
        assert_eq!(last.value().unwrap().value, Some(Variant::Int32(3)));
        let middle = demo.nodes().get_variable(&demo.mass_nodes()[5]).unwrap();
        assert_eq!(middle.value().unwrap().value, Some(Variant::Int32(2)));
    }

    #[test]
    fn test_writer_without_targets() {
        let config = DemoConfig {
            mass_folders: 0,
            ..small_config()
        };
        let demo = DemoNamespace::build(2, &config).unwrap();
        assert_eq!(demo.writer(Duration::from_millis(10)).write_round(), 0);
    }
}
