// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Read operations that back a sampled item.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use uademo_core::node::{AccessContext, UaNode};
use uademo_core::types::{AttributeId, DataValue, ReadValueId, StatusCode, TimestampsToReturn};

use crate::error::{SamplingError, SamplingResult};

/// Samples the current value of one attribute.
#[async_trait]
pub trait Sampler: Send + Sync {
    /// Samples the value as of `now`.
    async fn sample_current_value(&self, now: DateTime<Utc>) -> SamplingResult<DataValue>;

    /// Samples the value delivered at startup. Defaults to the current value.
    async fn sample_initial_value(&self, now: DateTime<Utc>) -> SamplingResult<DataValue> {
        self.sample_current_value(now).await
    }
}

/// Reads a node attribute the way a client read would, with both timestamps.
pub struct NodeSampler {
    node: Arc<dyn UaNode>,
    read_value_id: ReadValueId,
}

impl NodeSampler {
    /// Creates a sampler for `read_value_id` on `node`.
    pub fn new(node: Arc<dyn UaNode>, read_value_id: ReadValueId) -> Self {
        Self {
            node,
            read_value_id,
        }
    }

    /// Performs the read synchronously.
    pub fn read(&self) -> SamplingResult<DataValue> {
        let Ok(attribute) = AttributeId::try_from(self.read_value_id.attribute_id) else {
            return Ok(DataValue::from_status(StatusCode::BAD_ATTRIBUTE_ID_INVALID));
        };

        self.node
            .read_attribute(
                &AccessContext::Internal,
                attribute,
                TimestampsToReturn::Both,
                self.read_value_id.index_range.as_deref(),
                self.read_value_id.data_encoding.as_ref(),
            )
            .map_err(|e| SamplingError::read(self.node.node_id(), e))
    }
}

#[async_trait]
impl Sampler for NodeSampler {
    async fn sample_current_value(&self, _now: DateTime<Utc>) -> SamplingResult<DataValue> {
        self.read()
    }
}

impl std::fmt::Debug for NodeSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSampler")
            .field("node_id", self.node.node_id())
            .field("attribute_id", &self.read_value_id.attribute_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uademo_core::error::NodeError;
    use uademo_core::memory::VariableNode;
    use uademo_core::types::{data_types, NodeId, Variant};

    fn node(value: Vec<i32>) -> Arc<dyn UaNode> {
        Arc::new(
            VariableNode::builder(NodeId::string(2, "Array"))
                .data_type(data_types::INT32)
                .value(value)
                .build(),
        )
    }

    #[tokio::test]
    async fn test_reads_value_with_range() {
        let rv = ReadValueId::value(NodeId::string(2, "Array")).with_index_range("1");
        let sampler = NodeSampler::new(node(vec![4, 5, 6]), rv);
        let dv = sampler.sample_current_value(Utc::now()).await.unwrap();
        assert_eq!(dv.value, Some(Variant::Array(vec![Variant::Int32(5)])));
        assert!(dv.source_timestamp.is_some());
        assert!(dv.server_timestamp.is_some());
    }

    #[tokio::test]
    async fn test_unknown_attribute_is_bad_status() {
        let rv = ReadValueId::new(NodeId::string(2, "Array"), 77);
        let sampler = NodeSampler::new(node(vec![]), rv);
        let dv = sampler.sample_initial_value(Utc::now()).await.unwrap();
        assert_eq!(dv.status, StatusCode::BAD_ATTRIBUTE_ID_INVALID);
    }

    #[tokio::test]
    async fn test_source_failure_is_error() {
        let broken: Arc<dyn UaNode> = Arc::new(
            VariableNode::builder(NodeId::string(2, "Broken"))
                .source(|| Err::<Variant, _>(NodeError::value_source("ns=2;s=Broken", "down")))
                .build(),
        );
        let sampler = NodeSampler::new(broken, ReadValueId::value(NodeId::string(2, "Broken")));
        let err = sampler.sample_current_value(Utc::now()).await.unwrap_err();
        assert!(matches!(err, SamplingError::Read { .. }));
    }
}
