// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node abstractions the sampling engine reads from and observes.
//!
//! The engine consumes exactly two capabilities from an address space:
//!
//! ```text
//! ┌──────────────────┐   read_attribute(ctx, attr, ts, range, enc)   ┌──────────┐
//! │ Sampled item     │ ─────────────────────────────────────────────▶│          │
//! └──────────────────┘                                               │  UaNode  │
//! ┌──────────────────┐   add/remove_attribute_observer(observer)     │          │
//! │ Subscribed item  │ ─────────────────────────────────────────────▶│          │
//! └──────────────────┘                                               └──────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::NodeResult;
use crate::types::{AttributeId, DataValue, NodeId, QualifiedName, TimestampsToReturn, Variant};

// =============================================================================
// AccessContext
// =============================================================================

/// Who is performing a read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AccessContext {
    /// The server itself. Sampling always reads this way.
    #[default]
    Internal,

    /// A client session.
    Client {
        /// Session identifier.
        session_id: String,
    },
}

// =============================================================================
// AttributeValue
// =============================================================================

/// A raw attribute as stored on a node.
///
/// Most attributes are stored as bare variants; the Value attribute is a
/// full [`DataValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Already a value with status and timestamps.
    Data(DataValue),
    /// A bare variant.
    Raw(Variant),
}

impl AttributeValue {
    /// Coerces into a [`DataValue`], stamping bare variants with the current time.
    pub fn into_data_value(self) -> DataValue {
        match self {
            Self::Data(dv) => dv,
            Self::Raw(v) => DataValue::new_now(v),
        }
    }
}

impl From<DataValue> for AttributeValue {
    fn from(value: DataValue) -> Self {
        Self::Data(value)
    }
}

impl From<Variant> for AttributeValue {
    fn from(value: Variant) -> Self {
        Self::Raw(value)
    }
}

// =============================================================================
// Observers
// =============================================================================

/// Handle returned when an observer is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Receives attribute change notifications from a node.
///
/// Called synchronously on the writer's thread, so implementations should
/// return quickly.
pub trait AttributeObserver: Send + Sync {
    /// An attribute of `node_id` changed to `value`.
    fn attribute_changed(&self, node_id: &NodeId, attribute_id: AttributeId, value: &AttributeValue);
}

impl<F> AttributeObserver for F
where
    F: Fn(&NodeId, AttributeId, &AttributeValue) + Send + Sync,
{
    fn attribute_changed(&self, node_id: &NodeId, attribute_id: AttributeId, value: &AttributeValue) {
        self(node_id, attribute_id, value)
    }
}

// =============================================================================
// UaNode & AddressSpace
// =============================================================================

/// A node that can be read and observed.
pub trait UaNode: Send + Sync {
    /// The node's id.
    fn node_id(&self) -> &NodeId;

    /// Returns the raw stored attribute, or `None` if unsupported.
    fn get_attribute(&self, ctx: &AccessContext, attribute_id: AttributeId) -> Option<AttributeValue>;

    /// Reads an attribute the way a client read would.
    ///
    /// Bad outcomes (unsupported attribute, bad index range or encoding) are
    /// returned as bad-status values.
    ///
    /// # Errors
    ///
    /// Returns `Err` only for internal failures, such as a failing dynamic
    /// value source.
    fn read_attribute(
        &self,
        ctx: &AccessContext,
        attribute_id: AttributeId,
        timestamps: TimestampsToReturn,
        index_range: Option<&str>,
        data_encoding: Option<&QualifiedName>,
    ) -> NodeResult<DataValue>;

    /// Registers an attribute observer.
    fn add_attribute_observer(&self, observer: Arc<dyn AttributeObserver>) -> ObserverId;

    /// Removes an observer. Returns `false` if it was not registered.
    fn remove_attribute_observer(&self, id: ObserverId) -> bool;
}

/// Looks up nodes by id.
pub trait AddressSpace: Send + Sync {
    /// Returns the node, if present.
    fn get(&self, node_id: &NodeId) -> Option<Arc<dyn UaNode>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StatusCode;

    #[test]
    fn test_into_data_value() {
        let stored = DataValue::from_status(StatusCode::BAD_WAITING_FOR_INITIAL_DATA);
        assert_eq!(AttributeValue::from(stored.clone()).into_data_value(), stored);

        let raw = AttributeValue::from(Variant::Int32(9)).into_data_value();
        assert_eq!(raw.value, Some(Variant::Int32(9)));
        assert!(raw.is_good());
        assert!(raw.server_timestamp.is_some());
    }

    #[test]
    fn test_closure_observer() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let observer: Arc<dyn AttributeObserver> =
            Arc::new(move |_: &NodeId, attr: AttributeId, _: &AttributeValue| {
                if attr == AttributeId::Value {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            });

        let node = NodeId::string(2, "n");
        observer.attribute_changed(&node, AttributeId::Value, &Variant::Empty.into());
        observer.attribute_changed(&node, AttributeId::DisplayName, &Variant::Empty.into());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
