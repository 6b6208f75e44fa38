// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uademo-core
//!
//! Shared types and node abstractions for the uademo OPC UA demo server.
//!
//! This crate provides the collaborator surface the sampling engine runs
//! against:
//!
//! - **Types**: `NodeId`, `AttributeId`, `StatusCode`, `Variant`, `DataValue`
//! - **Range**: Index ranges for partial array reads
//! - **Node**: The `UaNode` / `AddressSpace` traits and attribute observers
//! - **Memory**: An in-memory `NodeManager` of `VariableNode`s
//! - **Lifecycle**: NEW / RUNNING / STOPPED state shared by startable components
//! - **Error**: Unified error hierarchy
//!
//! ## Example
//!
//! ```rust
//! use uademo_core::memory::{NodeManager, VariableNode};
//! use uademo_core::node::AddressSpace;
//! use uademo_core::types::{data_types, NodeId};
//!
//! let nodes = NodeManager::new();
//! let id = NodeId::string(2, "Mass/A/000");
//! nodes
//!     .add_node(
//!         VariableNode::builder(id.clone())
//!             .data_type(data_types::INT32)
//!             .value(0)
//!             .build(),
//!     )
//!     .unwrap();
//!
//! assert!(nodes.get(&id).is_some());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod error;
pub mod lifecycle;
pub mod range;
pub mod types;

// =============================================================================
// Node Modules
// =============================================================================

pub mod memory;
pub mod node;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use error::*;
pub use types::*;

pub use lifecycle::{Lifecycle, LifecycleState};
pub use memory::{NodeManager, ValueSource, VariableNode, VariableNodeBuilder};
pub use node::{
    AccessContext, AddressSpace, AttributeObserver, AttributeValue, ObserverId, UaNode,
};
pub use range::{NumericRange, RangeDimension};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
