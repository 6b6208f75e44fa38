// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Unified error hierarchy for the uademo core.
//!
//! # Error Hierarchy
//!
//! ```text
//! UaError (root)
//! ├── LifecycleError - Illegal start/stop transitions
//! └── NodeError      - Node ids, attributes, index ranges, value sources
//! ```
//!
//! Read failures that a client should see are *not* errors here: they travel
//! as a [`StatusCode`] inside a [`DataValue`](crate::types::DataValue). A
//! [`NodeError`] is reserved for conditions the caller must handle itself.
//!
//! # Examples
//!
//! ```
//! use uademo_core::error::{NodeError, UaError};
//! use uademo_core::types::StatusCode;
//!
//! let error = NodeError::unknown_attribute(99);
//! assert_eq!(error.status_code(), StatusCode::BAD_ATTRIBUTE_ID_INVALID);
//!
//! let root: UaError = error.into();
//! assert_eq!(root.error_type(), "node");
//! ```

use thiserror::Error;

use crate::lifecycle::LifecycleState;
use crate::types::StatusCode;

// =============================================================================
// UaError - Root Error Type
// =============================================================================

/// The root error type for the uademo core.
#[derive(Debug, Error)]
pub enum UaError {
    /// Lifecycle contract violation.
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Node or attribute error.
    #[error("Node error: {0}")]
    Node(#[from] NodeError),
}

impl UaError {
    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            UaError::Lifecycle(_) => false,
            UaError::Node(e) => e.is_retryable(),
        }
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            UaError::Lifecycle(_) => "lifecycle",
            UaError::Node(_) => "node",
        }
    }
}

// =============================================================================
// LifecycleError
// =============================================================================

/// Illegal lifecycle transitions.
///
/// These indicate a caller broke the start/stop contract. They are never
/// retried and are reported loudly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The requested transition is not legal from the current state.
    #[error("cannot call {operation} when state={state}")]
    IllegalState {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the component was in.
        state: LifecycleState,
    },
}

impl LifecycleError {
    /// Creates an illegal state error.
    pub fn illegal_state(operation: &'static str, state: LifecycleState) -> Self {
        Self::IllegalState { operation, state }
    }
}

// =============================================================================
// NodeError
// =============================================================================

/// Node and attribute related errors.
#[derive(Debug, Clone, Error)]
pub enum NodeError {
    /// A node id string could not be parsed.
    #[error("Invalid node id '{input}': {reason}")]
    InvalidNodeId {
        /// The offending input.
        input: String,
        /// Why parsing failed.
        reason: String,
    },

    /// The numeric attribute id is not a known attribute.
    #[error("Unknown attribute id: {id}")]
    UnknownAttribute {
        /// Raw attribute id.
        id: u32,
    },

    /// The index range text is malformed.
    #[error("Invalid index range '{range}': {reason}")]
    InvalidIndexRange {
        /// The offending range text.
        range: String,
        /// Why parsing failed.
        reason: String,
    },

    /// A node with the same id is already registered.
    #[error("Duplicate node: {node_id}")]
    DuplicateNode {
        /// The duplicated node id.
        node_id: String,
    },

    /// A dynamic value source failed to produce a value.
    #[error("Value source for '{node_id}' failed: {message}")]
    ValueSource {
        /// Node whose source failed.
        node_id: String,
        /// Failure description.
        message: String,
    },
}

impl NodeError {
    /// Creates an invalid node id error.
    pub fn invalid_node_id(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNodeId {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unknown attribute error.
    pub fn unknown_attribute(id: u32) -> Self {
        Self::UnknownAttribute { id }
    }

    /// Creates an invalid index range error.
    pub fn invalid_index_range(range: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIndexRange {
            range: range.into(),
            reason: reason.into(),
        }
    }

    /// Creates a duplicate node error.
    pub fn duplicate_node(node_id: impl ToString) -> Self {
        Self::DuplicateNode {
            node_id: node_id.to_string(),
        }
    }

    /// Creates a value source failure.
    pub fn value_source(node_id: impl ToString, message: impl Into<String>) -> Self {
        Self::ValueSource {
            node_id: node_id.to_string(),
            message: message.into(),
        }
    }

    /// Returns `true` if this error may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NodeError::ValueSource { .. })
    }

    /// Maps this error onto the status code a client would observe.
    pub fn status_code(&self) -> StatusCode {
        match self {
            NodeError::InvalidNodeId { .. } => StatusCode::BAD_NODE_ID_UNKNOWN,
            NodeError::UnknownAttribute { .. } => StatusCode::BAD_ATTRIBUTE_ID_INVALID,
            NodeError::InvalidIndexRange { .. } => StatusCode::BAD_INDEX_RANGE_INVALID,
            NodeError::DuplicateNode { .. } | NodeError::ValueSource { .. } => {
                StatusCode::BAD_INTERNAL_ERROR
            }
        }
    }
}

/// Result alias for node operations.
pub type NodeResult<T> = Result<T, NodeError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_error_display() {
        let err = LifecycleError::illegal_state("startup", LifecycleState::Running);
        assert_eq!(err.to_string(), "cannot call startup when state=RUNNING");
        assert_eq!(
            LifecycleError::illegal_state("startup", LifecycleState::Stopped).to_string(),
            "cannot call startup when state=STOPPED"
        );
    }

    #[test]
    fn test_node_error_status_mapping() {
        assert_eq!(
            NodeError::invalid_node_id("x", "bad").status_code(),
            StatusCode::BAD_NODE_ID_UNKNOWN
        );
        assert_eq!(
            NodeError::invalid_index_range("a:b", "bad").status_code(),
            StatusCode::BAD_INDEX_RANGE_INVALID
        );
        assert_eq!(
            NodeError::value_source("ns=2;s=X", "boom").status_code(),
            StatusCode::BAD_INTERNAL_ERROR
        );
    }

    #[test]
    fn test_retryable() {
        assert!(NodeError::value_source("n", "flaky").is_retryable());
        assert!(!NodeError::unknown_attribute(0).is_retryable());

        let root: UaError = LifecycleError::illegal_state("startup", LifecycleState::Stopped).into();
        assert!(!root.is_retryable());
        assert_eq!(root.error_type(), "lifecycle");
    }
}
