// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Sampling engine error types.
//!
//! # Error Categories
//!
//! ```text
//! SamplingError
//! ├── InvalidRate       - Zero, negative or non-finite tick rate
//! ├── Lifecycle         - Double start and similar contract violations
//! ├── Read              - A sampler failed to read its node
//! ├── Callback          - A tick callback reported a failure
//! ├── UnknownAttribute  - The item targets an attribute id that does not exist
//! ├── Cancelled         - The sampling scope was shut down
//! └── Join              - A sampling task panicked
//! ```
//!
//! Only `Read` is transient. Everything else points at a caller or
//! configuration mistake and is surfaced rather than retried.

use thiserror::Error;

use uademo_core::error::{LifecycleError, NodeError};

/// Errors raised by the sampling engine.
#[derive(Debug, Error)]
pub enum SamplingError {
    /// A tick rate that is not a positive number of milliseconds.
    #[error("invalid tick rate {rate}ms: must be a positive number of milliseconds")]
    InvalidRate {
        /// The rejected rate.
        rate: f64,
    },

    /// Lifecycle contract violation.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Reading the underlying node failed.
    #[error("read of {node_id} failed: {source}")]
    Read {
        /// Node being read.
        node_id: String,
        /// Underlying failure.
        #[source]
        source: NodeError,
    },

    /// A tick callback reported a failure.
    #[error("tick callback failed: {0}")]
    Callback(String),

    /// The target attribute id is not a known attribute.
    #[error("unknown attribute id {attribute_id} on {node_id}")]
    UnknownAttribute {
        /// Target node.
        node_id: String,
        /// Raw attribute code.
        attribute_id: u32,
    },

    /// The sampling scope has been shut down.
    #[error("sampling scope cancelled")]
    Cancelled,

    /// A sampling task panicked or was aborted.
    #[error("sampling task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SamplingError {
    /// Creates an invalid rate error.
    pub fn invalid_rate(rate: impl Into<f64>) -> Self {
        Self::InvalidRate { rate: rate.into() }
    }

    /// Creates a read error.
    pub fn read(node_id: impl ToString, source: NodeError) -> Self {
        Self::Read {
            node_id: node_id.to_string(),
            source,
        }
    }

    /// Creates a callback error.
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback(message.into())
    }

    /// Creates an unknown attribute error.
    pub fn unknown_attribute(node_id: impl ToString, attribute_id: u32) -> Self {
        Self::UnknownAttribute {
            node_id: node_id.to_string(),
            attribute_id,
        }
    }

    /// Returns `true` if the failure may clear up on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Read { .. })
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidRate { .. } => "invalid_rate",
            Self::Lifecycle(_) => "lifecycle",
            Self::Read { .. } => "read",
            Self::Callback(_) => "callback",
            Self::UnknownAttribute { .. } => "unknown_attribute",
            Self::Cancelled => "cancelled",
            Self::Join(_) => "join",
        }
    }
}

/// Result alias for sampling operations.
pub type SamplingResult<T> = Result<T, SamplingError>;
