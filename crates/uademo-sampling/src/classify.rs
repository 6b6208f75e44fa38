// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Push-versus-poll delivery selection.
//!
//! Which nodes can be served by change notifications is a property of the
//! namespace, not of the engine, so the controller takes the decision as an
//! injected [`DeliveryClassifier`].

use std::fmt;

use serde::{Deserialize, Serialize};

use uademo_core::types::NodeId;

/// How a monitored item receives values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// Re-read on a shared tick.
    Sampled,
    /// Pushed on attribute change.
    Subscribed,
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sampled => f.write_str("sampled"),
            Self::Subscribed => f.write_str("subscribed"),
        }
    }
}

/// Decides the delivery strategy for a node.
pub trait DeliveryClassifier: Send + Sync {
    /// Classifies `node_id`.
    fn classify(&self, node_id: &NodeId) -> Delivery;
}

impl<F> DeliveryClassifier for F
where
    F: Fn(&NodeId) -> Delivery + Send + Sync,
{
    fn classify(&self, node_id: &NodeId) -> Delivery {
        self(node_id)
    }
}

/// Samples every node.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysSample;

impl DeliveryClassifier for AlwaysSample {
    fn classify(&self, _node_id: &NodeId) -> Delivery {
        Delivery::Sampled
    }
}

/// Subscribes nodes whose string identifier starts with a prefix.
#[derive(Debug, Clone)]
pub struct PrefixClassifier {
    prefix: String,
}

impl PrefixClassifier {
    /// Prefix used for the generated mass node tree.
    pub const DEFAULT_PREFIX: &'static str = "Mass";

    /// Creates a classifier for `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The matched prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for PrefixClassifier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFIX)
    }
}

impl DeliveryClassifier for PrefixClassifier {
    fn classify(&self, node_id: &NodeId) -> Delivery {
        match node_id.as_string() {
            Some(s) if s.starts_with(self.prefix.as_str()) => Delivery::Subscribed,
            _ => Delivery::Sampled,
        }
    }
}

/// Subscribes nodes whose numeric identifier is below a threshold.
#[derive(Debug, Clone, Copy)]
pub struct NumericBelow {
    threshold: u32,
}

impl NumericBelow {
    /// Creates a classifier for identifiers `< threshold`.
    pub const fn new(threshold: u32) -> Self {
        Self { threshold }
    }
}

impl DeliveryClassifier for NumericBelow {
    fn classify(&self, node_id: &NodeId) -> Delivery {
        match node_id.as_numeric() {
            Some(n) if n < self.threshold => Delivery::Subscribed,
            _ => Delivery::Sampled,
        }
    }
}
