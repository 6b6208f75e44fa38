// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uademo-sampling
//!
//! The sampling and subscription delivery engine of the uademo server.
//!
//! Monitored items are served in one of two ways:
//!
//! - **Sampled**: re-read on a shared per-rate tick ([`TickManager`])
//! - **Subscribed**: pushed whenever the node reports an attribute change
//!
//! The [`NamespaceController`] receives monitored item lifecycle callbacks
//! from the subscription layer, picks a strategy with an injected
//! [`DeliveryClassifier`] and tracks the live instances.
//!
//! ## Example
//!
//! ```rust,ignore
//! use uademo_sampling::{NamespaceController, PrefixClassifier};
//!
//! let controller = NamespaceController::builder(address_space)
//!     .classifier(Arc::new(PrefixClassifier::default()))
//!     .build();
//!
//! for handle in controller.on_data_items_created(&items) {
//!     handle.wait().await?;
//! }
//!
//! controller.shutdown().await;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Scheduling
// =============================================================================

pub mod error;
pub mod scope;
pub mod tick;

// =============================================================================
// Delivery
// =============================================================================

pub mod item;
pub mod sampled;
pub mod sampler;
pub mod subscribed;

// =============================================================================
// Control
// =============================================================================

pub mod classify;
pub mod controller;
pub mod revision;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use error::{SamplingError, SamplingResult};
pub use scope::SamplingScope;
pub use tick::{tick_fn, Tick, TickCallback, TickId, TickManager};

pub use item::{DataItem, MonitoredItemId, QueuedDataItem};
pub use sampled::{interval_to_rate, SampledItem, StartupHandle};
pub use sampler::{NodeSampler, Sampler};
pub use subscribed::SubscribedItem;

pub use classify::{AlwaysSample, Delivery, DeliveryClassifier, NumericBelow, PrefixClassifier};
pub use controller::{NamespaceController, NamespaceControllerBuilder};
pub use revision::{RevisedParameters, SamplingRevision};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
