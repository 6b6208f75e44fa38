// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uademo Integration Tests
//!
//! Integration tests for the uademo sampling engine, plus the shared test
//! utilities they are built on.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: Pre-built nodes, items and configuration documents
//!   - `mocks`: Scriptable samplers, tick callbacks, nodes and address spaces
//!   - `harness`: A controller over a fixture namespace with teardown
//!   - `assertions`: Assertion helpers for delivered values
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p uademo-tests
//!
//! cargo test -p uademo-tests --test integration_tick
//! cargo test -p uademo-tests --test integration_sampling
//! cargo test -p uademo-tests --test integration_controller
//! cargo test -p uademo-tests --test integration_config
//! ```
//!
//! ## Test Categories
//!
//! ### Tick Tests (`integration_tick.rs`)
//! - One job per distinct rate
//! - Fixed-delay scheduling and overrun handling
//! - Modify, cancel and shutdown
//!
//! ### Sampling Tests (`integration_sampling.rs`)
//! - Sampled item startup, ticks, modify and shutdown
//! - Subscribed item change forwarding
//! - Failure values and lifecycle races
//!
//! ### Controller Tests (`integration_controller.rs`)
//! - Classification and revision
//! - Item create, modify, delete and monitoring mode callbacks
//! - Controller shutdown
//!
//! ### Config Tests (`integration_config.rs`)
//! - YAML, TOML and JSON documents
//! - Environment overrides and validation failures
//!
//! ## Using the Harness
//!
//! ```rust,ignore
//! use uademo_tests::common::harness::TestHarness;
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_something() {
//!     TestHarness::with_name("my_test")
//!         .run(|h| async move {
//!             let item = h.item(1, NodeFixtures::counter_id(), 100.0);
//!             h.create(&[item.clone()]).await.unwrap();
//!         })
//!         .await;
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use crate::common::mocks::*;
    pub use crate::common::{init_test_logging, temp_test_dir, unique_test_id};
}
