// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uademo-bin
//!
//! CLI binary for the uademo OPC UA demo server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         main.rs                             │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!                    ┌──────▼──────┐
//!                    │    cli.rs   │
//!                    └──────┬──────┘
//!                           │
//!               ┌───────────┼───────────┐
//!               ▼           ▼           ▼
//!        ┌──────────┐ ┌──────────┐ ┌──────────┐
//!        │ commands │ │ runtime  │ │ logging  │
//!        └──────────┘ └────┬─────┘ └──────────┘
//!                          │
//!               ┌──────────┼──────────┐
//!               ▼                     ▼
//!        ┌──────────┐          ┌──────────┐
//!        │   demo   │          │ shutdown │
//!        └────┬─────┘          └──────────┘
//!             │
//!      ┌──────▼──────────────────────────┐
//!      │ uademo-sampling / uademo-core   │
//!      └─────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the server with built-in defaults
//! uademo
//!
//! # Start with a config file, stop after a minute
//! uademo -c /etc/uademo/uademo.yaml run --duration-secs 60
//!
//! # Validate configuration
//! uademo -c uademo.yaml validate --strict
//!
//! # Show version
//! uademo version
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod demo;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use demo::{DemoNamespace, MassWriter};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{RunSummary, RuntimeBuilder, ServerRuntime};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
