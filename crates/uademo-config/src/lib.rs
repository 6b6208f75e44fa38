// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uademo-config
//!
//! Configuration management for the uademo server.
//!
//! ## Features
//!
//! - **Schema Definition**: Server, sampling, demo address space, probes and logging
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Environment Overrides**: Override config values via environment variables
//!
//! ## Quick Start
//!
//! ```no_run
//! use uademo_config::loader::load_config;
//!
//! let config = load_config("uademo.yaml").unwrap();
//!
//! println!("Server: {}", config.server.name);
//! println!("Probes: {}", config.probes.len());
//! ```
//!
//! ## Environment Variables
//!
//! Values in config files can reference environment variables:
//!
//! ```yaml
//! server:
//!   name: "${UADEMO_NAME:uademo}"
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod error;
pub mod loader;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_config_str, ConfigFormat, ConfigLoader};
pub use schema::{
    DemoConfig, LogFormat, LogLevel, LoggingConfig, ProbeConfig, PushDeliveryConfig,
    SamplingConfig, ServerConfig, UademoConfig,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name() {
        assert_eq!(NAME, "uademo-config");
        assert!(!VERSION.is_empty());
    }
}
