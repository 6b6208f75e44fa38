// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema definitions for uademo.
//!
//! # Schema Structure
//!
//! ```text
//! UademoConfig
//! ├── server: ServerConfig
//! ├── sampling: SamplingConfig
//! │   └── push_delivery: PushDeliveryConfig
//! ├── demo: DemoConfig
//! ├── probes: Vec<ProbeConfig>
//! └── logging: LoggingConfig
//! ```
//!
//! Every section has defaults, so an empty document is a valid configuration.

use serde::{Deserialize, Serialize};

use uademo_core::types::{AttributeId, MonitoringMode, NodeId, ReadValueId};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Constants
// =============================================================================

/// Default namespace URI.
pub const DEFAULT_NAMESPACE_URI: &str = "urn:uademo:server:demo";

/// Default namespace index.
pub const DEFAULT_NAMESPACE_INDEX: u16 = 2;

/// Default minimum sampling interval in milliseconds.
pub const DEFAULT_MIN_SAMPLING_INTERVAL_MS: f64 = 100.0;

/// Default maximum sampling interval in milliseconds (1 hour).
pub const DEFAULT_MAX_SAMPLING_INTERVAL_MS: f64 = 3_600_000.0;

/// Default maximum queue size.
pub const DEFAULT_MAX_QUEUE_SIZE: u32 = 1000;

/// Default prefix of push-delivered node identifiers.
pub const DEFAULT_PUSH_PREFIX: &str = "Mass";

/// Default number of mass folders (A..Z).
pub const DEFAULT_MASS_FOLDERS: u32 = 26;

/// Maximum number of mass folders, one per letter.
pub const MAX_MASS_FOLDERS: u32 = 26;

/// Default number of variables per mass folder.
pub const DEFAULT_MASS_NODES_PER_FOLDER: u32 = 1000;

/// Maximum number of variables per mass folder.
pub const MAX_MASS_NODES_PER_FOLDER: u32 = 100_000;

/// Default interval of the simulated mass writer.
pub const DEFAULT_MASS_UPDATE_INTERVAL_MS: u64 = 1000;

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure for uademo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UademoConfig {
    /// Server identity and namespace.
    #[serde(default)]
    pub server: ServerConfig,

    /// Sampling engine settings.
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Demo address space settings.
    #[serde(default)]
    pub demo: DemoConfig,

    /// Monitored items created at startup.
    #[serde(default)]
    pub probes: Vec<ProbeConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl UademoConfig {
    /// Validates the entire configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.sampling.validate()?;
        self.demo.validate()?;
        for (i, probe) in self.probes.iter().enumerate() {
            probe.validate(i)?;
        }
        self.logging.validate()?;
        Ok(())
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Server identity and namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Human-readable server name.
    #[serde(default = "default_server_name")]
    pub name: String,

    /// URI of the demo namespace.
    #[serde(default = "default_namespace_uri")]
    pub namespace_uri: String,

    /// Index the demo namespace is registered at.
    #[serde(default = "default_namespace_index")]
    pub namespace_index: u16,
}

fn default_server_name() -> String {
    "uademo".to_string()
}

fn default_namespace_uri() -> String {
    DEFAULT_NAMESPACE_URI.to_string()
}

fn default_namespace_index() -> u16 {
    DEFAULT_NAMESPACE_INDEX
}

impl ServerConfig {
    /// Validates the server configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::validation("server.name", "cannot be empty"));
        }
        if self.namespace_uri.trim().is_empty() {
            return Err(ConfigError::validation("server.namespace_uri", "cannot be empty"));
        }
        if self.namespace_index == 0 {
            return Err(ConfigError::validation(
                "server.namespace_index",
                "0 is reserved for the standard namespace",
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            namespace_uri: default_namespace_uri(),
            namespace_index: default_namespace_index(),
        }
    }
}

// =============================================================================
// Sampling Configuration
// =============================================================================

/// Sampling engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplingConfig {
    /// Lower bound of revised sampling intervals.
    #[serde(default = "default_min_interval")]
    pub min_sampling_interval_ms: f64,

    /// Upper bound of revised sampling intervals.
    #[serde(default = "default_max_interval")]
    pub max_sampling_interval_ms: f64,

    /// Upper bound of revised queue sizes.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: u32,

    /// Interval reported to clients for push-delivered items.
    #[serde(default)]
    pub push_revised_interval_ms: f64,

    /// Which nodes are push-delivered.
    #[serde(default)]
    pub push_delivery: PushDeliveryConfig,
}

fn default_min_interval() -> f64 {
    DEFAULT_MIN_SAMPLING_INTERVAL_MS
}

fn default_max_interval() -> f64 {
    DEFAULT_MAX_SAMPLING_INTERVAL_MS
}

fn default_max_queue_size() -> u32 {
    DEFAULT_MAX_QUEUE_SIZE
}

impl SamplingConfig {
    /// Validates the sampling configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.min_sampling_interval_ms.is_finite() || self.min_sampling_interval_ms < 1.0 {
            return Err(ConfigError::validation(
                "sampling.min_sampling_interval_ms",
                "must be at least 1",
            ));
        }
        if !self.max_sampling_interval_ms.is_finite()
            || self.max_sampling_interval_ms < self.min_sampling_interval_ms
        {
            return Err(ConfigError::validation(
                "sampling.max_sampling_interval_ms",
                "must not be below min_sampling_interval_ms",
            ));
        }
        if self.max_queue_size == 0 {
            return Err(ConfigError::validation("sampling.max_queue_size", "must be at least 1"));
        }
        if !self.push_revised_interval_ms.is_finite() || self.push_revised_interval_ms < 0.0 {
            return Err(ConfigError::validation(
                "sampling.push_revised_interval_ms",
                "must be zero or positive",
            ));
        }
        self.push_delivery.validate()
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            min_sampling_interval_ms: default_min_interval(),
            max_sampling_interval_ms: default_max_interval(),
            max_queue_size: default_max_queue_size(),
            push_revised_interval_ms: 0.0,
            push_delivery: PushDeliveryConfig::default(),
        }
    }
}

/// Policy selecting push-delivered nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PushDeliveryConfig {
    /// Every node is sampled.
    None,
    /// Nodes whose string identifier starts with `prefix`.
    Prefix {
        /// Identifier prefix.
        #[serde(default = "default_push_prefix")]
        prefix: String,
    },
    /// Nodes whose numeric identifier is below `threshold`.
    NumericBelow {
        /// Exclusive upper bound.
        threshold: u32,
    },
}

fn default_push_prefix() -> String {
    DEFAULT_PUSH_PREFIX.to_string()
}

impl PushDeliveryConfig {
    /// Validates the policy.
    pub fn validate(&self) -> ConfigResult<()> {
        match self {
            Self::Prefix { prefix } if prefix.is_empty() => Err(ConfigError::validation(
                "sampling.push_delivery.prefix",
                "cannot be empty",
            )),
            Self::NumericBelow { threshold: 0 } => Err(ConfigError::validation(
                "sampling.push_delivery.threshold",
                "must be at least 1",
            )),
            _ => Ok(()),
        }
    }
}

impl Default for PushDeliveryConfig {
    fn default() -> Self {
        Self::Prefix {
            prefix: default_push_prefix(),
        }
    }
}

// =============================================================================
// Demo Configuration
// =============================================================================

/// Demo address space settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoConfig {
    /// Create the `Dynamic` random-value nodes.
    #[serde(default = "default_true")]
    pub dynamic_nodes: bool,

    /// Number of mass folders, lettered from `A`.
    #[serde(default = "default_mass_folders")]
    pub mass_folders: u32,

    /// Variables per mass folder.
    #[serde(default = "default_mass_nodes_per_folder")]
    pub mass_nodes_per_folder: u32,

    /// Interval of the simulated mass writer. `0` disables it.
    #[serde(default = "default_mass_update_interval")]
    pub mass_update_interval_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_mass_folders() -> u32 {
    DEFAULT_MASS_FOLDERS
}

fn default_mass_nodes_per_folder() -> u32 {
    DEFAULT_MASS_NODES_PER_FOLDER
}

fn default_mass_update_interval() -> u64 {
    DEFAULT_MASS_UPDATE_INTERVAL_MS
}

impl DemoConfig {
    /// Validates the demo configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.mass_folders > MAX_MASS_FOLDERS {
            return Err(ConfigError::validation(
                "demo.mass_folders",
                format!("cannot exceed {MAX_MASS_FOLDERS}"),
            ));
        }
        if self.mass_nodes_per_folder > MAX_MASS_NODES_PER_FOLDER {
            return Err(ConfigError::validation(
                "demo.mass_nodes_per_folder",
                format!("cannot exceed {MAX_MASS_NODES_PER_FOLDER}"),
            ));
        }
        Ok(())
    }

    /// Total number of mass variables.
    pub fn mass_node_count(&self) -> u64 {
        u64::from(self.mass_folders) * u64::from(self.mass_nodes_per_folder)
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            dynamic_nodes: true,
            mass_folders: default_mass_folders(),
            mass_nodes_per_folder: default_mass_nodes_per_folder(),
            mass_update_interval_ms: default_mass_update_interval(),
        }
    }
}

// =============================================================================
// Probe Configuration
// =============================================================================

/// A monitored item created by the server itself at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    /// Target node, e.g. `ns=2;s=Dynamic/RandomInt32`.
    pub node_id: String,

    /// Attribute name or numeric code.
    #[serde(default = "default_attribute")]
    pub attribute: String,

    /// Optional index range, e.g. `0:3`.
    #[serde(default)]
    pub index_range: Option<String>,

    /// Requested sampling interval in milliseconds.
    #[serde(default = "default_probe_interval")]
    pub sampling_interval_ms: f64,

    /// Requested queue size.
    #[serde(default = "default_probe_queue_size")]
    pub queue_size: u32,

    /// Initial monitoring mode.
    #[serde(default)]
    pub monitoring_mode: MonitoringMode,
}

fn default_attribute() -> String {
    "value".to_string()
}

fn default_probe_interval() -> f64 {
    1000.0
}

fn default_probe_queue_size() -> u32 {
    10
}

impl ProbeConfig {
    /// Creates a Value probe with default settings.
    pub fn value(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            attribute: default_attribute(),
            index_range: None,
            sampling_interval_ms: default_probe_interval(),
            queue_size: default_probe_queue_size(),
            monitoring_mode: MonitoringMode::default(),
        }
    }

    /// Validates the probe at position `index`.
    pub fn validate(&self, index: usize) -> ConfigResult<()> {
        self.read_value_id()
            .map_err(|e| ConfigError::validation(format!("probes[{index}]"), e.to_string()))?;

        if !self.sampling_interval_ms.is_finite() || self.sampling_interval_ms < 0.0 {
            return Err(ConfigError::validation(
                format!("probes[{index}].sampling_interval_ms"),
                "must be zero or positive",
            ));
        }
        Ok(())
    }

    /// Resolves the probe target.
    ///
    /// # Errors
    ///
    /// Fails if the node id or attribute cannot be parsed.
    pub fn read_value_id(&self) -> Result<ReadValueId, uademo_core::error::NodeError> {
        let node_id: NodeId = self.node_id.parse()?;
        let attribute: AttributeId = self.attribute.parse()?;
        let mut read_value_id = ReadValueId::new(node_id, attribute.code());
        read_value_id.index_range = self.index_range.clone();
        Ok(read_value_id)
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Validates the logging configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        Ok(())
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the filter directive for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(ConfigError::validation("logging.level", format!("unknown level '{other}'"))),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON lines for production.
    Json,
    /// Compact single-line text.
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(ConfigError::validation("logging.format", format!("unknown format '{other}'"))),
        }
    }
}
