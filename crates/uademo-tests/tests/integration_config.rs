// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Configuration Integration Tests
//!
//! Loads full documents from disk and from strings, exercises environment
//! handling, and wires the result into the sampling engine's policies.

use std::fs;
use std::path::PathBuf;

use uademo_config::{
    load_config, load_config_str, ConfigError, ConfigFormat, ConfigLoader, LogFormat, LogLevel,
    PushDeliveryConfig,
};
use uademo_core::{AttributeId, MonitoringMode, NodeId};
use uademo_sampling::{Delivery, DeliveryClassifier, NumericBelow, PrefixClassifier, SamplingRevision};
use uademo_tests::prelude::*;

fn write_config(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

/// A loader reading overrides from a prefix no other test uses.
fn isolated_loader() -> (ConfigLoader, String) {
    let prefix = format!("UADEMO_{}", unique_test_id().to_uppercase());
    (ConfigLoader::new().with_env_prefix(prefix.clone()), prefix)
}

// =============================================================================
// Formats
// =============================================================================

#[test]
fn test_load_yaml_file() {
    let dir = temp_test_dir("uademo-config");
    let path = write_config(&dir, "uademo.yaml", ConfigFixtures::yaml());

    let config = load_config(&path).unwrap();

    assert_eq!(config.server.name, "yaml-demo");
    assert_eq!(config.server.namespace_uri, "urn:uademo:test");
    assert_eq!(config.server.namespace_index, 3);

    assert_eq!(config.sampling.min_sampling_interval_ms, 50.0);
    assert_eq!(config.sampling.max_sampling_interval_ms, 60000.0);
    assert_eq!(config.sampling.max_queue_size, 500);
    assert_eq!(
        config.sampling.push_delivery,
        PushDeliveryConfig::Prefix {
            prefix: "Mass".to_string()
        }
    );

    assert!(config.demo.dynamic_nodes);
    assert_eq!(config.demo.mass_node_count(), 100);
    assert_eq!(config.demo.mass_update_interval_ms, 250);

    assert_eq!(config.probes.len(), 2);
    assert_eq!(config.probes[0].sampling_interval_ms, 500.0);
    assert_eq!(config.probes[1].queue_size, 5);
    assert_eq!(config.probes[1].monitoring_mode, MonitoringMode::Sampling);

    assert_eq!(config.logging.level, LogLevel::Debug);
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_load_toml_string() {
    let config = load_config_str(ConfigFixtures::toml(), ConfigFormat::Toml).unwrap();

    assert_eq!(config.server.name, "toml-demo");
    assert_eq!(config.server.namespace_index, 2);
    assert_eq!(config.sampling.min_sampling_interval_ms, 250.0);
    assert_eq!(
        config.sampling.push_delivery,
        PushDeliveryConfig::NumericBelow { threshold: 100 }
    );
    assert_eq!(config.demo.mass_node_count(), 10);

    let target = config.probes[0].read_value_id().unwrap();
    assert_eq!(target.node_id, NodeId::numeric(2, 42));
    assert_eq!(target.attribute_id, AttributeId::Value as u32);
    assert_eq!(config.probes[0].sampling_interval_ms, 1000.0);
    assert_eq!(config.probes[0].queue_size, 10);
}

#[test]
fn test_load_json_file() {
    let dir = temp_test_dir("uademo-config");
    let path = write_config(&dir, "uademo.json", ConfigFixtures::json());

    let config = load_config(&path).unwrap();

    assert_eq!(config.server.name, "json-demo");
    assert_eq!(config.sampling.push_delivery, PushDeliveryConfig::None);
    assert_eq!(config.logging.level, LogLevel::Warn);
    assert_eq!(config.logging.format, LogFormat::Compact);
    assert!(config.probes.is_empty());
}

#[test]
fn test_formats_agree_on_defaults() {
    let yaml = load_config_str("server:\n  name: same\n", ConfigFormat::Yaml).unwrap();
    let toml = load_config_str("[server]\nname = \"same\"\n", ConfigFormat::Toml).unwrap();
    let json = load_config_str(r#"{"server": {"name": "same"}}"#, ConfigFormat::Json).unwrap();

    for config in [&yaml, &toml, &json] {
        assert_eq!(config.server.name, "same");
        assert_eq!(config.sampling.min_sampling_interval_ms, 100.0);
        assert_eq!(config.sampling.max_queue_size, 1000);
        assert_eq!(config.demo.mass_folders, 26);
        assert_eq!(config.logging.level, LogLevel::Info);
    }
}

#[test]
fn test_config_serializes_as_json() {
    let config = load_config_str(ConfigFixtures::toml(), ConfigFormat::Toml).unwrap();
    let value = serde_json::to_value(&config).unwrap();

    assert_eq!(value["server"]["name"], "toml-demo");
    assert_eq!(value["sampling"]["push_delivery"]["mode"], "numeric_below");
    assert_eq!(value["sampling"]["push_delivery"]["threshold"], 100);
    assert_eq!(value["probes"][0]["monitoring_mode"], "reporting");
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_missing_file() {
    let dir = temp_test_dir("uademo-config");
    let err = load_config(dir.path().join("absent.yaml")).unwrap_err();

    assert!(matches!(err, ConfigError::FileNotFound { .. }));
    assert!(err.is_io_error());
}

#[test]
fn test_unsupported_extension() {
    let dir = temp_test_dir("uademo-config");
    let path = write_config(&dir, "uademo.ini", "[server]\nname=x\n");

    let err = load_config(&path).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { ref format } if format == "ini"));
}

#[test]
fn test_parse_error_names_file() {
    let dir = temp_test_dir("uademo-config");
    let path = write_config(&dir, "broken.toml", "[server\nname = ");

    let err = load_config(&path).unwrap_err();
    match err {
        ConfigError::Parse { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_unknown_fields_rejected() {
    let err = load_config_str(r#"{"server": {"name": "x", "port": 4840}}"#, ConfigFormat::Json)
        .unwrap_err();
    assert_eq!(err.error_type(), "serialization");
    assert!(err.to_string().contains("port"));
}

#[test]
fn test_validation_errors_name_the_field() {
    let cases = [
        (
            "[sampling]\nmin_sampling_interval_ms = 500.0\nmax_sampling_interval_ms = 100.0\n",
            "sampling.max_sampling_interval_ms",
        ),
        ("[sampling]\nmin_sampling_interval_ms = 0.5\n", "sampling.min_sampling_interval_ms"),
        ("[sampling]\nmax_queue_size = 0\n", "sampling.max_queue_size"),
        (
            "[sampling.push_delivery]\nmode = \"numeric_below\"\nthreshold = 0\n",
            "sampling.push_delivery.threshold",
        ),
        (
            "[sampling.push_delivery]\nmode = \"prefix\"\nprefix = \"\"\n",
            "sampling.push_delivery.prefix",
        ),
        ("[server]\nnamespace_index = 0\n", "server.namespace_index"),
        ("[server]\nname = \"  \"\n", "server.name"),
        ("[demo]\nmass_folders = 27\n", "demo.mass_folders"),
        ("[[probes]]\nnode_id = \"not a node\"\n", "probes[0]"),
        (
            "[[probes]]\nnode_id = \"ns=2;i=1\"\nattribute = \"Colour\"\n",
            "probes[0]",
        ),
        (
            "[[probes]]\nnode_id = \"ns=2;i=1\"\nsampling_interval_ms = -5.0\n",
            "probes[0].sampling_interval_ms",
        ),
    ];

    for (content, field) in cases {
        let err = load_config_str(content, ConfigFormat::Toml).unwrap_err();
        assert_eq!(err.field(), Some(field), "for document:\n{content}");
    }
}

// =============================================================================
// Environment
// =============================================================================

#[test]
fn test_env_overrides_apply() {
    let (loader, prefix) = isolated_loader();
    std::env::set_var(format!("{prefix}_SERVER_NAME"), "from-env");
    std::env::set_var(format!("{prefix}_LOG_LEVEL"), "trace");
    std::env::set_var(format!("{prefix}_LOG_FORMAT"), "pretty");
    std::env::set_var(format!("{prefix}_SAMPLING_MIN_INTERVAL_MS"), "20");
    std::env::set_var(format!("{prefix}_DEMO_MASS_NODES_PER_FOLDER"), "7");

    let config = loader
        .load_from_str(ConfigFixtures::yaml(), ConfigFormat::Yaml)
        .unwrap();

    assert_eq!(config.server.name, "from-env");
    assert_eq!(config.logging.level, LogLevel::Trace);
    assert_eq!(config.logging.format, LogFormat::Text);
    assert_eq!(config.sampling.min_sampling_interval_ms, 20.0);
    assert_eq!(config.demo.mass_node_count(), 14);
}

#[test]
fn test_env_overrides_are_validated() {
    let (loader, prefix) = isolated_loader();
    std::env::set_var(format!("{prefix}_SAMPLING_MIN_INTERVAL_MS"), "120000");

    let err = loader
        .load_from_str(ConfigFixtures::yaml(), ConfigFormat::Yaml)
        .unwrap_err();
    assert_eq!(err.field(), Some("sampling.max_sampling_interval_ms"));
}

#[test]
fn test_invalid_env_override() {
    let (loader, prefix) = isolated_loader();
    let name = format!("{prefix}_LOG_LEVEL");
    std::env::set_var(&name, "loud");

    let err = loader
        .load_from_str(ConfigFixtures::json(), ConfigFormat::Json)
        .unwrap_err();
    match err {
        ConfigError::InvalidEnvVar { name: reported, .. } => assert_eq!(reported, name),
        other => panic!("expected invalid env var, got {other:?}"),
    }
}

#[test]
fn test_env_resolution_can_be_disabled() {
    let (loader, prefix) = isolated_loader();
    std::env::set_var(format!("{prefix}_SERVER_NAME"), "ignored");
    let document = format!("server:\n  name: \"${{{prefix}_PLACEHOLDER:literal}}\"\n");

    let resolved = loader.clone().load_from_str(&document, ConfigFormat::Yaml).unwrap();
    assert_eq!(resolved.server.name, "ignored");

    let raw = loader
        .with_env_vars(false)
        .load_from_str(&document, ConfigFormat::Yaml)
        .unwrap();
    assert_eq!(raw.server.name, format!("${{{prefix}_PLACEHOLDER:literal}}"));
}

#[test]
fn test_placeholders_resolve_from_env_or_default() {
    let (loader, prefix) = isolated_loader();
    let var = format!("{prefix}_PROBE_TARGET");
    let document = format!(
        "probes:\n  - node_id: \"${{{var}:ns=2;s=Dynamic/RandomInt32}}\"\n"
    );

    let defaulted = loader.load_from_str(&document, ConfigFormat::Yaml).unwrap();
    assert_eq!(defaulted.probes[0].node_id, "ns=2;s=Dynamic/RandomInt32");

    std::env::set_var(&var, "ns=2;s=Mass/B/007");
    let resolved = loader.load_from_str(&document, ConfigFormat::Yaml).unwrap();
    assert_eq!(resolved.probes[0].node_id, "ns=2;s=Mass/B/007");
}

// =============================================================================
// Engine wiring
// =============================================================================

#[test]
fn test_sampling_section_drives_revision() {
    let config = load_config_str(ConfigFixtures::yaml(), ConfigFormat::Yaml).unwrap();
    let sampling = &config.sampling;
    let revision = SamplingRevision::new()
        .with_interval_bounds(sampling.min_sampling_interval_ms, sampling.max_sampling_interval_ms)
        .with_max_queue_size(sampling.max_queue_size)
        .with_push_interval(sampling.push_revised_interval_ms);

    let revised = revision.revise(Delivery::Sampled, 10.0, 10_000);
    assert_eq!(revised.sampling_interval, 50.0);
    assert_eq!(revised.queue_size, 500);

    let revised = revision.revise(Delivery::Subscribed, 10.0, 10_000);
    assert_eq!(revised.sampling_interval, 0.0);
    assert_eq!(revised.queue_size, 10_000);
}

#[test]
fn test_push_section_drives_classification() {
    let yaml = load_config_str(ConfigFixtures::yaml(), ConfigFormat::Yaml).unwrap();
    let PushDeliveryConfig::Prefix { prefix } = &yaml.sampling.push_delivery else {
        panic!("yaml fixture selects prefix delivery");
    };
    let classifier = PrefixClassifier::new(prefix.clone());
    let mass = yaml.probes[1].read_value_id().unwrap();
    let dynamic = yaml.probes[0].read_value_id().unwrap();
    assert_eq!(classifier.classify(&mass.node_id), Delivery::Subscribed);
    assert_eq!(classifier.classify(&dynamic.node_id), Delivery::Sampled);

    let toml = load_config_str(ConfigFixtures::toml(), ConfigFormat::Toml).unwrap();
    let PushDeliveryConfig::NumericBelow { threshold } = toml.sampling.push_delivery else {
        panic!("toml fixture selects numeric delivery");
    };
    let classifier = NumericBelow::new(threshold);
    let probe = toml.probes[0].read_value_id().unwrap();
    assert_eq!(classifier.classify(&probe.node_id), Delivery::Subscribed);
    assert_eq!(classifier.classify(&NodeId::numeric(2, 100)), Delivery::Sampled);
}
