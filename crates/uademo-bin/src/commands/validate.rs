// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use uademo_config::{load_config, PushDeliveryConfig, UademoConfig};

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::demo::{DYNAMIC_FOLDER, MASS_FOLDER};
use crate::error::{BinError, BinResult};

/// Executes the `validate` command to validate configuration.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let (config, source) = match &cli.config {
        Some(path) => {
            if !path.exists() {
                return Err(BinError::config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            let config = load_config(path)
                .map_err(|e| BinError::from(e).with_context("Configuration validation failed"))?;
            (config, path.display().to_string())
        }
        None => {
            let config = UademoConfig::default();
            config.validate()?;
            (config, "(built-in defaults)".to_string())
        }
    };

    let warnings = collect_warnings(&config);

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", source);
            println!();
            println!("Summary:");
            println!("  Server Name:     {}", config.server.name);
            println!("  Namespace:       {} (ns={})", config.server.namespace_uri, config.server.namespace_index);
            println!("  Dynamic Nodes:   {}", if config.demo.dynamic_nodes { "enabled" } else { "disabled" });
            println!("  Mass Nodes:      {}", config.demo.mass_node_count());
            println!("  Push Delivery:   {}", describe_push(&config.sampling.push_delivery));
            println!(
                "  Interval Bounds: {}ms..{}ms",
                config.sampling.min_sampling_interval_ms, config.sampling.max_sampling_interval_ms
            );
            println!("  Probes:          {}", config.probes.len());

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!(
                    "{}",
                    serde_json::to_string_pretty(&config)
                        .unwrap_or_else(|_| "(serialization error)".to_string())
                );
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": source,
                "summary": {
                    "server_name": config.server.name,
                    "namespace_uri": config.server.namespace_uri,
                    "namespace_index": config.server.namespace_index,
                    "dynamic_nodes": config.demo.dynamic_nodes,
                    "mass_node_count": config.demo.mass_node_count(),
                    "push_delivery": describe_push(&config.sampling.push_delivery),
                    "probe_count": config.probes.len(),
                },
                "warnings": warnings,
                "config": if args.show_config { Some(&config) } else { None },
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output)
                    .map_err(|e| BinError::runtime(format!("Failed to render output: {}", e)))?
            );
        }
    }

    if args.strict && !warnings.is_empty() {
        return Err(BinError::config(format!(
            "Strict mode: {} warning(s) found",
            warnings.len()
        )));
    }

    Ok(())
}

fn describe_push(push: &PushDeliveryConfig) -> String {
    match push {
        PushDeliveryConfig::None => "none".to_string(),
        PushDeliveryConfig::Prefix { prefix } => format!("string ids starting with '{}'", prefix),
        PushDeliveryConfig::NumericBelow { threshold } => {
            format!("numeric ids below {}", threshold)
        }
    }
}

/// Finds settings that are valid but probably not what was intended.
pub fn collect_warnings(config: &UademoConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.probes.is_empty() {
        warnings.push("No probes configured; nothing will be sampled until a client subscribes".to_string());
    }

    let push_enabled = !matches!(config.sampling.push_delivery, PushDeliveryConfig::None);
    if push_enabled && config.demo.mass_update_interval_ms == 0 {
        warnings.push(
            "Mass writer is disabled; push-delivered items only receive their initial value"
                .to_string(),
        );
    }
    if matches!(config.sampling.push_delivery, PushDeliveryConfig::NumericBelow { .. }) {
        warnings.push("Demo nodes use string ids; numeric push delivery matches none of them".to_string());
    }

    for (index, probe) in config.probes.iter().enumerate() {
        let Ok(read_value_id) = probe.read_value_id() else {
            continue;
        };
        let node_id = &read_value_id.node_id;

        if node_id.namespace_index != config.server.namespace_index {
            warnings.push(format!(
                "probes[{}] targets namespace {}, demo nodes live in namespace {}",
                index, node_id.namespace_index, config.server.namespace_index
            ));
            continue;
        }

        let root = node_id
            .as_string()
            .and_then(|s| s.split('/').next())
            .unwrap_or_default();
        if root == DYNAMIC_FOLDER && !config.demo.dynamic_nodes {
            warnings.push(format!(
                "probes[{}] targets {} but dynamic nodes are disabled",
                index, node_id
            ));
        } else if root == MASS_FOLDER && config.demo.mass_node_count() == 0 {
            warnings.push(format!(
                "probes[{}] targets {} but no mass nodes are configured",
                index, node_id
            ));
        }
    }

    warnings
}
