// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use std::time::Duration;

use tracing::info;

use crate::cli::{Cli, RunArgs};
use crate::error::BinResult;
use crate::logging::init_logging;
use crate::runtime::RuntimeBuilder;

/// Executes the `run` command to start the server.
pub async fn run(cli: &Cli, args: RunArgs) -> BinResult<()> {
    let mut builder = RuntimeBuilder::new().writer_enabled(!args.no_writer);
    if let Some(path) = &cli.config {
        builder = builder.config_path(path);
    }
    if let Some(secs) = args.duration_secs {
        builder = builder.duration(Duration::from_secs(secs));
    }
    let runtime = builder.build()?;

    let logging = &runtime.config().logging;
    init_logging(
        cli.effective_log_level(logging.level.as_str()),
        cli.effective_log_format(logging.format),
    )?;

    if let Some(path) = &cli.config {
        info!(path = %path.display(), "Configuration loaded");
    }

    let summary = runtime.run().await?;
    info!(
        probes = summary.probes,
        delivered = summary.delivered,
        "Run finished"
    );
    Ok(())
}
