// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared CLI helpers.

pub mod analyze;
pub mod baseline;
pub mod fit;
pub mod inspect;

use anyhow::Context;
use attribution::AnalysisConfig;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the `-v` count.
pub fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads the analysis config from `path`, or the defaults without one.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    match path {
        Some(p) => {
            let config = AnalysisConfig::from_file(p)
                .with_context(|| format!("failed to load config '{}'", p.display()))?;
            tracing::info!("loaded config from {}", p.display());
            Ok(config)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

/// Writes `json` to `path`.
pub fn write_json(path: &Path, json: &str) -> anyhow::Result<()> {
    std::fs::write(path, json)
        .with_context(|| format!("failed to write JSON report to '{}'", path.display()))?;
    println!("  JSON report written to {}", path.display());
    Ok(())
}

/// Prints the warnings block, if any.
pub fn print_warnings(warnings: &[attribution::AnalysisWarning]) {
    if warnings.is_empty() {
        return;
    }
    println!("  Warnings:");
    for w in warnings {
        println!("   ! {w}");
    }
    println!();
}
