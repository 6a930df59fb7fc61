// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `token-energy baseline` command: estimate idle power from an idle log.

use attribution::{AnalysisConfig, IdleOutcome};
use std::path::PathBuf;

pub async fn execute(
    config: AnalysisConfig,
    idle_log: PathBuf,
    trim: Option<f64>,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            token-energy · Idle Baseline             ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let mut params = config.baseline_params();
    if let Some(trim) = trim {
        params.trim_fraction = trim;
    }

    let log = power_trace::read_power_log(&idle_log)
        .map_err(|e| anyhow::anyhow!("failed to read idle log: {e}"))?
        .into_ordered();

    println!("  Idle log: {}", idle_log.display());
    println!("  {}", log.summary());
    println!(
        "  Trim:     {:.1}% per end, at least {} samples kept",
        params.trim_fraction * 100.0,
        params.min_samples,
    );
    println!();

    match IdleOutcome::from_log(&log, &params, Some(&idle_log.display().to_string()))? {
        IdleOutcome::Applied(baseline) => {
            println!("  Idle power: {baseline}");
        }
        IdleOutcome::Skipped { reason } => {
            println!("  Idle power: N/A");
            println!("   ! {reason}");
        }
    }
    println!();
    Ok(())
}
