// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `token-energy inspect` command: sanity-check logs before analysis.
//!
//! Prints sample counts, time spans and power statistics, and reports
//! whether the power log needed reordering.

use std::path::PathBuf;

pub async fn execute(power: Option<PathBuf>, requests: Option<PathBuf>) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              token-energy · Log Inspector           ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    if power.is_none() && requests.is_none() {
        anyhow::bail!("nothing to inspect; pass --power and/or --requests");
    }

    // ── Power Log ──────────────────────────────────────────────
    if let Some(path) = power {
        let raw = power_trace::read_power_log(&path)
            .map_err(|e| anyhow::anyhow!("failed to read power log: {e}"))?;
        let was_ordered = raw.is_ordered();
        let log = raw.into_ordered();

        println!("  Power log: {}", path.display());
        println!("   Samples:     {}", log.len());
        if let (Some(first), Some(last)) = (log.first_timestamp(), log.last_timestamp()) {
            println!("   Span:        [{first:.3}, {last:.3}] s ({:.2} s)", log.duration());
        }
        println!("   Mean power:  {:.2} W", log.mean_power());
        println!("   Peak power:  {:.2} W", log.peak_power());
        match log.memory_capacity_bytes {
            Some(bytes) => println!("   Memory:      {:.1} GB", bytes as f64 / 1e9),
            None => println!("   Memory:      N/A"),
        }
        if !was_ordered {
            println!("   ! samples were out of order and have been sorted by timestamp");
        }
        if let Err(e) = log.require_integrable() {
            println!("   ! {e}");
        }
        println!();
    }

    // ── Request Log ────────────────────────────────────────────
    if let Some(path) = requests {
        let log = request_trace::read_request_log(&path)
            .map_err(|e| anyhow::anyhow!("failed to read request log: {e}"))?;

        println!("  Request log: {}", path.display());
        println!("   {}", log.summary());
        if let Some((start, end)) = log.time_span() {
            println!("   Span:        [{start:.3}, {end:.3}] s ({:.2} s)", end - start);
        }
        let prompt: u64 = log.records().iter().map(|r| r.prompt_tokens).sum();
        let completion: u64 = log.records().iter().map(|r| r.completion_tokens).sum();
        println!("   Prompt tokens:     {prompt}");
        println!("   Completion tokens: {completion}");
        println!();
    }

    Ok(())
}
