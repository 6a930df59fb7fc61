// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # token-energy
//!
//! Command-line interface for the token-energy attribution engine.
//!
//! ## Usage
//! ```bash
//! # Energy per token for one run
//! token-energy analyze --power active.csv --requests requests.csv --idle-log idle.csv --warmup 30
//!
//! # Idle baseline only
//! token-energy baseline --idle-log idle.csv
//!
//! # Prefill/decode coefficients over the [[runs]] in a config file
//! token-energy --config campaign.toml fit --json fit.json
//!
//! # Sanity-check logs before analysing them
//! token-energy inspect --power active.csv --requests requests.csv
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "token-energy",
    about = "Attributes measured GPU energy to LLM inference tokens",
    version,
    author
)]
struct Cli {
    /// Path to a TOML analysis configuration (CLI flags override its values).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attribute one run's energy to its tokens.
    Analyze {
        /// Power log captured during the run.
        #[arg(short, long)]
        power: PathBuf,

        /// Request log captured during the run.
        #[arg(short, long)]
        requests: PathBuf,

        /// Idle power log for the baseline.
        #[arg(long)]
        idle_log: Option<PathBuf>,

        /// Manual idle power in watts (skips idle measurement).
        #[arg(long, conflicts_with = "idle_log")]
        idle_power: Option<f64>,

        /// Seconds to drop from the start of the power log.
        #[arg(long)]
        warmup: Option<f64>,

        /// Seconds to drop from the end of the power log.
        #[arg(long)]
        cooldown: Option<f64>,

        /// Request overlap policy: intersects, proportional.
        #[arg(long)]
        policy: Option<String>,

        /// Label used in the report.
        #[arg(short, long, default_value = "run")]
        label: String,

        /// Write the full report as JSON to this path.
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Estimate the idle power baseline from an idle log.
    Baseline {
        /// Idle power log.
        #[arg(short, long)]
        idle_log: PathBuf,

        /// Fraction of samples trimmed from each end.
        #[arg(long)]
        trim: Option<f64>,
    },

    /// Fit prefill/decode energy coefficients over the configured runs.
    Fit {
        /// Write the campaign report as JSON to this path.
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Print sample counts, time spans and power statistics of logs.
    Inspect {
        /// Power log to inspect.
        #[arg(short, long)]
        power: Option<PathBuf>,

        /// Request log to inspect.
        #[arg(short, long)]
        requests: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            power,
            requests,
            idle_log,
            idle_power,
            warmup,
            cooldown,
            policy,
            label,
            json,
        } => {
            let overrides = commands::analyze::Overrides {
                idle_log,
                idle_power,
                warmup,
                cooldown,
                policy,
            };
            commands::analyze::execute(config, overrides, label, power, requests, json).await
        }
        Commands::Baseline { idle_log, trim } => {
            commands::baseline::execute(config, idle_log, trim).await
        }
        Commands::Fit { json } => commands::fit::execute(config, json).await,
        Commands::Inspect { power, requests } => commands::inspect::execute(power, requests).await,
    }
}
