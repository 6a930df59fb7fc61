// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `token-energy fit` command: prefill/decode coefficients over a campaign.
//!
//! Each `[[runs]]` entry of the config is analysed on the blocking pool in
//! parallel; the results are then combined into one least-squares fit. A
//! failed run is reported and excluded without affecting the others.

use attribution::{fmt_opt, AnalysisConfig, EnergyAnalyzer};
use std::path::PathBuf;
use std::sync::Arc;

pub async fn execute(config: AnalysisConfig, json: Option<PathBuf>) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║          token-energy · Prefill/Decode Fit          ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    if config.runs.is_empty() {
        anyhow::bail!("no [[runs]] configured; pass a campaign config with --config");
    }

    let analyzer = Arc::new(EnergyAnalyzer::new(config)?);
    let idle = Arc::new(analyzer.resolve_idle()?);
    match idle.baseline() {
        Some(b) => println!("  Idle baseline: {b}"),
        None => println!("  Idle baseline: N/A (not subtracted)"),
    }
    println!("  Runs:          {}", analyzer.config().runs.len());
    println!();

    let handles: Vec<_> = analyzer
        .config()
        .runs
        .iter()
        .cloned()
        .map(|run| {
            let analyzer = Arc::clone(&analyzer);
            let idle = Arc::clone(&idle);
            let label = run.label.clone();
            let handle = tokio::task::spawn_blocking(move || {
                analyzer.analyze_run_files(&run.label, &run.power_log, &run.request_log, &idle)
            });
            (label, handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (label, handle) in handles {
        let outcome = handle
            .await
            .map_err(|e| anyhow::anyhow!("run '{label}' panicked: {e}"))?;
        outcomes.push((label, outcome));
    }

    let campaign = analyzer.analyze_campaign(outcomes);

    // ── Per-Run Results ────────────────────────────────────────
    println!(
        "  {:<20} {:>10} {:>12} {:>12} {:>10} {:>10}",
        "Run", "Prompt", "Completion", "Active J", "J/token", "Tok/s",
    );
    println!("  {}", "-".repeat(80));
    for run in &campaign.runs {
        println!(
            "  {:<20} {:>10} {:>12} {:>12.2} {:>10} {:>10}",
            run.label,
            run.tokens.prompt_tokens,
            run.tokens.completion_tokens,
            run.result.active_energy_j,
            fmt_opt(run.result.energy_per_token_j, 4),
            fmt_opt(run.result.throughput_tokens_per_s, 1),
        );
    }
    for failed in &campaign.failed {
        println!("  {:<20}     FAILED: {}", failed.label, failed.error);
    }
    println!();

    // ── Coefficients ───────────────────────────────────────────
    match &campaign.fit {
        Some(fit) => {
            println!("  Coefficients:");
            println!(
                "   α (prefill):       {:.6} J/prompt token",
                fit.coefficients.alpha_j_per_prompt_token
            );
            println!(
                "   β (decode):        {:.6} J/completion token",
                fit.coefficients.beta_j_per_completion_token
            );
            println!("   R²:                {:.6}", fit.r_squared);
            println!("   Max |residual|:    {:.2} J", fit.max_abs_residual_j);
            println!("   Condition number:  {:.3e}", fit.condition_number);
        }
        None => println!("  Coefficients: N/A (per-run aggregates only)"),
    }
    println!();

    for run in &campaign.runs {
        if !run.warnings.is_empty() {
            println!("  [{}]", run.label);
            super::print_warnings(&run.warnings);
        }
    }
    super::print_warnings(&campaign.warnings);

    if let Some(path) = json {
        super::write_json(&path, &campaign.to_json()?)?;
    }
    tracing::info!("{}", campaign.summary());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use attribution::RunSpec;

    fn write_run(dir: &std::path::Path, label: &str, prompt: u64, completion: u64) -> RunSpec {
        let watts = (2.0 * prompt as f64 + 5.0 * completion as f64) / 10.0;
        let power_log = dir.join(format!("{label}_power.csv"));
        let request_log = dir.join(format!("{label}_requests.csv"));
        let mut power = String::from("timestamp,power_W,gpu_util,mem_used_bytes\n");
        for i in 0..=20 {
            power.push_str(&format!("{},{watts},90,0\n", i as f64 * 0.5));
        }
        std::fs::write(&power_log, power).unwrap();
        std::fs::write(
            &request_log,
            format!(
                "request_id,timestamp_submitted,timestamp_completed,prompt_tokens,completion_tokens,latency_seconds,success\n\
                 r,2.0,8.0,{prompt},{completion},6.0,true\n"
            ),
        )
        .unwrap();
        RunSpec {
            label: label.into(),
            power_log,
            request_log,
        }
    }

    #[tokio::test]
    async fn test_fit_runs_in_parallel_and_writes_json() {
        let dir = std::env::temp_dir().join("token_energy_cli_fit");
        std::fs::create_dir_all(&dir).unwrap();
        let config = AnalysisConfig {
            idle_power_w: Some(0.0),
            runs: vec![
                write_run(&dir, "a", 100, 50),
                write_run(&dir, "b", 200, 300),
                write_run(&dir, "c", 50, 400),
            ],
            ..Default::default()
        };
        let json = dir.join("campaign.json");
        let _ = std::fs::remove_file(&json);

        execute(config, Some(json.clone())).await.unwrap();

        let written = std::fs::read_to_string(&json).unwrap();
        assert!(written.contains("alpha_j_per_prompt_token"));
        assert!(written.contains("\"label\": \"c\""));
    }

    #[tokio::test]
    async fn test_fit_without_runs_is_error() {
        assert!(execute(AnalysisConfig::default(), None).await.is_err());
    }
}
