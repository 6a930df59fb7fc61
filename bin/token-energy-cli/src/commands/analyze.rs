// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `token-energy analyze` command: attribute one run's energy to its tokens.
//!
//! Resolves the idle baseline, analyses the run over its steady-state window
//! and prints energy, efficiency and environmental figures. Undefined
//! metrics print as "N/A".

use attribution::{fmt_opt, AnalysisConfig, EnergyAnalyzer, RunReport};
use request_trace::OverlapPolicy;
use std::path::PathBuf;

/// CLI flags that override config-file values.
pub struct Overrides {
    pub idle_log: Option<PathBuf>,
    pub idle_power: Option<f64>,
    pub warmup: Option<f64>,
    pub cooldown: Option<f64>,
    pub policy: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut AnalysisConfig) -> anyhow::Result<()> {
        if let Some(idle_log) = self.idle_log {
            config.idle_log = Some(idle_log);
            config.idle_power_w = None;
        }
        if let Some(idle_power) = self.idle_power {
            config.idle_power_w = Some(idle_power);
            config.idle_log = None;
        }
        if let Some(warmup) = self.warmup {
            config.warmup_seconds = warmup;
        }
        if let Some(cooldown) = self.cooldown {
            config.cooldown_seconds = cooldown;
        }
        if let Some(policy) = self.policy {
            config.overlap_policy = OverlapPolicy::from_str_loose(&policy).ok_or_else(|| {
                anyhow::anyhow!("unknown overlap policy '{policy}' (expected intersects or proportional)")
            })?;
        }
        Ok(())
    }
}

pub async fn execute(
    mut config: AnalysisConfig,
    overrides: Overrides,
    label: String,
    power: PathBuf,
    requests: PathBuf,
    json: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             token-energy · Run Analysis             ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    overrides.apply(&mut config)?;
    let analyzer = EnergyAnalyzer::new(config)?;

    let idle = analyzer.resolve_idle()?;
    let report = analyzer
        .analyze_run_files(&label, &power, &requests, &idle)
        .map_err(|e| anyhow::anyhow!("analysis of '{label}' failed: {e}"))?;

    println!("  Power log:   {}", power.display());
    println!("  Request log: {}", requests.display());
    println!();
    print_run_report(&report);

    if let Some(path) = json {
        super::write_json(&path, &report.to_json()?)?;
    }
    Ok(())
}

/// Prints the human-readable block for one run.
pub fn print_run_report(report: &RunReport) {
    let r = &report.result;
    let t = &report.tokens;

    // ── Window ─────────────────────────────────────────────────
    println!("  Run: {}", report.label);
    println!(
        "   Window:            [{:.2}, {:.2}] s  ({:.2} s, warmup {:.1} s, cooldown {:.1} s)",
        report.window_start,
        report.window_end,
        report.window_duration_s,
        report.warmup_seconds,
        report.cooldown_seconds,
    );
    println!("   Samples in window: {}", report.samples_in_window);
    match &report.idle_baseline {
        Some(b) => println!("   Idle baseline:     {b}"),
        None => println!("   Idle baseline:     N/A (not subtracted)"),
    }
    println!();

    // ── Requests ───────────────────────────────────────────────
    println!("  Requests ({} policy):", report.overlap_policy.as_str());
    println!(
        "   Requests:          {} ({} successful)",
        t.request_count, t.success_count
    );
    println!("   Prompt tokens:     {}", t.prompt_tokens);
    println!("   Completion tokens: {}", t.completion_tokens);
    println!("   Avg latency:       {} s", fmt_opt(t.avg_latency_s, 3));
    println!(
        "   Avg prefill time:  {} s",
        fmt_opt(r.avg_prefill_time_s, 3)
    );
    println!(
        "   Decode per token:  {} s",
        fmt_opt(r.avg_decode_time_per_token_s, 4)
    );
    println!();

    // ── Energy ─────────────────────────────────────────────────
    println!("  Energy:");
    println!(
        "   Total:             {:.2} J ({:.6} kWh)",
        r.total_energy_j, r.total_energy_kwh
    );
    println!(
        "   Active:            {:.2} J ({:.6} kWh)",
        r.active_energy_j, r.active_energy_kwh
    );
    println!("   Avg / peak power:  {:.2} W / {:.2} W", r.avg_power_w, r.peak_power_w);
    println!("   Energy per token:  {} J", fmt_opt(r.energy_per_token_j, 4));
    println!("   Per 1k tokens:     {} J", fmt_opt(r.energy_per_1k_tokens_j, 2));
    println!(
        "   Per request (avg): {} J",
        fmt_opt(r.mean_energy_per_request_j, 2)
    );
    println!(
        "   Throughput:        {} tokens/s",
        fmt_opt(r.throughput_tokens_per_s, 2)
    );
    if let Some(c) = r.coefficients {
        println!(
            "   Prefill / decode:  {:.4} / {:.4} J per token",
            c.alpha_j_per_prompt_token, c.beta_j_per_completion_token
        );
    }
    println!();

    // ── Hardware ───────────────────────────────────────────────
    println!("  Hardware:");
    println!("   GPU util:          {} %", fmt_opt(r.avg_gpu_util_pct, 1));
    println!("   Memory util:       {} %", fmt_opt(r.avg_mem_util_pct, 1));
    println!("   Memory total:      {} GB", fmt_opt(r.mem_total_gb, 1));
    println!(
        "   Bandwidth util:    {} %",
        fmt_opt(r.mem_bandwidth_util_pct, 1)
    );
    println!("   FLOPs measured:    {}", fmt_opt(r.flops_measured, 0));
    println!(
        "   FLOPs per watt:    {}",
        fmt_opt(r.power_efficiency_flops_per_w, 0)
    );
    println!();

    // ── Environment ────────────────────────────────────────────
    println!("  Environment:");
    println!("   Carbon:            {} gCO2e", fmt_opt(r.carbon_grams, 3));
    println!("   Water:             {} L", fmt_opt(r.water_liters, 4));
    println!();

    super::print_warnings(&report.warnings);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_overrides() -> Overrides {
        Overrides {
            idle_log: None,
            idle_power: None,
            warmup: None,
            cooldown: None,
            policy: None,
        }
    }

    #[test]
    fn test_flags_replace_config_values() {
        let mut config = AnalysisConfig {
            idle_log: Some("idle.csv".into()),
            warmup_seconds: 30.0,
            ..Default::default()
        };
        Overrides {
            idle_power: Some(55.0),
            cooldown: Some(5.0),
            policy: Some("proportional".into()),
            ..no_overrides()
        }
        .apply(&mut config)
        .unwrap();

        assert_eq!(config.idle_power_w, Some(55.0));
        assert!(config.idle_log.is_none());
        assert_eq!(config.warmup_seconds, 30.0);
        assert_eq!(config.cooldown_seconds, 5.0);
        assert_eq!(config.overlap_policy, OverlapPolicy::Proportional);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let mut config = AnalysisConfig::default();
        let overrides = Overrides {
            policy: Some("sometimes".into()),
            ..no_overrides()
        };
        assert!(overrides.apply(&mut config).is_err());
    }
}
