// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end attribution pipeline.
//!
//! These tests write power and request logs to disk, run them through the
//! analyzer, and check the reported energy figures, warnings and campaign
//! regression.

use attribution::{
    AnalysisConfig, AnalysisWarning, AttributionError, EnergyAnalyzer, IdleOutcome, RunReport,
    RunSpec,
};
use power_trace::{BaselineSource, Ordered, PowerError, PowerLog, PowerSample};
use request_trace::{OverlapPolicy, RequestLog, RequestRecord};
use std::path::{Path, PathBuf};

// ── Helpers ────────────────────────────────────────────────────

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("token_energy_it_{name}"));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Writes a constant-power log sampled every `step` seconds over `[start, end]`.
fn write_power_csv(path: &Path, start: f64, end: f64, step: f64, watts: f64) {
    let n = ((end - start) / step).round() as usize;
    let mut csv = String::from("timestamp,power_W,gpu_util,mem_used_bytes,mem_total_bytes\n");
    for i in 0..=n {
        let t = start + i as f64 * step;
        csv.push_str(&format!("{t:.3},{watts:.2},90,42949672960,85899345920\n"));
    }
    std::fs::write(path, csv).unwrap();
}

fn write_request_csv(path: &Path, rows: &[(&str, f64, f64, u64, u64, bool)]) {
    let mut csv = String::from(
        "request_id,timestamp_submitted,timestamp_completed,prompt_tokens,completion_tokens,latency_seconds,success\n",
    );
    for (id, t0, t1, p, c, ok) in rows {
        csv.push_str(&format!("{id},{t0},{t1},{p},{c},{},{ok}\n", t1 - t0));
    }
    std::fs::write(path, csv).unwrap();
}

fn flat_log(start: f64, end: f64, step: f64, watts: f64) -> PowerLog<Ordered> {
    let n = ((end - start) / step).round() as usize;
    PowerLog::new(
        (0..=n)
            .map(|i| PowerSample::new(start + i as f64 * step, watts, 90.0, 0))
            .collect(),
    )
    .into_ordered()
}

fn one_request(prompt: u64, completion: u64) -> RequestLog {
    RequestLog::from_records(vec![RequestRecord {
        request_id: "r".into(),
        timestamp_submitted: 2.0,
        timestamp_completed: 8.0,
        prompt_tokens: prompt,
        completion_tokens: completion,
        latency_seconds: 6.0,
        success: true,
    }])
    .unwrap()
}

/// Runs with a manual idle of 0 W whose active energy is exactly `2·P + 5·G`.
fn synthetic_run(
    analyzer: &EnergyAnalyzer,
    label: &str,
    prompt: u64,
    completion: u64,
) -> RunReport {
    let energy = 2.0 * prompt as f64 + 5.0 * completion as f64;
    let log = flat_log(0.0, 10.0, 0.5, energy / 10.0);
    analyzer
        .analyze_run(label, &log, &one_request(prompt, completion), &IdleOutcome::manual(0.0))
        .unwrap()
}

// ── End-to-end from files ──────────────────────────────────────

#[test]
fn test_csv_to_report() {
    let dir = scratch_dir("csv_to_report");
    let idle = dir.join("idle.csv");
    let power = dir.join("active.csv");
    let requests = dir.join("requests.csv");

    // 20 idle samples at 60 W.
    write_power_csv(&idle, 0.0, 1.9, 0.1, 60.0);
    // 10 s at 300 W.
    write_power_csv(&power, 100.0, 110.0, 0.5, 300.0);
    write_request_csv(
        &requests,
        &[
            ("a", 101.0, 104.0, 200, 250, true),
            ("b", 104.0, 109.0, 300, 250, true),
            ("c", 105.0, 106.0, 50, 0, false),
        ],
    );

    let config = AnalysisConfig {
        idle_log: Some(idle.clone()),
        ..Default::default()
    };
    let analyzer = EnergyAnalyzer::new(config).unwrap();
    let idle_outcome = analyzer.resolve_idle().unwrap();
    let baseline = idle_outcome.baseline().unwrap();
    assert!((baseline.power_w - 60.0).abs() < 1e-9);
    assert!(matches!(
        baseline.source,
        BaselineSource::Measured {
            samples_total: 20,
            samples_used: 18,
            ..
        }
    ));

    let report = analyzer
        .analyze_run_files("e2e", &power, &requests, &idle_outcome)
        .unwrap();

    assert!((report.window_duration_s - 10.0).abs() < 1e-9);
    assert!((report.result.total_energy_j - 3000.0).abs() < 1e-6);
    assert!((report.result.active_energy_j - 2400.0).abs() < 1e-6);
    assert!((report.result.energy_per_token_j.unwrap() - 4.8).abs() < 1e-9);
    assert!((report.result.energy_per_1k_tokens_j.unwrap() - 4800.0).abs() < 1e-6);
    assert!((report.result.throughput_tokens_per_s.unwrap() - 50.0).abs() < 1e-9);
    assert!((report.result.avg_power_w - 300.0).abs() < 1e-9);
    assert_eq!(report.tokens.completion_tokens, 500);
    assert_eq!(report.tokens.request_count, 3);
    assert_eq!(report.tokens.success_count, 2);
    assert!((report.result.mem_total_gb.unwrap() - 80.0).abs() < 1e-9);
    assert!((report.result.avg_mem_util_pct.unwrap() - 50.0).abs() < 1e-9);
    assert!(report.result.carbon_grams.is_none());
    assert!(report.warnings.is_empty());

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["label"], "e2e");
    assert!(json["flops_measured"].is_null());
    assert_eq!(json["per_request"].as_array().unwrap().len(), 2);
}

#[test]
fn test_warmup_consumes_log() {
    let dir = scratch_dir("warmup_consumes_log");
    let power = dir.join("short.csv");
    let requests = dir.join("requests.csv");
    write_power_csv(&power, 0.0, 5.0, 0.5, 300.0);
    write_request_csv(&requests, &[("a", 1.0, 2.0, 10, 10, true)]);

    let config = AnalysisConfig {
        warmup_seconds: 10.0,
        ..Default::default()
    };
    let analyzer = EnergyAnalyzer::new(config).unwrap();
    let err = analyzer
        .analyze_run_files("short", &power, &requests, &IdleOutcome::not_configured())
        .unwrap_err();
    assert!(matches!(
        err,
        AttributionError::Power(PowerError::EmptyWindow { .. })
    ));
}

#[test]
fn test_single_sample_log_rejected() {
    let analyzer = EnergyAnalyzer::new(AnalysisConfig::default()).unwrap();
    let log = PowerLog::new(vec![PowerSample::new(0.0, 300.0, 90.0, 0)]).into_ordered();
    let err = analyzer
        .analyze_run("one", &log, &one_request(1, 1), &IdleOutcome::manual(0.0))
        .unwrap_err();
    assert!(matches!(
        err,
        AttributionError::Power(PowerError::InsufficientData { found: 1 })
    ));
}

// ── Edge cases ─────────────────────────────────────────────────

#[test]
fn test_zero_tokens_reports_na() {
    let analyzer = EnergyAnalyzer::new(AnalysisConfig::default()).unwrap();
    let log = flat_log(0.0, 10.0, 0.5, 300.0);
    let report = analyzer
        .analyze_run("empty", &log, &RequestLog::default(), &IdleOutcome::manual(60.0))
        .unwrap();

    assert!((report.result.active_energy_j - 2400.0).abs() < 1e-6);
    assert!(report.result.energy_per_token_j.is_none());
    assert!(report.result.energy_per_1k_tokens_j.is_none());
    assert!(report.per_request.is_empty());
    assert!(report.warnings.contains(&AnalysisWarning::NoBillableTokens));

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert!(json["energy_per_token_j"].is_null());
}

#[test]
fn test_active_energy_monotone_in_idle_power() {
    let analyzer = EnergyAnalyzer::new(AnalysisConfig::default()).unwrap();
    let log = flat_log(0.0, 10.0, 0.5, 300.0);
    let requests = one_request(100, 500);

    let mut prev = f64::INFINITY;
    for idle in [0.0, 30.0, 60.0, 150.0, 300.0, 450.0] {
        let report = analyzer
            .analyze_run("mono", &log, &requests, &IdleOutcome::manual(idle))
            .unwrap();
        let active = report.result.active_energy_j;
        assert!(active >= 0.0);
        assert!(active <= prev + 1e-9);
        prev = active;
    }
}

#[test]
fn test_proportional_policy_bills_partial_requests() {
    let config = AnalysisConfig {
        warmup_seconds: 2.0,
        cooldown_seconds: 2.0,
        overlap_policy: OverlapPolicy::Proportional,
        ..Default::default()
    };
    let analyzer = EnergyAnalyzer::new(config).unwrap();
    let log = flat_log(0.0, 14.0, 0.5, 200.0);
    let requests = RequestLog::from_records(vec![
        RequestRecord {
            request_id: "edge".into(),
            timestamp_submitted: 0.0,
            timestamp_completed: 4.0,
            prompt_tokens: 100,
            completion_tokens: 100,
            latency_seconds: 4.0,
            success: true,
        },
        RequestRecord {
            request_id: "inside".into(),
            timestamp_submitted: 5.0,
            timestamp_completed: 8.0,
            prompt_tokens: 100,
            completion_tokens: 100,
            latency_seconds: 3.0,
            success: true,
        },
    ])
    .unwrap();
    let report = analyzer
        .analyze_run("prop", &log, &requests, &IdleOutcome::manual(0.0))
        .unwrap();
    assert_eq!(report.tokens.completion_tokens, 150);
    assert!((report.result.total_energy_j - 2000.0).abs() < 1e-6);
}

#[test]
fn test_carbon_and_water_from_config() {
    let config = AnalysisConfig {
        carbon_intensity_g_per_kwh: Some(400.0),
        pue: Some(1.5),
        water_usage_l_per_kwh: Some(2.0),
        ..Default::default()
    };
    let analyzer = EnergyAnalyzer::new(config).unwrap();
    // 3600 s at 1000 W = 1 kWh.
    let log = flat_log(0.0, 3600.0, 10.0, 1000.0);
    let report = analyzer
        .analyze_run("kwh", &log, &one_request(10, 10), &IdleOutcome::manual(0.0))
        .unwrap();
    assert!((report.result.total_energy_kwh - 1.0).abs() < 1e-9);
    assert!((report.result.carbon_grams.unwrap() - 600.0).abs() < 1e-6);
    assert!((report.result.water_liters.unwrap() - 2.0).abs() < 1e-9);
}

#[test]
fn test_bandwidth_estimate_uses_log_peak() {
    let config = AnalysisConfig {
        model_parameter_count: Some(1_000_000_000),
        bytes_per_parameter: Some(1.0),
        ..Default::default()
    };
    let analyzer = EnergyAnalyzer::new(config).unwrap();
    let log = flat_log(0.0, 10.0, 0.5, 300.0).with_peak_bandwidth(1e12);
    // 2 · 500 tokens · 1e9 B / 10 s = 1e11 B/s.
    let report = analyzer
        .analyze_run("bw", &log, &one_request(100, 400), &IdleOutcome::manual(0.0))
        .unwrap();
    assert!((report.result.mem_bandwidth_util_pct.unwrap() - 10.0).abs() < 1e-9);
}

// ── Campaigns ──────────────────────────────────────────────────

#[test]
fn test_campaign_recovers_coefficients() {
    let analyzer = EnergyAnalyzer::new(AnalysisConfig::default()).unwrap();
    let outcomes = [("a", 100, 50), ("b", 200, 300), ("c", 50, 400), ("d", 400, 100)]
        .into_iter()
        .map(|(label, p, c)| (label.to_string(), Ok(synthetic_run(&analyzer, label, p, c))))
        .collect();

    let campaign = analyzer.analyze_campaign(outcomes);
    let fit = campaign.fit.as_ref().unwrap();
    assert!((fit.coefficients.alpha_j_per_prompt_token - 2.0).abs() < 1e-6);
    assert!((fit.coefficients.beta_j_per_completion_token - 5.0).abs() < 1e-6);
    assert!((fit.r_squared - 1.0).abs() < 1e-9);
    assert!(campaign.warnings.is_empty());
    assert!(campaign
        .runs
        .iter()
        .all(|r| r.result.coefficients == Some(fit.coefficients)));
}

#[test]
fn test_campaign_collinear_falls_back() {
    let analyzer = EnergyAnalyzer::new(AnalysisConfig::default()).unwrap();
    let outcomes = vec![
        ("x".to_string(), Ok(synthetic_run(&analyzer, "x", 1000, 2000))),
        ("y".to_string(), Ok(synthetic_run(&analyzer, "y", 2000, 4000))),
        (
            "z".to_string(),
            Err(AttributionError::Power(PowerError::InsufficientData { found: 0 })),
        ),
    ];
    let campaign = analyzer.analyze_campaign(outcomes);

    assert!(campaign.fit.is_none());
    assert_eq!(campaign.runs.len(), 2);
    assert_eq!(campaign.failed.len(), 1);
    assert_eq!(campaign.failed[0].label, "z");
    assert!(campaign.runs.iter().all(|r| r.result.coefficients.is_none()));
    assert!(campaign.runs[0].result.energy_per_token_j.is_some());
    match &campaign.warnings[0] {
        AnalysisWarning::RegressionAbandoned { runs, .. } => {
            assert_eq!(runs, &vec!["x".to_string(), "y".to_string()]);
        }
        other => panic!("unexpected warning: {other:?}"),
    }
}

#[test]
fn test_campaign_from_config_files() {
    let dir = scratch_dir("campaign_files");
    let mut runs = Vec::new();
    for (label, p, c) in [("short", 100u64, 50u64), ("long", 50, 400), ("mixed", 200, 300)] {
        let energy = 2.0 * p as f64 + 5.0 * c as f64;
        let power = dir.join(format!("{label}_power.csv"));
        let requests = dir.join(format!("{label}_requests.csv"));
        write_power_csv(&power, 0.0, 10.0, 0.5, energy / 10.0);
        write_request_csv(&requests, &[("r", 2.0, 8.0, p, c, true)]);
        runs.push(RunSpec {
            label: label.into(),
            power_log: power,
            request_log: requests,
        });
    }
    let config = AnalysisConfig {
        idle_power_w: Some(0.0),
        runs,
        ..Default::default()
    };
    let analyzer = EnergyAnalyzer::new(config).unwrap();
    let idle = analyzer.resolve_idle().unwrap();
    let campaign = analyzer.run_campaign(&idle);

    assert_eq!(campaign.runs.len(), 3);
    let fit = campaign.fit.unwrap();
    assert!((fit.coefficients.alpha_j_per_prompt_token - 2.0).abs() < 1e-4);
    assert!((fit.coefficients.beta_j_per_completion_token - 5.0).abs() < 1e-4);
}
