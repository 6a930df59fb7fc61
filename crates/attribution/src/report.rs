// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Attribution results and their human-readable rendering.
//!
//! Undefined metrics are carried as `None` in memory, `null` in JSON, and
//! "N/A" in text. They are never rendered as zero.

use crate::attributor::RequestEnergy;
use crate::regression::{CoefficientSet, RegressionFit};
use power_trace::IdleBaseline;
use std::fmt;

/// A non-fatal condition encountered during analysis.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisWarning {
    /// Fewer than two samples fell inside the window; energy is reported as zero.
    InsufficientSamples { samples_in_window: usize },
    /// No idle baseline was applied; active energy equals total energy.
    IdleBaselineSkipped { reason: String },
    /// Idle energy exceeded window energy; active energy was clamped to zero.
    ActiveEnergyClamped {
        total_energy_j: f64,
        idle_energy_j: f64,
    },
    /// Zero completion tokens in the window; per-token metrics are N/A.
    NoBillableTokens,
    /// Estimated bandwidth exceeds the stated peak.
    BandwidthAbovePeak { pct: f64 },
    /// The run's window energy could not be measured, so it is left out of the fit.
    RunExcludedFromRegression { run: String, reason: String },
    /// The campaign regression was abandoned; per-run aggregates are reported.
    RegressionAbandoned { reason: String, runs: Vec<String> },
}

impl fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientSamples { samples_in_window } => write!(
                f,
                "only {samples_in_window} sample(s) in window; energy reported as 0"
            ),
            Self::IdleBaselineSkipped { reason } => {
                write!(f, "idle subtraction skipped: {reason}")
            }
            Self::ActiveEnergyClamped {
                total_energy_j,
                idle_energy_j,
            } => write!(
                f,
                "idle energy {idle_energy_j:.1} J exceeds window energy {total_energy_j:.1} J; \
                 active energy clamped to 0"
            ),
            Self::NoBillableTokens => {
                write!(f, "no completion tokens in window; per-token metrics unavailable")
            }
            Self::BandwidthAbovePeak { pct } => write!(
                f,
                "estimated bandwidth {pct:.1}% exceeds theoretical peak"
            ),
            Self::RunExcludedFromRegression { run, reason } => {
                write!(f, "run '{run}' excluded from regression: {reason}")
            }
            Self::RegressionAbandoned { reason, runs } => write!(
                f,
                "regression abandoned ({reason}); reporting per-run aggregates for {}",
                runs.join(", ")
            ),
        }
    }
}

/// Energy and efficiency metrics for one window.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AttributionResult {
    pub total_energy_j: f64,
    pub total_energy_kwh: f64,
    pub active_energy_j: f64,
    pub active_energy_kwh: f64,
    pub idle_power_w: f64,
    pub energy_per_token_j: Option<f64>,
    pub energy_per_1k_tokens_j: Option<f64>,
    pub throughput_tokens_per_s: Option<f64>,
    pub avg_power_w: f64,
    pub peak_power_w: f64,
    pub mem_bandwidth_util_pct: Option<f64>,
    /// Set only after a successful campaign regression.
    pub coefficients: Option<CoefficientSet>,
    pub carbon_grams: Option<f64>,
    pub water_liters: Option<f64>,
    pub avg_gpu_util_pct: Option<f64>,
    pub avg_mem_util_pct: Option<f64>,
    /// Declared device memory in GiB (1024³ bytes).
    pub mem_total_gb: Option<f64>,
    pub avg_prefill_time_s: Option<f64>,
    pub avg_decode_time_per_token_s: Option<f64>,
    pub mean_energy_per_request_j: Option<f64>,
    /// Hardware FLOP counters are not sampled; always `None`.
    pub flops_measured: Option<f64>,
    /// Always `None` while `flops_measured` is.
    pub power_efficiency_flops_per_w: Option<f64>,
}

/// Token and request counts for the window.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TokenCounts {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub request_count: usize,
    pub success_count: usize,
    pub avg_latency_s: Option<f64>,
}

/// Everything produced by analysing one run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RunReport {
    pub label: String,
    pub window_start: f64,
    pub window_end: f64,
    pub window_duration_s: f64,
    pub warmup_seconds: f64,
    pub cooldown_seconds: f64,
    pub samples_in_window: usize,
    pub overlap_policy: request_trace::OverlapPolicy,
    /// `None` when idle subtraction was skipped.
    pub idle_baseline: Option<IdleBaseline>,
    pub tokens: TokenCounts,
    #[serde(flatten)]
    pub result: AttributionResult,
    pub per_request: Vec<RequestEnergy>,
    pub warnings: Vec<AnalysisWarning>,
}

impl RunReport {
    /// False when too few samples fell in the window to measure its energy.
    pub fn energy_measured(&self) -> bool {
        !self
            .warnings
            .iter()
            .any(|w| matches!(w, AnalysisWarning::InsufficientSamples { .. }))
    }

    /// One-line summary.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} completion tokens over {:.1}s, active {:.1} J, {} J/token",
            self.label,
            self.tokens.completion_tokens,
            self.window_duration_s,
            self.result.active_energy_j,
            fmt_opt(self.result.energy_per_token_j, 4),
        )
    }

    /// Serialises the report to pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A run that could not be analysed.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FailedRun {
    pub label: String,
    pub error: String,
}

/// Results of a multi-run regression campaign.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CampaignReport {
    pub runs: Vec<RunReport>,
    pub failed: Vec<FailedRun>,
    /// `None` when the regression was abandoned.
    pub fit: Option<RegressionFit>,
    pub warnings: Vec<AnalysisWarning>,
}

impl CampaignReport {
    /// One-line summary.
    pub fn summary(&self) -> String {
        let fit = match &self.fit {
            Some(fit) => fit.summary(),
            None => "no regression".to_string(),
        };
        format!(
            "{} runs analysed, {} failed; {fit}",
            self.runs.len(),
            self.failed.len()
        )
    }

    /// Serialises the report to pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Formats an optional metric with `precision` decimals, or "N/A".
pub fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "N/A".to_string(),
    }
}
