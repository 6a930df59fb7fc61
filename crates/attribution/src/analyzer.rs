// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The attribution pipeline.
//!
//! ```text
//! power log ──► select_window ──► integrate ──► total energy
//!                    │                              │
//!                    ▼                              ▼
//! request log ──► aggregate ──► tokens     idle subtraction ──► active energy
//!                                   │                              │
//!                                   └──────────► energy per token ◄┘
//!                                                       │
//!                                                       ▼
//!                                                  RunReport
//! ```
//!
//! Every run re-derives its own window from its own power log, so
//! concurrent analyses share nothing but the immutable configuration.

use crate::attributor::{active_energy, energy_per_token, mean_request_energy, per_request_energy};
use crate::derived;
use crate::regression::{fit_coefficients, RunObservation};
use crate::report::{
    AnalysisWarning, AttributionResult, CampaignReport, FailedRun, RunReport, TokenCounts,
};
use crate::{AnalysisConfig, AttributionError};
use power_trace::{
    estimate_idle, integrate, read_power_log, select_window, window_utilisation, BaselineParams,
    IdleBaseline, Ordered, PowerError, PowerLog,
};
use request_trace::{aggregate, read_request_log, RequestLog};
use std::path::Path;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

// ── Idle baseline resolution ───────────────────────────────────

/// The idle baseline applied to a run, or why there is none.
#[derive(Debug, Clone, PartialEq)]
pub enum IdleOutcome {
    /// Idle power is subtracted from window energy.
    Applied(IdleBaseline),
    /// No subtraction; active energy equals total energy.
    Skipped { reason: String },
}

impl IdleOutcome {
    /// Estimates the baseline from an idle log.
    ///
    /// Too few samples after trimming downgrades to [`IdleOutcome::Skipped`]
    /// rather than failing the analysis.
    pub fn from_log(
        log: &PowerLog<Ordered>,
        params: &BaselineParams,
        path: Option<&str>,
    ) -> Result<Self, AttributionError> {
        match estimate_idle(log, params) {
            Ok(baseline) => Ok(Self::Applied(match path {
                Some(p) => baseline.with_path(p),
                None => baseline,
            })),
            Err(e @ PowerError::InsufficientIdleSamples { .. }) => {
                tracing::warn!("skipping idle subtraction: {e}");
                Ok(Self::Skipped {
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// An operator-supplied idle power.
    pub fn manual(power_w: f64) -> Self {
        Self::Applied(IdleBaseline::manual(power_w))
    }

    /// No idle source configured.
    pub fn not_configured() -> Self {
        Self::Skipped {
            reason: "no idle log or idle power configured".to_string(),
        }
    }

    /// The applied baseline, if any.
    pub fn baseline(&self) -> Option<&IdleBaseline> {
        match self {
            Self::Applied(b) => Some(b),
            Self::Skipped { .. } => None,
        }
    }
}

// ── Analyzer ───────────────────────────────────────────────────

/// Attributes window energy to tokens according to an [`AnalysisConfig`].
///
/// # Example
/// ```no_run
/// use attribution::{AnalysisConfig, EnergyAnalyzer};
/// use std::path::Path;
///
/// # fn example() -> Result<(), attribution::AttributionError> {
/// let analyzer = EnergyAnalyzer::new(AnalysisConfig::default())?;
/// let idle = analyzer.resolve_idle()?;
/// let report = analyzer.analyze_run_files(
///     "baseline",
///     Path::new("power.csv"),
///     Path::new("requests.csv"),
///     &idle,
/// )?;
/// println!("{}", report.summary());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EnergyAnalyzer {
    config: AnalysisConfig,
}

impl EnergyAnalyzer {
    /// Creates an analyzer after validating `config`.
    pub fn new(config: AnalysisConfig) -> Result<Self, AttributionError> {
        config.validate()?;
        tracing::debug!(
            "analyzer created: warmup={}s cooldown={}s policy={}",
            config.warmup_seconds,
            config.cooldown_seconds,
            config.overlap_policy.as_str()
        );
        Ok(Self { config })
    }

    /// The analyzer's configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Resolves the idle baseline from the configured idle log or manual power.
    pub fn resolve_idle(&self) -> Result<IdleOutcome, AttributionError> {
        if let Some(power_w) = self.config.idle_power_w {
            tracing::info!("using manual idle power {power_w:.2} W");
            return Ok(IdleOutcome::manual(power_w));
        }
        let Some(path) = &self.config.idle_log else {
            tracing::warn!("no idle baseline configured; active energy equals total energy");
            return Ok(IdleOutcome::not_configured());
        };
        let log = read_power_log(path)?.into_ordered();
        IdleOutcome::from_log(
            &log,
            &self.config.baseline_params(),
            Some(&path.display().to_string()),
        )
    }

    /// Reads both logs from disk and analyses the run.
    pub fn analyze_run_files(
        &self,
        label: &str,
        power_log: &Path,
        request_log: &Path,
        idle: &IdleOutcome,
    ) -> Result<RunReport, AttributionError> {
        let power = read_power_log(power_log)?.into_ordered();
        let requests = read_request_log(request_log)?;
        self.analyze_run(label, &power, &requests, idle)
    }

    /// Analyses one run.
    ///
    /// # Errors
    /// Fatal input problems abort the run: a power log with fewer than two
    /// samples, or warmup plus cooldown consuming the whole log. Zero
    /// tokens, too few in-window samples, and a missing baseline are
    /// reported as warnings on the returned report.
    pub fn analyze_run(
        &self,
        label: &str,
        power: &PowerLog<Ordered>,
        requests: &RequestLog,
        idle: &IdleOutcome,
    ) -> Result<RunReport, AttributionError> {
        let cfg = &self.config;
        power.require_integrable()?;

        let window = select_window(power, cfg.warmup_seconds, cfg.cooldown_seconds)?;
        let duration = window.duration();
        tracing::debug!("{label}: window {window}");

        let integration = integrate(power, &window)?;
        let utilisation = window_utilisation(power, &window);
        let tokens = aggregate(requests, &window, cfg.overlap_policy);

        let mut warnings = Vec::new();
        if integration.insufficient_samples {
            warnings.push(AnalysisWarning::InsufficientSamples {
                samples_in_window: integration.samples_in_window,
            });
        }

        // ── Idle subtraction ──
        let (idle_power_w, idle_baseline) = match idle {
            IdleOutcome::Applied(b) => (b.power_w, Some(b.clone())),
            IdleOutcome::Skipped { reason } => {
                warnings.push(AnalysisWarning::IdleBaselineSkipped {
                    reason: reason.clone(),
                });
                (0.0, None)
            }
        };
        let active = active_energy(integration.energy_j, idle_power_w, duration);
        if active.clamped && !integration.insufficient_samples {
            warnings.push(AnalysisWarning::ActiveEnergyClamped {
                total_energy_j: integration.energy_j,
                idle_energy_j: active.idle_energy_j,
            });
        }

        // ── Per-token attribution ──
        let per_token = energy_per_token(active.energy_j, tokens.total_completion_tokens);
        let energy_per_token_j = match per_token {
            Ok(_) if integration.insufficient_samples => None,
            Ok(e) => Some(e),
            Err(AttributionError::DivisionByZeroTokens) => {
                tracing::warn!("{label}: no completion tokens in window");
                warnings.push(AnalysisWarning::NoBillableTokens);
                None
            }
            Err(e) => return Err(e),
        };
        let per_request = energy_per_token_j
            .map(|e| per_request_energy(e, &tokens))
            .unwrap_or_default();

        // ── Derived metrics ──
        let peak_bandwidth = cfg
            .peak_bandwidth_bytes_per_s
            .or(power.peak_bandwidth_bytes_per_s);
        let mem_bandwidth_util_pct = derived::mem_bandwidth_util_pct(
            tokens.total_tokens(),
            cfg.model_parameter_bytes(),
            duration,
            peak_bandwidth,
        );
        if let Some(pct) = mem_bandwidth_util_pct.filter(|p| *p > 100.0) {
            warnings.push(AnalysisWarning::BandwidthAbovePeak { pct });
        }
        let (avg_prefill_time_s, avg_decode_time_per_token_s) = derived::latency_split(
            tokens.avg_latency_seconds,
            tokens.avg_completion_tokens(),
            cfg.prefill_latency_fraction,
        );

        let result = AttributionResult {
            total_energy_j: integration.energy_j,
            total_energy_kwh: derived::joules_to_kwh(integration.energy_j),
            active_energy_j: active.energy_j,
            active_energy_kwh: derived::joules_to_kwh(active.energy_j),
            idle_power_w,
            energy_per_token_j,
            energy_per_1k_tokens_j: derived::energy_per_1k_tokens(energy_per_token_j),
            throughput_tokens_per_s: derived::throughput(tokens.total_completion_tokens, duration),
            avg_power_w: integration.avg_power_w,
            peak_power_w: integration.peak_power_w,
            mem_bandwidth_util_pct,
            coefficients: None,
            carbon_grams: derived::carbon_grams(
                integration.energy_j,
                cfg.carbon_intensity_g_per_kwh,
                cfg.pue,
            ),
            water_liters: derived::water_liters(integration.energy_j, cfg.water_usage_l_per_kwh),
            avg_gpu_util_pct: utilisation.mean_gpu_util_pct,
            avg_mem_util_pct: utilisation.mean_mem_util_pct,
            mem_total_gb: power.memory_capacity_bytes.map(|b| b as f64 / BYTES_PER_GIB),
            avg_prefill_time_s,
            avg_decode_time_per_token_s,
            mean_energy_per_request_j: mean_request_energy(&per_request),
            flops_measured: None,
            power_efficiency_flops_per_w: None,
        };

        let report = RunReport {
            label: label.to_string(),
            window_start: window.start,
            window_end: window.end,
            window_duration_s: duration,
            warmup_seconds: cfg.warmup_seconds,
            cooldown_seconds: cfg.cooldown_seconds,
            samples_in_window: integration.samples_in_window,
            overlap_policy: cfg.overlap_policy,
            idle_baseline,
            tokens: TokenCounts {
                prompt_tokens: tokens.total_prompt_tokens,
                completion_tokens: tokens.total_completion_tokens,
                request_count: tokens.request_count,
                success_count: tokens.success_count,
                avg_latency_s: tokens.avg_latency_seconds,
            },
            result,
            per_request,
            warnings,
        };
        tracing::info!("{}", report.summary());
        Ok(report)
    }

    // ── Campaigns ──────────────────────────────────────────────

    /// Analyses every configured run sequentially and fits coefficients.
    pub fn run_campaign(&self, idle: &IdleOutcome) -> CampaignReport {
        let outcomes = self
            .config
            .runs
            .iter()
            .map(|run| {
                let outcome =
                    self.analyze_run_files(&run.label, &run.power_log, &run.request_log, idle);
                (run.label.clone(), outcome)
            })
            .collect();
        self.analyze_campaign(outcomes)
    }

    /// Fits prefill/decode coefficients over already-analysed runs.
    ///
    /// Failed runs are listed and excluded. If the regression cannot be
    /// fitted, the per-run aggregates stand alone with a warning naming the
    /// runs involved.
    pub fn analyze_campaign(
        &self,
        outcomes: Vec<(String, Result<RunReport, AttributionError>)>,
    ) -> CampaignReport {
        let mut runs = Vec::new();
        let mut failed = Vec::new();
        for (label, outcome) in outcomes {
            match outcome {
                Ok(report) => runs.push(report),
                Err(e) => {
                    tracing::warn!("run '{label}' failed: {e}");
                    failed.push(FailedRun {
                        label,
                        error: e.to_string(),
                    });
                }
            }
        }

        let mut warnings = Vec::new();
        let observations: Vec<RunObservation> = runs
            .iter()
            .filter(|r| {
                if r.energy_measured() {
                    return true;
                }
                tracing::warn!(
                    "run '{}' excluded from regression: too few samples in window",
                    r.label
                );
                warnings.push(AnalysisWarning::RunExcludedFromRegression {
                    run: r.label.clone(),
                    reason: "too few power samples in window".to_string(),
                });
                false
            })
            .map(|r| RunObservation {
                label: r.label.clone(),
                prompt_tokens: r.tokens.prompt_tokens,
                completion_tokens: r.tokens.completion_tokens,
                active_energy_j: r.result.active_energy_j,
            })
            .collect();

        let fit = match fit_coefficients(&observations, self.config.condition_threshold) {
            Ok(fit) => {
                for run in &mut runs {
                    run.result.coefficients = Some(fit.coefficients);
                }
                Some(fit)
            }
            Err(e) => {
                tracing::warn!("regression abandoned: {e}");
                warnings.push(AnalysisWarning::RegressionAbandoned {
                    reason: e.to_string(),
                    runs: observations.iter().map(|o| o.label.clone()).collect(),
                });
                None
            }
        };

        CampaignReport {
            runs,
            failed,
            fit,
            warnings,
        }
    }
}
