// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Analysis configuration loaded from TOML files or constructed programmatically.
//!
//! Every parameter the engine uses arrives through [`AnalysisConfig`]; there
//! is no process-wide default idle power or emission factor.
//!
//! # TOML Format
//! ```toml
//! warmup_seconds = 30.0
//! cooldown_seconds = 10.0
//! idle_log = "./results/idle.csv"
//! carbon_intensity_g_per_kwh = 385.0
//! pue = 1.2
//! model_parameter_count = 8030000000
//! bytes_per_parameter = 2.0
//! peak_bandwidth_bytes_per_s = 2.0e12
//! overlap_policy = "intersects"
//!
//! [[runs]]
//! label = "short-prompts"
//! power_log = "./results/short/active.csv"
//! request_log = "./results/short/requests.csv"
//! ```

use crate::regression::DEFAULT_CONDITION_THRESHOLD;
use power_trace::baseline::{BaselineParams, DEFAULT_MIN_IDLE_SAMPLES, DEFAULT_TRIM_FRACTION};
use request_trace::OverlapPolicy;
use std::path::{Path, PathBuf};

/// Default share of mean latency attributed to prefill.
pub const DEFAULT_PREFILL_LATENCY_FRACTION: f64 = 0.2;

/// One workload run in a regression campaign.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunSpec {
    /// Human-readable run name used in reports and warnings.
    pub label: String,
    /// Power log captured during the run.
    pub power_log: PathBuf,
    /// Request log captured during the run.
    pub request_log: PathBuf,
}

/// Configuration for an attribution analysis.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisConfig {
    /// Seconds dropped from the start of each power log.
    #[serde(default)]
    pub warmup_seconds: f64,
    /// Seconds dropped from the end of each power log.
    #[serde(default)]
    pub cooldown_seconds: f64,
    /// Idle power log used to estimate the baseline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_log: Option<PathBuf>,
    /// Operator-supplied idle power in watts (instead of `idle_log`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_power_w: Option<f64>,
    /// Fraction of idle samples dropped from each end.
    #[serde(default = "default_trim_fraction")]
    pub idle_trim_fraction: f64,
    /// Minimum idle samples that must survive trimming.
    #[serde(default = "default_min_idle_samples")]
    pub min_idle_samples: usize,
    /// Grid carbon intensity in gCO2e/kWh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbon_intensity_g_per_kwh: Option<f64>,
    /// Facility power usage effectiveness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pue: Option<f64>,
    /// Site water usage in litres per kWh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_usage_l_per_kwh: Option<f64>,
    /// Model parameter count, for bandwidth estimation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_parameter_count: Option<u64>,
    /// Bytes per parameter (2 for bf16, 1 for fp8).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_per_parameter: Option<f64>,
    /// Theoretical peak memory bandwidth in bytes/s; overrides the log's value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_bandwidth_bytes_per_s: Option<f64>,
    /// Billing of requests spanning a window edge.
    #[serde(default)]
    pub overlap_policy: OverlapPolicy,
    /// Largest acceptable condition number of the normal-equations matrix.
    #[serde(default = "default_condition_threshold")]
    pub condition_threshold: f64,
    /// Share of mean latency attributed to prefill.
    #[serde(default = "default_prefill_latency_fraction")]
    pub prefill_latency_fraction: f64,
    /// Runs for prefill/decode regression.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runs: Vec<RunSpec>,
}

fn default_trim_fraction() -> f64 {
    DEFAULT_TRIM_FRACTION
}

fn default_min_idle_samples() -> usize {
    DEFAULT_MIN_IDLE_SAMPLES
}

fn default_condition_threshold() -> f64 {
    DEFAULT_CONDITION_THRESHOLD
}

fn default_prefill_latency_fraction() -> f64 {
    DEFAULT_PREFILL_LATENCY_FRACTION
}

impl AnalysisConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Relative paths inside the file are resolved against the file's
    /// directory.
    pub fn from_file(path: &Path) -> Result<Self, crate::AttributionError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::AttributionError::ConfigError(format!(
                "cannot read config '{}': {e}",
                path.display()
            ))
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, crate::AttributionError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| {
            crate::AttributionError::ConfigError(format!("TOML parse error: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, crate::AttributionError> {
        toml::to_string_pretty(self).map_err(|e| {
            crate::AttributionError::ConfigError(format!("TOML serialise error: {e}"))
        })
    }

    /// Rejects parameter combinations the engine cannot use.
    pub fn validate(&self) -> Result<(), crate::AttributionError> {
        let err = |msg: String| Err(crate::AttributionError::ConfigError(msg));

        for (name, value) in [
            ("warmup_seconds", self.warmup_seconds),
            ("cooldown_seconds", self.cooldown_seconds),
        ] {
            if !value.is_finite() || value < 0.0 {
                return err(format!("{name} must be >= 0, got {value}"));
            }
        }
        if self.idle_log.is_some() && self.idle_power_w.is_some() {
            return err("set either idle_log or idle_power_w, not both".into());
        }
        if let Some(p) = self.idle_power_w {
            if !p.is_finite() || p < 0.0 {
                return err(format!("idle_power_w must be >= 0, got {p}"));
            }
        }
        if !(0.0..0.5).contains(&self.idle_trim_fraction) {
            return err(format!(
                "idle_trim_fraction must be in [0, 0.5), got {}",
                self.idle_trim_fraction
            ));
        }
        if let Some(pue) = self.pue {
            if !(pue > 0.0) {
                return err(format!("pue must be > 0, got {pue}"));
            }
        }
        for (name, value) in [
            ("carbon_intensity_g_per_kwh", self.carbon_intensity_g_per_kwh),
            ("water_usage_l_per_kwh", self.water_usage_l_per_kwh),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return err(format!("{name} must be >= 0, got {v}"));
                }
            }
        }
        for (name, value) in [
            ("bytes_per_parameter", self.bytes_per_parameter),
            ("peak_bandwidth_bytes_per_s", self.peak_bandwidth_bytes_per_s),
        ] {
            if let Some(v) = value {
                if !(v > 0.0) {
                    return err(format!("{name} must be > 0, got {v}"));
                }
            }
        }
        if !(self.condition_threshold > 0.0) {
            return err(format!(
                "condition_threshold must be > 0, got {}",
                self.condition_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.prefill_latency_fraction) {
            return err(format!(
                "prefill_latency_fraction must be in [0, 1], got {}",
                self.prefill_latency_fraction
            ));
        }
        Ok(())
    }

    /// Idle baseline tuning derived from this config.
    pub fn baseline_params(&self) -> BaselineParams {
        BaselineParams {
            trim_fraction: self.idle_trim_fraction,
            min_samples: self.min_idle_samples,
        }
    }

    /// Model weight footprint in bytes, when both inputs are configured.
    pub fn model_parameter_bytes(&self) -> Option<f64> {
        crate::derived::model_parameter_bytes(self.model_parameter_count, self.bytes_per_parameter)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(idle) = self.idle_log.as_mut() {
            resolve(idle);
        }
        for run in &mut self.runs {
            resolve(&mut run.power_log);
            resolve(&mut run.request_log);
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            warmup_seconds: 0.0,
            cooldown_seconds: 0.0,
            idle_log: None,
            idle_power_w: None,
            idle_trim_fraction: DEFAULT_TRIM_FRACTION,
            min_idle_samples: DEFAULT_MIN_IDLE_SAMPLES,
            carbon_intensity_g_per_kwh: None,
            pue: None,
            water_usage_l_per_kwh: None,
            model_parameter_count: None,
            bytes_per_parameter: None,
            peak_bandwidth_bytes_per_s: None,
            overlap_policy: OverlapPolicy::Intersects,
            condition_threshold: DEFAULT_CONDITION_THRESHOLD,
            prefill_latency_fraction: DEFAULT_PREFILL_LATENCY_FRACTION,
            runs: Vec::new(),
        }
    }
}
