// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Idle baseline estimation.
//!
//! Idle power is assumed stationary, so the baseline is a plain mean of the
//! sample powers rather than an integral divided by duration. The first and
//! last few samples are discarded to drop logger startup and shutdown
//! transients.
//!
//! An [`IdleBaseline`] is an ordinary value: callers pass it explicitly into
//! every analysis, so concurrent analyses with different baselines never
//! interfere.

use crate::{Ordered, PowerError, PowerLog};
use std::fmt;

/// Default fraction of samples discarded from each end of an idle log.
pub const DEFAULT_TRIM_FRACTION: f64 = 0.05;

/// Default minimum number of samples that must survive trimming.
pub const DEFAULT_MIN_IDLE_SAMPLES: usize = 10;

/// Tuning for [`estimate_idle`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BaselineParams {
    /// Fraction of samples (by count) dropped from each end, in `[0, 0.5)`.
    pub trim_fraction: f64,
    /// Minimum samples required after trimming.
    pub min_samples: usize,
}

impl Default for BaselineParams {
    fn default() -> Self {
        Self {
            trim_fraction: DEFAULT_TRIM_FRACTION,
            min_samples: DEFAULT_MIN_IDLE_SAMPLES,
        }
    }
}

/// Where an idle baseline came from.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaselineSource {
    /// Estimated from an idle power log.
    Measured {
        /// Path of the idle log, when it was read from disk.
        path: Option<String>,
        /// Samples in the idle log.
        samples_total: usize,
        /// Samples averaged after trimming.
        samples_used: usize,
    },
    /// Supplied directly by the operator.
    Manual,
}

/// A representative idle power draw and its provenance.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct IdleBaseline {
    /// Idle power in watts.
    pub power_w: f64,
    /// Provenance of the value.
    pub source: BaselineSource,
}

impl IdleBaseline {
    /// A baseline supplied by the operator instead of measured.
    pub fn manual(power_w: f64) -> Self {
        Self {
            power_w,
            source: BaselineSource::Manual,
        }
    }

    /// Attaches the idle log's path to a measured baseline.
    pub fn with_path(mut self, idle_log: impl Into<String>) -> Self {
        if let BaselineSource::Measured { path, .. } = &mut self.source {
            *path = Some(idle_log.into());
        }
        self
    }
}

impl fmt::Display for IdleBaseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            BaselineSource::Measured {
                path,
                samples_total,
                samples_used,
            } => write!(
                f,
                "{:.2} W (mean of {samples_used}/{samples_total} samples from {})",
                self.power_w,
                path.as_deref().unwrap_or("<in-memory log>"),
            ),
            BaselineSource::Manual => write!(f, "{:.2} W (manual)", self.power_w),
        }
    }
}

/// Reduces an idle power log to a single representative power value.
///
/// Drops `floor(n · trim_fraction)` samples from each end, then averages
/// the remaining sample powers.
///
/// # Errors
/// - [`PowerError::InvalidParameter`] if `trim_fraction` is outside `[0, 0.5)`.
/// - [`PowerError::InsufficientIdleSamples`] if fewer than
///   `params.min_samples` samples remain after trimming.
pub fn estimate_idle(
    log: &PowerLog<Ordered>,
    params: &BaselineParams,
) -> Result<IdleBaseline, PowerError> {
    if !(0.0..0.5).contains(&params.trim_fraction) {
        return Err(PowerError::InvalidParameter(format!(
            "idle trim fraction must be in [0, 0.5), got {}",
            params.trim_fraction
        )));
    }

    let samples = log.samples();
    let n = samples.len();
    let trim = (n as f64 * params.trim_fraction).floor() as usize;
    let kept = &samples[trim..n - trim];

    if kept.len() < params.min_samples.max(1) {
        return Err(PowerError::InsufficientIdleSamples {
            remaining: kept.len(),
            required: params.min_samples.max(1),
        });
    }

    let power_w = kept.iter().map(|s| s.power_watts).sum::<f64>() / kept.len() as f64;
    tracing::info!(
        "idle baseline {power_w:.2} W from {} of {n} samples",
        kept.len()
    );

    Ok(IdleBaseline {
        power_w,
        source: BaselineSource::Measured {
            path: None,
            samples_total: n,
            samples_used: kept.len(),
        },
    })
}
