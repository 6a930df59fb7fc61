// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Trapezoidal energy integration over irregularly sampled power.
//!
//! The log is first clipped to the requested window. When a window boundary
//! falls strictly between two samples, the power at that instant is linearly
//! interpolated and inserted as a synthetic sample, so the integral covers
//! exactly the window and nothing outside it. Energy is then
//!
//! ```text
//! E = Σ (P_i + P_{i+1}) / 2 · (t_{i+1} - t_i)
//! ```
//!
//! over consecutive clipped samples. Samples sharing a timestamp form
//! zero-width intervals and contribute nothing.

use crate::{MeasurementWindow, Ordered, PowerError, PowerLog, PowerSample};

/// Result of integrating a power log over a window.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Integration {
    /// Energy over the covered span in joules.
    pub energy_j: f64,
    /// `energy_j / covered_seconds`, or 0 when nothing could be integrated.
    pub avg_power_w: f64,
    /// Highest power among the clipped samples.
    pub peak_power_w: f64,
    /// Start of the span actually integrated (window ∩ log domain).
    pub covered_start: f64,
    /// End of the span actually integrated.
    pub covered_end: f64,
    /// Number of logged (non-interpolated) samples inside the window.
    pub samples_in_window: usize,
    /// Set when fewer than two logged samples fall inside the window.
    pub insufficient_samples: bool,
}

impl Integration {
    /// Length of the integrated span in seconds.
    pub fn covered_seconds(&self) -> f64 {
        self.covered_end - self.covered_start
    }
}

/// Integrates `log` over `window` with the trapezoidal rule.
///
/// A window that only partially overlaps the log is integrated over the
/// intersection; `avg_power_w` is then relative to the intersection length.
///
/// # Errors
/// - [`PowerError::InsufficientData`] if the log is empty.
/// - [`PowerError::OutOfRangeWindow`] if the window does not overlap the
///   log's time domain at all.
pub fn integrate(
    log: &PowerLog<Ordered>,
    window: &MeasurementWindow,
) -> Result<Integration, PowerError> {
    let samples = log.samples();
    let (first, last) = match (log.first_timestamp(), log.last_timestamp()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(PowerError::InsufficientData { found: 0 }),
    };

    if window.end < first || window.start > last {
        return Err(PowerError::OutOfRangeWindow {
            start: window.start,
            end: window.end,
            log_start: first,
            log_end: last,
        });
    }

    let start = window.start.max(first);
    let end = window.end.min(last);
    let lo = samples.partition_point(|s| s.timestamp < start);
    let hi = samples.partition_point(|s| s.timestamp <= end);
    let inside = &samples[lo..hi];

    if inside.len() < 2 || end <= start {
        tracing::warn!(
            "only {} sample(s) inside window [{start:.3}, {end:.3}] s; energy reported as zero",
            inside.len()
        );
        return Ok(Integration {
            energy_j: 0.0,
            avg_power_w: 0.0,
            peak_power_w: inside.iter().map(|s| s.power_watts).fold(0.0, f64::max),
            covered_start: start,
            covered_end: end,
            samples_in_window: inside.len(),
            insufficient_samples: true,
        });
    }

    let clipped = clip(samples, lo, hi, start, end);
    let energy_j = trapezoid(&clipped);
    let peak_power_w = clipped.iter().map(|&(_, p)| p).fold(0.0, f64::max);
    let avg_power_w = energy_j / (end - start);

    tracing::debug!(
        "integrated {} points over {:.3} s: {energy_j:.3} J (avg {avg_power_w:.2} W, peak {peak_power_w:.2} W)",
        clipped.len(),
        end - start,
    );

    Ok(Integration {
        energy_j,
        avg_power_w,
        peak_power_w,
        covered_start: start,
        covered_end: end,
        samples_in_window: inside.len(),
        insufficient_samples: false,
    })
}

/// Trapezoidal rule over `(t, P)` points sorted by `t`.
pub fn trapezoid(points: &[(f64, f64)]) -> f64 {
    points
        .windows(2)
        .map(|w| {
            let (t0, p0) = w[0];
            let (t1, p1) = w[1];
            0.5 * (p0 + p1) * (t1 - t0)
        })
        .sum()
}

/// Builds the clipped point sequence for `[start, end]`.
///
/// `samples[lo..hi]` are the logged samples inside the window; boundaries
/// falling strictly between two samples get an interpolated point.
fn clip(samples: &[PowerSample], lo: usize, hi: usize, start: f64, end: f64) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(hi - lo + 2);

    if lo > 0 && samples[lo].timestamp > start {
        points.push((start, interpolate(&samples[lo - 1], &samples[lo], start)));
    }
    points.extend(samples[lo..hi].iter().map(|s| (s.timestamp, s.power_watts)));
    if hi < samples.len() && samples[hi - 1].timestamp < end {
        points.push((end, interpolate(&samples[hi - 1], &samples[hi], end)));
    }

    points
}

/// Linear interpolation of power at `t`, with `a.timestamp < t < b.timestamp`.
fn interpolate(a: &PowerSample, b: &PowerSample, t: f64) -> f64 {
    let span = b.timestamp - a.timestamp;
    if span <= 0.0 {
        return a.power_watts;
    }
    a.power_watts + (b.power_watts - a.power_watts) * (t - a.timestamp) / span
}
