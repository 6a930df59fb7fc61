// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Steady-state window selection.
//!
//! A [`MeasurementWindow`] is derived from a run's power log each time it is
//! needed; it is the single source of truth for which power samples and
//! which request records belong to the steady-state measurement.

use crate::{Ordered, PowerError, PowerLog};
use std::fmt;

/// A closed interval `[start, end]` in log seconds.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct MeasurementWindow {
    /// Window start in seconds.
    pub start: f64,
    /// Window end in seconds.
    pub end: f64,
}

impl MeasurementWindow {
    /// Creates a window, failing if `end` is not strictly after `start`.
    pub fn new(start: f64, end: f64) -> Result<Self, PowerError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(PowerError::InvalidParameter(format!(
                "window bounds must be finite, got [{start}, {end}]"
            )));
        }
        if end <= start {
            return Err(PowerError::EmptyWindow {
                log_duration: end - start,
                warmup: 0.0,
                cooldown: 0.0,
            });
        }
        Ok(Self { start, end })
    }

    /// Window length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Returns `true` if `t` lies inside the closed window.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }

    /// Returns `true` if the closed interval `[from, to]` touches the window.
    pub fn intersects(&self, from: f64, to: f64) -> bool {
        from <= self.end && to >= self.start
    }

    /// Length of the overlap between `[from, to]` and the window.
    pub fn overlap(&self, from: f64, to: f64) -> f64 {
        (to.min(self.end) - from.max(self.start)).max(0.0)
    }
}

impl fmt::Display for MeasurementWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.3}, {:.3}] s ({:.3} s)",
            self.start,
            self.end,
            self.duration()
        )
    }
}

/// Derives the steady-state window of a run.
///
/// Returns `[t_first + warmup_seconds, t_last - cooldown_seconds]`.
///
/// # Errors
/// - [`PowerError::InsufficientData`] if the log is empty.
/// - [`PowerError::InvalidParameter`] if either duration is negative or not finite.
/// - [`PowerError::EmptyWindow`] if the log is no longer than `warmup + cooldown`.
pub fn select_window(
    log: &PowerLog<Ordered>,
    warmup_seconds: f64,
    cooldown_seconds: f64,
) -> Result<MeasurementWindow, PowerError> {
    for (name, value) in [("warmup", warmup_seconds), ("cooldown", cooldown_seconds)] {
        if !value.is_finite() || value < 0.0 {
            return Err(PowerError::InvalidParameter(format!(
                "{name} must be a non-negative number of seconds, got {value}"
            )));
        }
    }

    let (first, last) = match (log.first_timestamp(), log.last_timestamp()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(PowerError::InsufficientData { found: 0 }),
    };

    let start = first + warmup_seconds;
    let end = last - cooldown_seconds;
    if end <= start {
        return Err(PowerError::EmptyWindow {
            log_duration: last - first,
            warmup: warmup_seconds,
            cooldown: cooldown_seconds,
        });
    }

    let window = MeasurementWindow { start, end };
    tracing::debug!("selected steady-state window {window}");
    Ok(window)
}
