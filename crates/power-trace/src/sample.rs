// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Power samples and the power log that owns them.
//!
//! # Type-State Pattern
//!
//! Loggers are free to emit rows out of order, so a log moves through two
//! states enforced at compile time:
//!
//! ```text
//! PowerLog<Raw>      — samples in ingestion order.
//!       │  .into_ordered()
//!       ▼
//! PowerLog<Ordered>  — samples sorted by timestamp, ready for windowing.
//! ```
//!
//! Windowing, integration, and baseline estimation only accept
//! `PowerLog<Ordered>`, so an unsorted log can never reach the integrator.

use std::fmt;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: samples are in ingestion order.
#[derive(Debug, Clone)]
pub struct Raw;

/// Marker: samples are sorted by non-decreasing timestamp.
#[derive(Debug, Clone)]
pub struct Ordered;

/// Sealed trait for log states.
pub trait LogState: fmt::Debug + Clone {}
impl LogState for Raw {}
impl LogState for Ordered {}

// ── PowerSample ────────────────────────────────────────────────────

/// A single hardware power reading.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PowerSample {
    /// Seconds since an arbitrary run-local epoch.
    pub timestamp: f64,
    /// Board power draw in watts.
    pub power_watts: f64,
    /// GPU utilisation in percent, `[0, 100]`.
    pub gpu_util_pct: f64,
    /// Device memory in use, in bytes.
    pub mem_used_bytes: u64,
}

impl PowerSample {
    /// Creates a sample.
    pub fn new(timestamp: f64, power_watts: f64, gpu_util_pct: f64, mem_used_bytes: u64) -> Self {
        Self {
            timestamp,
            power_watts,
            gpu_util_pct,
            mem_used_bytes,
        }
    }

    /// Checks the physical invariants of a sample.
    ///
    /// Returns a description of the first violated invariant.
    pub fn check(&self) -> Result<(), String> {
        if !self.timestamp.is_finite() {
            return Err(format!("timestamp {} is not finite", self.timestamp));
        }
        if !self.power_watts.is_finite() || self.power_watts < 0.0 {
            return Err(format!("power {} W must be finite and >= 0", self.power_watts));
        }
        if !(0.0..=100.0).contains(&self.gpu_util_pct) {
            return Err(format!("gpu utilisation {}% outside [0, 100]", self.gpu_util_pct));
        }
        Ok(())
    }
}

// ── PowerLog ───────────────────────────────────────────────────────

/// An immutable sequence of power samples plus the device's declared
/// capacities.
///
/// The generic parameter `S` encodes the ordering state at compile time.
#[derive(Debug, Clone)]
pub struct PowerLog<S: LogState = Raw> {
    samples: Vec<PowerSample>,
    /// Declared GPU memory capacity in bytes, if the logger recorded it.
    pub memory_capacity_bytes: Option<u64>,
    /// Theoretical peak memory bandwidth in bytes/s, if known.
    pub peak_bandwidth_bytes_per_s: Option<f64>,
    _state: std::marker::PhantomData<S>,
}

impl<S: LogState> PowerLog<S> {
    /// Returns the samples in their current order.
    pub fn samples(&self) -> &[PowerSample] {
        &self.samples
    }

    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if the log holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sets the declared memory capacity.
    pub fn with_memory_capacity(mut self, bytes: u64) -> Self {
        self.memory_capacity_bytes = Some(bytes);
        self
    }

    /// Sets the theoretical peak memory bandwidth.
    pub fn with_peak_bandwidth(mut self, bytes_per_s: f64) -> Self {
        self.peak_bandwidth_bytes_per_s = Some(bytes_per_s);
        self
    }
}

// ── Raw state ──────────────────────────────────────────────────────

impl PowerLog<Raw> {
    /// Creates a log in the `Raw` state from samples in ingestion order.
    pub fn new(samples: Vec<PowerSample>) -> Self {
        Self {
            samples,
            memory_capacity_bytes: None,
            peak_bandwidth_bytes_per_s: None,
            _state: std::marker::PhantomData,
        }
    }

    /// Returns `true` if the samples are already in timestamp order.
    pub fn is_ordered(&self) -> bool {
        self.samples
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    }

    /// Sorts samples by timestamp and transitions to the `Ordered` state.
    ///
    /// The sort is stable, so samples sharing a timestamp keep their
    /// ingestion order.
    pub fn into_ordered(mut self) -> PowerLog<Ordered> {
        if !self.is_ordered() {
            tracing::debug!(
                "power log of {} samples arrived out of order; sorting",
                self.samples.len()
            );
            self.samples
                .sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        }
        PowerLog {
            samples: self.samples,
            memory_capacity_bytes: self.memory_capacity_bytes,
            peak_bandwidth_bytes_per_s: self.peak_bandwidth_bytes_per_s,
            _state: std::marker::PhantomData,
        }
    }
}

// ── Ordered state ──────────────────────────────────────────────────

impl PowerLog<Ordered> {
    /// Timestamp of the earliest sample.
    pub fn first_timestamp(&self) -> Option<f64> {
        self.samples.first().map(|s| s.timestamp)
    }

    /// Timestamp of the latest sample.
    pub fn last_timestamp(&self) -> Option<f64> {
        self.samples.last().map(|s| s.timestamp)
    }

    /// Span between the first and last sample in seconds (0 when < 2 samples).
    pub fn duration(&self) -> f64 {
        match (self.first_timestamp(), self.last_timestamp()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Fails unless the log has enough samples to integrate.
    pub fn require_integrable(&self) -> Result<(), crate::PowerError> {
        if self.samples.len() < 2 {
            return Err(crate::PowerError::InsufficientData {
                found: self.samples.len(),
            });
        }
        Ok(())
    }

    /// Arithmetic mean of all sample powers (0 for an empty log).
    pub fn mean_power(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|s| s.power_watts).sum::<f64>() / self.samples.len() as f64
    }

    /// Highest sample power (0 for an empty log).
    pub fn peak_power(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.power_watts)
            .fold(0.0, f64::max)
    }

    /// Returns a one-line summary suitable for logging or CLI display.
    pub fn summary(&self) -> String {
        format!(
            "PowerLog: {} samples over {:.2} s, mean {:.2} W, peak {:.2} W",
            self.samples.len(),
            self.duration(),
            self.mean_power(),
            self.peak_power(),
        )
    }
}
