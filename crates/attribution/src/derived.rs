// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Secondary metrics derived from window energy and token counts.
//!
//! Each function returns `None` when an input it needs is absent or the
//! result would be undefined; reports render `None` as "N/A".

/// Joules in one kilowatt-hour.
pub const JOULES_PER_KWH: f64 = 3.6e6;

/// Converts joules to kilowatt-hours.
pub fn joules_to_kwh(joules: f64) -> f64 {
    joules / JOULES_PER_KWH
}

/// Completion tokens per second over the window.
pub fn throughput(completion_tokens: u64, window_seconds: f64) -> Option<f64> {
    (window_seconds > 0.0).then(|| completion_tokens as f64 / window_seconds)
}

/// Energy per thousand tokens.
pub fn energy_per_1k_tokens(energy_per_token_j: Option<f64>) -> Option<f64> {
    energy_per_token_j.map(|e| e * 1000.0)
}

/// Model weight footprint in bytes.
pub fn model_parameter_bytes(parameter_count: Option<u64>, bytes_per_parameter: Option<f64>) -> Option<f64> {
    Some(parameter_count? as f64 * bytes_per_parameter?)
}

/// Estimated memory-bandwidth utilisation as a percentage of peak.
///
/// Assumes every processed token reads the full model weights once and that
/// weight and KV traffic together amount to twice that volume. Values above
/// 100 are returned unclamped.
pub fn mem_bandwidth_util_pct(
    total_tokens: u64,
    model_parameter_bytes: Option<f64>,
    window_seconds: f64,
    peak_bandwidth_bytes_per_s: Option<f64>,
) -> Option<f64> {
    let model_bytes = model_parameter_bytes?;
    let peak = peak_bandwidth_bytes_per_s.filter(|p| *p > 0.0)?;
    if window_seconds <= 0.0 {
        return None;
    }
    let bytes_moved = 2.0 * total_tokens as f64 * model_bytes;
    Some(bytes_moved / window_seconds / peak * 100.0)
}

/// Operational carbon for `energy_j`, scaled by facility PUE.
///
/// Both the grid intensity and the PUE must be supplied.
pub fn carbon_grams(energy_j: f64, intensity_g_per_kwh: Option<f64>, pue: Option<f64>) -> Option<f64> {
    Some(joules_to_kwh(energy_j) * intensity_g_per_kwh? * pue?)
}

/// Site water consumption for `energy_j`.
pub fn water_liters(energy_j: f64, water_usage_l_per_kwh: Option<f64>) -> Option<f64> {
    Some(joules_to_kwh(energy_j) * water_usage_l_per_kwh?)
}

/// Splits mean request latency into a prefill share and a per-token decode time.
///
/// Returns `(avg_prefill_seconds, avg_decode_seconds_per_token)`.
pub fn latency_split(
    avg_latency_seconds: Option<f64>,
    avg_completion_tokens: Option<f64>,
    prefill_fraction: f64,
) -> (Option<f64>, Option<f64>) {
    let Some(latency) = avg_latency_seconds else {
        return (None, None);
    };
    let prefill = latency * prefill_fraction;
    let decode = avg_completion_tokens
        .filter(|t| *t > 0.0)
        .map(|t| (latency - prefill) / t);
    (Some(prefill), decode)
}
