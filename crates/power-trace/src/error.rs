// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for power log handling.

/// Errors that can occur when reading, windowing, or integrating power logs.
#[derive(Debug, thiserror::Error)]
pub enum PowerError {
    /// Failed to open or read a power log file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },

    /// A row could not be decoded into a power sample.
    #[error("malformed power log {path} (row {row}): {detail}")]
    MalformedLog {
        path: String,
        row: usize,
        detail: String,
    },

    /// The log holds too few samples to compute any energy at all.
    #[error("power log has {found} sample(s); at least 2 are required")]
    InsufficientData { found: usize },

    /// The requested window does not overlap the log's time domain.
    #[error(
        "window [{start:.3}, {end:.3}] s lies outside the log's time domain \
         [{log_start:.3}, {log_end:.3}] s"
    )]
    OutOfRangeWindow {
        start: f64,
        end: f64,
        log_start: f64,
        log_end: f64,
    },

    /// Warmup plus cooldown leaves no steady-state window.
    #[error(
        "empty measurement window: log spans {log_duration:.3} s but warmup \
         ({warmup:.3} s) + cooldown ({cooldown:.3} s) leave nothing"
    )]
    EmptyWindow {
        log_duration: f64,
        warmup: f64,
        cooldown: f64,
    },

    /// The idle log is too short after trimming startup/shutdown transients.
    #[error("idle log has {remaining} sample(s) after trimming; at least {required} are required")]
    InsufficientIdleSamples { remaining: usize, required: usize },

    /// A windowing or baseline parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
