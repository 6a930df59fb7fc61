// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for energy attribution.

/// Errors that can occur while attributing energy to tokens.
#[derive(Debug, thiserror::Error)]
pub enum AttributionError {
    /// Power log ingestion, windowing, or integration failed.
    #[error("power log error: {0}")]
    Power(#[from] power_trace::PowerError),

    /// Request log ingestion failed.
    #[error("request log error: {0}")]
    Request(#[from] request_trace::RequestError),

    /// No completion tokens were observed, so there is nothing to bill.
    #[error("no billable tokens observed: zero completion tokens in the window")]
    DivisionByZeroTokens,

    /// The prefill/decode predictors are too collinear for a stable fit.
    #[error(
        "ill-conditioned regression: condition number {condition_number:.3e} exceeds {threshold:.3e}"
    )]
    IllConditionedRegression {
        condition_number: f64,
        threshold: f64,
    },

    /// Regression needs at least two runs.
    #[error("regression needs at least 2 runs, got {found}")]
    InsufficientRuns { found: usize },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
