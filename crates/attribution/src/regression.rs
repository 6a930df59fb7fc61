// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Prefill/decode energy coefficients from a campaign of runs.
//!
//! Fits `E_active ≈ α · prompt_tokens + β · completion_tokens` by ordinary
//! least squares without intercept. The normal-equations matrix `XᵀX` is
//! checked for conditioning before it is inverted; near-collinear campaigns
//! are rejected instead of producing unstable coefficients.

use crate::error::AttributionError;
use ndarray::{array, Array1, Array2};

/// Default largest acceptable condition number of `XᵀX`.
pub const DEFAULT_CONDITION_THRESHOLD: f64 = 1e8;

/// One run's totals, as seen by the regression.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RunObservation {
    pub label: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub active_energy_j: f64,
}

/// Per-token energy coefficients.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct CoefficientSet {
    /// Joules per prompt (prefill) token.
    pub alpha_j_per_prompt_token: f64,
    /// Joules per completion (decode) token.
    pub beta_j_per_completion_token: f64,
}

/// Fitted coefficients plus goodness-of-fit diagnostics.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RegressionFit {
    pub coefficients: CoefficientSet,
    /// Coefficient of determination about the mean of observed energies.
    pub r_squared: f64,
    /// Largest absolute residual in joules.
    pub max_abs_residual_j: f64,
    /// Residual per run, in input order.
    pub residuals_j: Vec<f64>,
    /// Condition number of `XᵀX`.
    pub condition_number: f64,
    /// Labels of the runs used in the fit.
    pub runs: Vec<String>,
}

impl RegressionFit {
    /// One-line summary.
    pub fn summary(&self) -> String {
        format!(
            "α={:.4} J/prompt-token, β={:.4} J/completion-token, R²={:.4}, {} runs, cond={:.2e}",
            self.coefficients.alpha_j_per_prompt_token,
            self.coefficients.beta_j_per_completion_token,
            self.r_squared,
            self.runs.len(),
            self.condition_number,
        )
    }
}

/// Condition number of a symmetric positive semi-definite 2×2 matrix.
///
/// Returns `f64::INFINITY` for singular matrices.
pub fn condition_number(m: &Array2<f64>) -> f64 {
    let (a, b, c) = (m[[0, 0]], m[[0, 1]], m[[1, 1]]);
    let mid = (a + c) / 2.0;
    let radius = (((a - c) / 2.0).powi(2) + b * b).sqrt();
    let lambda_max = mid + radius;
    let det = a * c - b * b;
    if lambda_max <= 0.0 {
        return f64::INFINITY;
    }
    let lambda_min = det / lambda_max;
    if lambda_min <= 0.0 {
        return f64::INFINITY;
    }
    lambda_max / lambda_min
}

/// Fits prefill/decode coefficients over `runs`.
///
/// # Errors
/// - [`AttributionError::InsufficientRuns`] with fewer than two runs.
/// - [`AttributionError::IllConditionedRegression`] when the condition
///   number of `XᵀX` exceeds `threshold`.
pub fn fit_coefficients(
    runs: &[RunObservation],
    threshold: f64,
) -> Result<RegressionFit, AttributionError> {
    if runs.len() < 2 {
        return Err(AttributionError::InsufficientRuns { found: runs.len() });
    }

    let x = Array2::from_shape_fn((runs.len(), 2), |(i, j)| match j {
        0 => runs[i].prompt_tokens as f64,
        _ => runs[i].completion_tokens as f64,
    });
    let y: Array1<f64> = runs.iter().map(|r| r.active_energy_j).collect();

    let xtx = x.t().dot(&x);
    let xty = x.t().dot(&y);

    let cond = condition_number(&xtx);
    tracing::debug!("normal-equations condition number {cond:.3e} over {} runs", runs.len());
    if !(cond <= threshold) {
        return Err(AttributionError::IllConditionedRegression {
            condition_number: cond,
            threshold,
        });
    }

    let (a, b, c) = (xtx[[0, 0]], xtx[[0, 1]], xtx[[1, 1]]);
    let det = a * c - b * b;
    let alpha = (c * xty[0] - b * xty[1]) / det;
    let beta = (a * xty[1] - b * xty[0]) / det;

    let fitted = x.dot(&array![alpha, beta]);
    let residuals = &y - &fitted;

    let ss_res = residuals.mapv(|r| r * r).sum();
    let mean = y.mean().unwrap_or(0.0);
    let ss_tot = y.mapv(|v| (v - mean).powi(2)).sum();
    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res <= f64::EPSILON {
        1.0
    } else {
        0.0
    };
    let max_abs_residual_j = residuals.iter().fold(0.0_f64, |m, r| m.max(r.abs()));

    let fit = RegressionFit {
        coefficients: CoefficientSet {
            alpha_j_per_prompt_token: alpha,
            beta_j_per_completion_token: beta,
        },
        r_squared,
        max_abs_residual_j,
        residuals_j: residuals.to_vec(),
        condition_number: cond,
        runs: runs.iter().map(|r| r.label.clone()).collect(),
    };
    tracing::info!("regression fit: {}", fit.summary());
    Ok(fit)
}
