// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # attribution
//!
//! Attributes GPU energy measured over a steady-state window to the tokens
//! an inference server produced in it.
//!
//! The analyzer takes:
//! - An ordered `PowerLog` from `power-trace`.
//! - A `RequestLog` from `request-trace`.
//! - An [`IdleOutcome`]: a measured or manual idle baseline, or the reason
//!   there is none.
//!
//! And produces a [`RunReport`]: total and active energy, energy per
//! token, throughput, bandwidth estimate, carbon and water, and the
//! warnings raised along the way.
//!
//! # Campaigns
//! Several runs with different prompt/completion mixes can be combined
//! into a [`CampaignReport`], which fits separate prefill and decode
//! energy coefficients by least squares ([`fit_coefficients`]).

mod analyzer;
pub mod attributor;
mod config;
pub mod derived;
mod error;
pub mod regression;
mod report;

pub use analyzer::{EnergyAnalyzer, IdleOutcome};
pub use attributor::{active_energy, energy_per_token, ActiveEnergy, RequestEnergy};
pub use config::{AnalysisConfig, RunSpec, DEFAULT_PREFILL_LATENCY_FRACTION};
pub use error::AttributionError;
pub use regression::{
    condition_number, fit_coefficients, CoefficientSet, RegressionFit, RunObservation,
    DEFAULT_CONDITION_THRESHOLD,
};
pub use report::{
    fmt_opt, AnalysisWarning, AttributionResult, CampaignReport, FailedRun, RunReport, TokenCounts,
};
