// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Idle subtraction and per-token energy attribution.

use crate::error::AttributionError;
use request_trace::TokenAggregate;

/// Window energy after removing the idle baseline.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ActiveEnergy {
    /// Energy attributable to inference work, never negative.
    pub energy_j: f64,
    /// Idle energy over the window (`P_idle · duration`).
    pub idle_energy_j: f64,
    /// True if the raw difference was negative and was clamped to zero.
    pub clamped: bool,
}

/// Subtracts idle energy over `window_seconds` from `total_energy_j`.
///
/// A negative difference means the baseline exceeded the observed draw; it
/// is clamped to zero and flagged.
pub fn active_energy(total_energy_j: f64, idle_power_w: f64, window_seconds: f64) -> ActiveEnergy {
    let idle_energy_j = idle_power_w * window_seconds;
    let raw = total_energy_j - idle_energy_j;
    if raw < 0.0 {
        tracing::warn!(
            "idle energy {idle_energy_j:.1} J exceeds window energy {total_energy_j:.1} J; \
             clamping active energy to 0"
        );
        return ActiveEnergy {
            energy_j: 0.0,
            idle_energy_j,
            clamped: true,
        };
    }
    ActiveEnergy {
        energy_j: raw,
        idle_energy_j,
        clamped: false,
    }
}

/// Active energy divided by completion tokens.
///
/// # Errors
/// [`AttributionError::DivisionByZeroTokens`] when no completion tokens
/// were observed.
pub fn energy_per_token(active_energy_j: f64, completion_tokens: u64) -> Result<f64, AttributionError> {
    if completion_tokens == 0 {
        return Err(AttributionError::DivisionByZeroTokens);
    }
    Ok(active_energy_j / completion_tokens as f64)
}

/// Energy charged to a single request.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RequestEnergy {
    pub request_id: String,
    /// Completion tokens billed to the window (weighted under proportional policy).
    pub billed_tokens: f64,
    pub energy_j: f64,
}

/// Distributes energy to requests in proportion to their billed completion tokens.
pub fn per_request_energy(energy_per_token_j: f64, tokens: &TokenAggregate) -> Vec<RequestEnergy> {
    tokens
        .per_request
        .iter()
        .map(|r| {
            let billed_tokens = r.billed_completion_tokens();
            RequestEnergy {
                request_id: r.request_id.clone(),
                billed_tokens,
                energy_j: billed_tokens * energy_per_token_j,
            }
        })
        .collect()
}

/// Arithmetic mean of per-request energies.
pub fn mean_request_energy(energies: &[RequestEnergy]) -> Option<f64> {
    if energies.is_empty() {
        return None;
    }
    Some(energies.iter().map(|e| e.energy_j).sum::<f64>() / energies.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use request_trace::{OverlapPolicy, RequestTokens};

    #[test]
    fn test_active_energy() {
        let a = active_energy(3000.0, 60.0, 10.0);
        assert!((a.energy_j - 2400.0).abs() < 1e-9);
        assert!((a.idle_energy_j - 600.0).abs() < 1e-9);
        assert!(!a.clamped);
    }

    #[test]
    fn test_active_energy_clamped() {
        let a = active_energy(500.0, 60.0, 10.0);
        assert_eq!(a.energy_j, 0.0);
        assert!(a.clamped);
    }

    #[test]
    fn test_active_energy_monotone_in_idle() {
        let mut prev = f64::INFINITY;
        for idle in [0.0, 10.0, 50.0, 100.0, 299.0, 300.0, 400.0] {
            let a = active_energy(3000.0, idle, 10.0).energy_j;
            assert!(a <= prev);
            assert!(a >= 0.0);
            prev = a;
        }
    }

    #[test]
    fn test_active_energy_increases_with_total() {
        let mut prev = f64::NEG_INFINITY;
        for total in [700.0, 1000.0, 2500.0, 3000.0, 9000.0] {
            let a = active_energy(total, 60.0, 10.0).energy_j;
            assert!(a > prev);
            prev = a;
        }
    }

    #[test]
    fn test_energy_per_token() {
        let e = energy_per_token(2400.0, 500).unwrap();
        assert!((e - 4.8).abs() < 1e-12);
    }

    #[test]
    fn test_energy_per_token_zero_tokens() {
        assert!(matches!(
            energy_per_token(2400.0, 0),
            Err(AttributionError::DivisionByZeroTokens)
        ));
    }

    #[test]
    fn test_per_request_energy() {
        let tokens = TokenAggregate {
            policy: OverlapPolicy::Proportional,
            total_prompt_tokens: 0,
            total_completion_tokens: 150,
            request_count: 2,
            success_count: 2,
            avg_latency_seconds: None,
            per_request: vec![
                RequestTokens {
                    request_id: "a".into(),
                    prompt_tokens: 0,
                    completion_tokens: 100,
                    weight: 1.0,
                },
                RequestTokens {
                    request_id: "b".into(),
                    prompt_tokens: 0,
                    completion_tokens: 100,
                    weight: 0.5,
                },
            ],
        };
        let energies = per_request_energy(2.0, &tokens);
        assert_eq!(energies.len(), 2);
        assert!((energies[0].energy_j - 200.0).abs() < 1e-9);
        assert!((energies[1].energy_j - 100.0).abs() < 1e-9);
        assert!((mean_request_energy(&energies).unwrap() - 150.0).abs() < 1e-9);
        assert_eq!(mean_request_energy(&[]), None);
    }
}
