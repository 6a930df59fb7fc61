// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-window token aggregation.
//!
//! # Boundary policy
//!
//! A request belongs to a window when its `[submitted, completed]` interval
//! touches the window. Under [`OverlapPolicy::Intersects`] (the default) a
//! boundary-spanning request is billed in full: requests are short relative
//! to a multi-minute window, so the bias is small, but it is a bias. Two
//! adjoining windows both bill a request that spans their shared edge, and a
//! single window over-counts by the out-of-window share of its edge requests.
//!
//! [`OverlapPolicy::Proportional`] instead weights each request by the
//! fraction of its duration that falls inside the window. Token counts are
//! not actually uniform over a request's lifetime (prefill happens up front),
//! so this is a different approximation, not a more precise one.

use crate::{RequestLog, RequestRecord};
use power_trace::MeasurementWindow;

/// How requests straddling a window edge are billed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Any overlap bills the whole request.
    #[default]
    Intersects,
    /// Tokens are scaled by the overlapping fraction of the request's span.
    Proportional,
}

impl OverlapPolicy {
    /// Parses a policy name (`"intersects"` or `"proportional"`).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "intersects" | "intersect" | "full" => Some(Self::Intersects),
            "proportional" | "split" => Some(Self::Proportional),
            _ => None,
        }
    }

    /// Canonical policy name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intersects => "intersects",
            Self::Proportional => "proportional",
        }
    }
}

/// Token counts billed for one successful request.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RequestTokens {
    /// Request identifier.
    pub request_id: String,
    /// Prompt tokens as logged.
    pub prompt_tokens: u64,
    /// Completion tokens as logged.
    pub completion_tokens: u64,
    /// Share of the request billed to the window, in `[0, 1]`.
    pub weight: f64,
}

impl RequestTokens {
    /// Completion tokens billed to the window.
    pub fn billed_completion_tokens(&self) -> f64 {
        self.completion_tokens as f64 * self.weight
    }
}

/// Token totals and request counts for one window.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TokenAggregate {
    /// Policy the totals were computed with.
    pub policy: OverlapPolicy,
    /// Prompt tokens of successful requests in the window.
    pub total_prompt_tokens: u64,
    /// Completion tokens of successful requests in the window.
    pub total_completion_tokens: u64,
    /// Requests touching the window, failed ones included.
    pub request_count: usize,
    /// Successful requests touching the window.
    pub success_count: usize,
    /// Mean latency of the successful requests, `None` without any.
    pub avg_latency_seconds: Option<f64>,
    /// Per-request billing for successful requests.
    pub per_request: Vec<RequestTokens>,
}

impl TokenAggregate {
    /// Prompt plus completion tokens.
    pub fn total_tokens(&self) -> u64 {
        self.total_prompt_tokens + self.total_completion_tokens
    }

    /// Mean completion tokens per successful request.
    pub fn avg_completion_tokens(&self) -> Option<f64> {
        if self.success_count == 0 {
            return None;
        }
        Some(self.total_completion_tokens as f64 / self.success_count as f64)
    }
}

/// Reduces `log` to the token totals billed to `window`.
///
/// Failed requests count toward `request_count` only; their tokens are not
/// billed against active energy.
pub fn aggregate(log: &RequestLog, window: &MeasurementWindow, policy: OverlapPolicy) -> TokenAggregate {
    let mut request_count = 0;
    let mut success_count = 0;
    let mut latency_sum = 0.0;
    let mut prompt_sum = 0.0;
    let mut completion_sum = 0.0;
    let mut per_request = Vec::new();

    let selected = log
        .records()
        .iter()
        .filter(|r| window.intersects(r.timestamp_submitted, r.timestamp_completed));

    for record in selected {
        request_count += 1;
        if !record.success {
            continue;
        }
        success_count += 1;
        latency_sum += record.latency_seconds;

        let weight = billing_weight(record, window, policy);
        prompt_sum += record.prompt_tokens as f64 * weight;
        completion_sum += record.completion_tokens as f64 * weight;
        per_request.push(RequestTokens {
            request_id: record.request_id.clone(),
            prompt_tokens: record.prompt_tokens,
            completion_tokens: record.completion_tokens,
            weight,
        });
    }

    let agg = TokenAggregate {
        policy,
        total_prompt_tokens: prompt_sum.round() as u64,
        total_completion_tokens: completion_sum.round() as u64,
        request_count,
        success_count,
        avg_latency_seconds: (success_count > 0).then(|| latency_sum / success_count as f64),
        per_request,
    };

    tracing::debug!(
        "window {window}: {} requests ({} ok), {} prompt + {} completion tokens ({})",
        agg.request_count,
        agg.success_count,
        agg.total_prompt_tokens,
        agg.total_completion_tokens,
        policy.as_str(),
    );
    agg
}

fn billing_weight(record: &RequestRecord, window: &MeasurementWindow, policy: OverlapPolicy) -> f64 {
    match policy {
        OverlapPolicy::Intersects => 1.0,
        OverlapPolicy::Proportional => {
            let span = record.span_seconds();
            if span <= 0.0 {
                // Instantaneous request inside the window.
                1.0
            } else {
                (window.overlap(record.timestamp_submitted, record.timestamp_completed) / span)
                    .clamp(0.0, 1.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, s: f64, c: f64, prompt: u64, completion: u64, ok: bool) -> RequestRecord {
        RequestRecord {
            request_id: id.into(),
            timestamp_submitted: s,
            timestamp_completed: c,
            prompt_tokens: prompt,
            completion_tokens: completion,
            latency_seconds: c - s,
            success: ok,
        }
    }

    fn window() -> MeasurementWindow {
        MeasurementWindow::new(10.0, 20.0).unwrap()
    }

    fn sample_log() -> RequestLog {
        RequestLog::from_records(vec![
            rec("before", 1.0, 5.0, 999, 999, true),
            rec("left-edge", 8.0, 12.0, 100, 40, true),
            rec("inside", 12.0, 14.0, 50, 60, true),
            rec("failed", 13.0, 15.0, 70, 0, false),
            rec("right-edge", 19.0, 23.0, 10, 80, true),
            rec("after", 25.0, 26.0, 999, 999, true),
        ])
        .unwrap()
    }

    #[test]
    fn test_intersects_counts_edges_fully() {
        let agg = aggregate(&sample_log(), &window(), OverlapPolicy::Intersects);
        assert_eq!(agg.request_count, 4);
        assert_eq!(agg.success_count, 3);
        assert_eq!(agg.total_prompt_tokens, 160);
        assert_eq!(agg.total_completion_tokens, 180);
        assert_eq!(agg.total_tokens(), 340);
        assert_eq!(agg.per_request.len(), 3);
        assert!(agg.per_request.iter().all(|r| r.weight == 1.0));
        // (4 + 2 + 4) / 3
        assert!((agg.avg_latency_seconds.unwrap() - 10.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_adjoining_windows_double_count_spanning_request() {
        let log = RequestLog::from_records(vec![rec("span", 9.0, 11.0, 0, 100, true)]).unwrap();
        let left = MeasurementWindow::new(0.0, 10.0).unwrap();
        let right = MeasurementWindow::new(10.0, 20.0).unwrap();
        let a = aggregate(&log, &left, OverlapPolicy::Intersects);
        let b = aggregate(&log, &right, OverlapPolicy::Intersects);
        assert_eq!(a.total_completion_tokens + b.total_completion_tokens, 200);

        let a = aggregate(&log, &left, OverlapPolicy::Proportional);
        let b = aggregate(&log, &right, OverlapPolicy::Proportional);
        assert_eq!(a.total_completion_tokens + b.total_completion_tokens, 100);
    }

    #[test]
    fn test_proportional_weights() {
        let agg = aggregate(&sample_log(), &window(), OverlapPolicy::Proportional);
        // left-edge: 2/4 inside, inside: 1, right-edge: 1/4 inside.
        assert_eq!(agg.total_completion_tokens, 20 + 60 + 20);
        assert_eq!(agg.total_prompt_tokens, 50 + 50 + 3);
        let weights: Vec<f64> = agg.per_request.iter().map(|r| r.weight).collect();
        assert_eq!(weights, vec![0.5, 1.0, 0.25]);
        assert_eq!(agg.per_request[0].billed_completion_tokens(), 20.0);
    }

    #[test]
    fn test_failed_requests_not_billed() {
        let log = RequestLog::from_records(vec![rec("f", 11.0, 12.0, 500, 500, false)]).unwrap();
        let agg = aggregate(&log, &window(), OverlapPolicy::Intersects);
        assert_eq!(agg.request_count, 1);
        assert_eq!(agg.success_count, 0);
        assert_eq!(agg.total_completion_tokens, 0);
        assert_eq!(agg.avg_latency_seconds, None);
        assert_eq!(agg.avg_completion_tokens(), None);
    }

    #[test]
    fn test_same_window_is_identical() {
        let log = sample_log();
        let a = aggregate(&log, &window(), OverlapPolicy::Intersects);
        let b = aggregate(&log, &window(), OverlapPolicy::Intersects);
        assert_eq!(a, b);
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(OverlapPolicy::from_str_loose("Proportional"), Some(OverlapPolicy::Proportional));
        assert_eq!(OverlapPolicy::from_str_loose("intersects"), Some(OverlapPolicy::Intersects));
        assert_eq!(OverlapPolicy::from_str_loose("bogus"), None);
        assert_eq!(OverlapPolicy::default().as_str(), "intersects");
    }

    #[test]
    fn test_policy_serde_names() {
        let json = serde_json::to_string(&OverlapPolicy::Proportional).unwrap();
        assert_eq!(json, "\"proportional\"");
        let back: OverlapPolicy = serde_json::from_str("\"intersects\"").unwrap();
        assert_eq!(back, OverlapPolicy::Intersects);
    }
}
