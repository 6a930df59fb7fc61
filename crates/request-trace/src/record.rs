// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Request records and the request log.

use crate::RequestError;
use std::collections::HashSet;

/// One completed (or failed) inference request as seen by the load generator.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RequestRecord {
    /// Unique identifier within the log.
    pub request_id: String,
    /// Submission time, same epoch as the power log.
    pub timestamp_submitted: f64,
    /// Completion time, same epoch as the power log.
    pub timestamp_completed: f64,
    /// Prompt (prefill) tokens.
    pub prompt_tokens: u64,
    /// Generated (decode) tokens.
    pub completion_tokens: u64,
    /// Client-observed latency in seconds.
    pub latency_seconds: f64,
    /// Whether the server returned a usable completion.
    pub success: bool,
}

impl RequestRecord {
    /// Checks the record's field invariants.
    pub fn check(&self) -> Result<(), RequestError> {
        let invalid = |detail: String| RequestError::InvalidRecord {
            request_id: self.request_id.clone(),
            detail,
        };

        if !self.timestamp_submitted.is_finite() || !self.timestamp_completed.is_finite() {
            return Err(invalid("timestamps must be finite".into()));
        }
        if self.timestamp_completed < self.timestamp_submitted {
            return Err(invalid(format!(
                "completed at {} before submitted at {}",
                self.timestamp_completed, self.timestamp_submitted
            )));
        }
        if !self.latency_seconds.is_finite() || self.latency_seconds < 0.0 {
            return Err(invalid(format!(
                "latency {} s must be finite and >= 0",
                self.latency_seconds
            )));
        }
        Ok(())
    }

    /// Time between submission and completion.
    pub fn span_seconds(&self) -> f64 {
        self.timestamp_completed - self.timestamp_submitted
    }
}

/// A validated set of request records, unique by id and sorted by
/// submission time.
#[derive(Debug, Clone, Default)]
pub struct RequestLog {
    records: Vec<RequestRecord>,
}

impl RequestLog {
    /// Validates `records`, rejects duplicate ids, and sorts by submission
    /// time. Ingestion order is not trusted.
    pub fn from_records(mut records: Vec<RequestRecord>) -> Result<Self, RequestError> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            record.check()?;
            if !seen.insert(record.request_id.as_str()) {
                return Err(RequestError::DuplicateRequestId(record.request_id.clone()));
            }
        }

        records.sort_by(|a, b| a.timestamp_submitted.total_cmp(&b.timestamp_submitted));
        Ok(Self { records })
    }

    /// Records sorted by submission time.
    pub fn records(&self) -> &[RequestRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the log holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of successful records.
    pub fn success_count(&self) -> usize {
        self.records.iter().filter(|r| r.success).count()
    }

    /// Earliest submission and latest completion, if any records exist.
    pub fn time_span(&self) -> Option<(f64, f64)> {
        let first = self.records.first()?.timestamp_submitted;
        let last = self
            .records
            .iter()
            .map(|r| r.timestamp_completed)
            .fold(f64::NEG_INFINITY, f64::max);
        Some((first, last))
    }

    /// Returns a one-line summary suitable for logging or CLI display.
    pub fn summary(&self) -> String {
        match self.time_span() {
            Some((first, last)) => format!(
                "RequestLog: {} requests ({} ok) over [{first:.2}, {last:.2}] s",
                self.records.len(),
                self.success_count(),
            ),
            None => "RequestLog: empty".to_string(),
        }
    }
}
