// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CSV ingestion for request logs.
//!
//! # Format
//! ```text
//! request_id,timestamp_submitted,timestamp_completed,prompt_tokens,completion_tokens,latency_seconds,success
//! r-0001,12.00,14.35,512,128,2.35,true
//! r-0002,12.10,12.40,300,0,0.30,false
//! ```
//!
//! `success` accepts `true/false`, `1/0` and `yes/no` in any case.

use crate::{RequestError, RequestLog, RequestRecord};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RequestRow {
    request_id: String,
    timestamp_submitted: f64,
    timestamp_completed: f64,
    prompt_tokens: u64,
    completion_tokens: u64,
    latency_seconds: f64,
    #[serde(deserialize_with = "lenient_bool")]
    success: bool,
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean for 'success', got '{other}'"
        ))),
    }
}

/// Reads and validates a request log CSV file.
pub fn read_request_log(path: &Path) -> Result<RequestLog, RequestError> {
    let file = std::fs::File::open(path).map_err(|e| RequestError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    let log = parse_request_csv(file, &path.display().to_string())?;
    tracing::info!("read {} request records from {}", log.len(), path.display());
    Ok(log)
}

/// Parses and validates request log CSV from any reader.
pub fn parse_request_csv<R: Read>(reader: R, source: &str) -> Result<RequestLog, RequestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (idx, result) in csv_reader.deserialize::<RequestRow>().enumerate() {
        let row = result.map_err(|e| RequestError::MalformedLog {
            path: source.to_string(),
            row: idx + 1,
            detail: e.to_string(),
        })?;
        records.push(RequestRecord {
            request_id: row.request_id,
            timestamp_submitted: row.timestamp_submitted,
            timestamp_completed: row.timestamp_completed,
            prompt_tokens: row.prompt_tokens,
            completion_tokens: row.completion_tokens,
            latency_seconds: row.latency_seconds,
            success: row.success,
        });
    }

    RequestLog::from_records(records)
}
