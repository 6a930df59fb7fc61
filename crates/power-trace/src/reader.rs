// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CSV ingestion for power logs.
//!
//! # Format
//! ```text
//! timestamp,power_W,gpu_util,mem_used_bytes,mem_total_bytes
//! 1718000000.00,312.5,97,61203283968,85899345920
//! 1718000000.10,315.1,98,61203283968,85899345920
//! ```
//!
//! `timestamp_s` and `gpu_util_percent` are accepted as column aliases, and
//! `mem_total_bytes` is optional. The first non-empty `mem_total_bytes`
//! value becomes the log's declared memory capacity. Rows are kept in file
//! order; call [`PowerLog::into_ordered`] before windowing.

use crate::{PowerError, PowerLog, PowerSample, Raw};
use std::io::Read;
use std::path::Path;

#[derive(Debug, serde::Deserialize)]
struct PowerRow {
    #[serde(alias = "timestamp_s")]
    timestamp: f64,
    #[serde(rename = "power_W", alias = "power_w")]
    power_w: f64,
    #[serde(alias = "gpu_util_percent")]
    gpu_util: f64,
    mem_used_bytes: u64,
    #[serde(default)]
    mem_total_bytes: Option<u64>,
}

/// Reads a power log CSV file.
pub fn read_power_log(path: &Path) -> Result<PowerLog<Raw>, PowerError> {
    let file = std::fs::File::open(path).map_err(|e| PowerError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    let log = parse_power_csv(file, &path.display().to_string())?;
    tracing::info!("read {} power samples from {}", log.len(), path.display());
    Ok(log)
}

/// Parses power log CSV from any reader. `source` names the input in errors.
pub fn parse_power_csv<R: Read>(reader: R, source: &str) -> Result<PowerLog<Raw>, PowerError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    let mut capacity: Option<u64> = None;

    for (idx, result) in csv_reader.deserialize::<PowerRow>().enumerate() {
        let row_num = idx + 1;
        let row = result.map_err(|e| PowerError::MalformedLog {
            path: source.to_string(),
            row: row_num,
            detail: e.to_string(),
        })?;

        let sample = PowerSample::new(row.timestamp, row.power_w, row.gpu_util, row.mem_used_bytes);
        sample.check().map_err(|detail| PowerError::MalformedLog {
            path: source.to_string(),
            row: row_num,
            detail,
        })?;

        match (capacity, row.mem_total_bytes) {
            (None, Some(total)) => capacity = Some(total),
            (Some(declared), Some(total)) if declared != total => {
                tracing::warn!(
                    "{source} row {row_num}: mem_total_bytes {total} differs from declared {declared}; keeping the first"
                );
            }
            _ => {}
        }

        samples.push(sample);
    }

    let mut log = PowerLog::new(samples);
    if let Some(bytes) = capacity {
        log = log.with_memory_capacity(bytes);
    }
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_header() {
        let csv = "timestamp,power_W,gpu_util,mem_used_bytes,mem_total_bytes\n\
                   0.0,100.0,50,1000,8000\n\
                   0.5,110.0,55,1100,8000\n";
        let log = parse_power_csv(csv.as_bytes(), "test").unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log.memory_capacity_bytes, Some(8000));
        assert_eq!(log.samples()[1].power_watts, 110.0);
        assert_eq!(log.samples()[1].gpu_util_pct, 55.0);
    }

    #[test]
    fn test_parse_logger_aliases_without_capacity() {
        let csv = "timestamp_s,power_W,gpu_util_percent,mem_used_bytes\n\
                   2.0,90.0,10,1\n\
                   1.0,80.0,5,1\n";
        let log = parse_power_csv(csv.as_bytes(), "test").unwrap();
        assert_eq!(log.memory_capacity_bytes, None);
        assert!(!log.is_ordered());
        let ordered = log.into_ordered();
        assert_eq!(ordered.first_timestamp(), Some(1.0));
    }

    #[test]
    fn test_missing_column_is_malformed() {
        let csv = "timestamp,power_W\n0.0,100.0\n";
        let err = parse_power_csv(csv.as_bytes(), "bad.csv").unwrap_err();
        assert!(matches!(err, PowerError::MalformedLog { row: 1, .. }));
    }

    #[test]
    fn test_negative_power_is_malformed() {
        let csv = "timestamp,power_W,gpu_util,mem_used_bytes\n\
                   0.0,100.0,50,0\n\
                   1.0,-3.0,50,0\n";
        let err = parse_power_csv(csv.as_bytes(), "bad.csv").unwrap_err();
        match err {
            PowerError::MalformedLog { row, detail, .. } => {
                assert_eq!(row, 2);
                assert!(detail.contains("power"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_missing_file() {
        let path = std::env::temp_dir().join("token_energy_test_no_such_power.csv");
        let err = read_power_log(&path).unwrap_err();
        assert!(matches!(err, PowerError::ReadError { .. }));
    }

    #[test]
    fn test_read_from_disk() {
        let dir = std::env::temp_dir().join("token_energy_power_reader");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("power.csv");
        std::fs::write(
            &path,
            "timestamp,power_W,gpu_util,mem_used_bytes\n0,1,0,0\n1,1,0,0\n2,1,0,0\n",
        )
        .unwrap();
        let log = read_power_log(&path).unwrap().into_ordered();
        assert_eq!(log.len(), 3);
        assert_eq!(log.duration(), 2.0);
    }
}
