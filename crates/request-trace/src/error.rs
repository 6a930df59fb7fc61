// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for request log handling.

/// Errors that can occur when reading or validating request logs.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Failed to open or read a request log file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },

    /// A row could not be decoded into a request record.
    #[error("malformed request log {path} (row {row}): {detail}")]
    MalformedLog {
        path: String,
        row: usize,
        detail: String,
    },

    /// A record violates a field invariant.
    #[error("invalid request '{request_id}': {detail}")]
    InvalidRecord { request_id: String, detail: String },

    /// Two records share the same request id.
    #[error("duplicate request id '{0}'")]
    DuplicateRequestId(String),
}
