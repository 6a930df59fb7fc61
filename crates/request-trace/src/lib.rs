// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # request-trace
//!
//! Reads the load generator's per-request log and reduces it to the token
//! totals billed to a measurement window.
//!
//! - [`RequestLog`] — validated records, unique by id, sorted by submission.
//! - [`aggregate`] — prompt/completion totals, request counts and mean
//!   latency for a [`power_trace::MeasurementWindow`], under an
//!   [`OverlapPolicy`] for boundary-spanning requests.
//!
//! Failed requests are counted but never billed.

mod aggregate;
mod error;
mod reader;
mod record;

pub use aggregate::{aggregate, OverlapPolicy, RequestTokens, TokenAggregate};
pub use error::RequestError;
pub use reader::{parse_request_csv, read_request_log};
pub use record::{RequestLog, RequestRecord};
