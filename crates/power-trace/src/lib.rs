// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # power-trace
//!
//! Turns a captured hardware power log into energy.
//!
//! # Components
//! - [`PowerLog`] — ordered power samples with the device's declared
//!   memory capacity and peak bandwidth (type-state: `Raw` → `Ordered`).
//! - [`select_window`] — the steady-state [`MeasurementWindow`] after
//!   warmup and before cooldown.
//! - [`integrate`] — trapezoidal energy over a window, with boundary
//!   interpolation, average and peak power.
//! - [`estimate_idle`] — a trimmed-mean [`IdleBaseline`] from an idle log.
//! - [`window_utilisation`] — mean GPU/memory utilisation in a window.
//!
//! Everything here is a pure computation over data already in memory;
//! the only I/O is [`read_power_log`].
//!
//! # Example
//! ```no_run
//! use power_trace::{integrate, read_power_log, select_window};
//! use std::path::Path;
//!
//! let log = read_power_log(Path::new("active.csv")).unwrap().into_ordered();
//! let window = select_window(&log, 30.0, 10.0).unwrap();
//! let energy = integrate(&log, &window).unwrap();
//! println!("{:.1} J over {window}", energy.energy_j);
//! ```

pub mod baseline;
mod error;
mod integrate;
mod reader;
mod sample;
mod stats;
mod window;

pub use baseline::{estimate_idle, BaselineParams, BaselineSource, IdleBaseline};
pub use error::PowerError;
pub use integrate::{integrate, trapezoid, Integration};
pub use reader::{parse_power_csv, read_power_log};
pub use sample::{LogState, Ordered, PowerLog, PowerSample, Raw};
pub use stats::{window_utilisation, WindowUtilisation};
pub use window::{select_window, MeasurementWindow};
