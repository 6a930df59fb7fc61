// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Utilisation statistics over the samples inside a window.

use crate::{MeasurementWindow, Ordered, PowerLog};

/// Mean GPU and memory utilisation over the logged samples in a window.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct WindowUtilisation {
    /// Logged samples inside the window.
    pub samples: usize,
    /// Mean GPU utilisation in percent, `None` without samples.
    pub mean_gpu_util_pct: Option<f64>,
    /// Mean device memory in use, `None` without samples.
    pub mean_mem_used_bytes: Option<f64>,
    /// Mean memory in use relative to the declared capacity, in percent.
    ///
    /// `None` when the log declares no capacity.
    pub mean_mem_util_pct: Option<f64>,
}

/// Computes utilisation means over the samples inside `window`.
pub fn window_utilisation(log: &PowerLog<Ordered>, window: &MeasurementWindow) -> WindowUtilisation {
    let inside: Vec<_> = log
        .samples()
        .iter()
        .filter(|s| window.contains(s.timestamp))
        .collect();

    if inside.is_empty() {
        return WindowUtilisation {
            samples: 0,
            mean_gpu_util_pct: None,
            mean_mem_used_bytes: None,
            mean_mem_util_pct: None,
        };
    }

    let n = inside.len() as f64;
    let gpu = inside.iter().map(|s| s.gpu_util_pct).sum::<f64>() / n;
    let mem = inside.iter().map(|s| s.mem_used_bytes as f64).sum::<f64>() / n;
    let mem_pct = log
        .memory_capacity_bytes
        .filter(|&cap| cap > 0)
        .map(|cap| 100.0 * mem / cap as f64);

    WindowUtilisation {
        samples: inside.len(),
        mean_gpu_util_pct: Some(gpu),
        mean_mem_used_bytes: Some(mem),
        mean_mem_util_pct: mem_pct,
    }
}
