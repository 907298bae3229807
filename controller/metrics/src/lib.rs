// Copyright (c) 2026 the rocket-controller contributors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Metric name constants and a thin Prometheus exporter wrapper for the
//! rocket controller. Kept as its own crate so the core controller crate
//! does not need to pull in `metrics-exporter-prometheus` just to read a
//! handful of string constants.

pub mod names;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Installs the process-wide Prometheus recorder and gives every gauge an
/// initial value, so `/metrics` reports a stable set of series even before
/// the first iteration starts.
pub fn initialize() {
    if let Err(error) = PrometheusBuilder::new().install() {
        tracing::warn!("Failed to install the metrics recorder: {error}");
        return;
    }

    for name in names::GAUGE_NAMES {
        metrics::gauge!(name, 0.0);
    }
    for name in names::COUNTER_NAMES {
        metrics::counter!(name, 0);
    }
}
