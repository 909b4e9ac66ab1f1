// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Abstract definitions for runtime metrics.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

/// A unique, structured identifier for a metric.
///
/// Composed of a namespace and a name (e.g. `engine.frame_time_ms`). Static
/// identifiers are the common case, so both parts are copy-on-write.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricId {
    /// The broad category of the metric (e.g. "engine", "memory").
    pub namespace: Cow<'static, str>,
    /// The specific name of the metric (e.g. "frame_time_ms").
    pub name: Cow<'static, str>,
}

impl MetricId {
    /// Creates a metric identifier from a namespace and a name.
    pub fn new(
        namespace: impl Into<Cow<'static, str>>,
        name: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for MetricId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// The fundamental type of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    /// A value that only ever increases (or resets to zero).
    Counter,
    /// A value that can go up or down.
    Gauge,
    /// A running summary of a distribution of observations.
    Histogram,
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Running summary of a histogram's observations.
///
/// The runtime needs count/sum/extremes, not bucketed quantiles, so the
/// summary stays constant-size regardless of observation volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramSummary {
    /// Number of observations recorded.
    pub count: u64,
    /// Sum of all observations.
    pub sum: f64,
    /// Smallest observation.
    pub min: f64,
    /// Largest observation.
    pub max: f64,
}

impl Default for HistogramSummary {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl HistogramSummary {
    /// Folds one observation into the summary.
    pub fn observe(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Arithmetic mean of the observations, or `None` before the first one.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// An enumeration of possible metric values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetricValue {
    /// A 64-bit unsigned integer for counters.
    Counter(u64),
    /// A 64-bit float for gauges.
    Gauge(f64),
    /// A running distribution summary.
    Histogram(HistogramSummary),
}

impl MetricValue {
    /// Returns the [`MetricType`] corresponding to this value.
    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricValue::Counter(_) => MetricType::Counter,
            MetricValue::Gauge(_) => MetricType::Gauge,
            MetricValue::Histogram(_) => MetricType::Histogram,
        }
    }

    /// Returns the value as a `u64` if it is a `Counter`.
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            MetricValue::Counter(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as an `f64` if it is a `Gauge`.
    pub fn as_gauge(&self) -> Option<f64> {
        match self {
            MetricValue::Gauge(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the distribution summary if it is a `Histogram`.
    pub fn as_histogram(&self) -> Option<&HistogramSummary> {
        match self {
            MetricValue::Histogram(h) => Some(h),
            _ => None,
        }
    }
}

/// Failures of metric registration and recording.
#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    /// A metric was recorded with a value type other than the registered one.
    #[error("metric '{id}' is a {registered}, got a {requested}")]
    TypeMismatch {
        /// The metric in question.
        id: MetricId,
        /// The type the metric was registered with.
        registered: MetricType,
        /// The type of the attempted operation.
        requested: MetricType,
    },

    /// No metric with that identifier is registered.
    #[error("metric '{0}' is not registered")]
    NotFound(MetricId),
}

/// Convenience alias for metric operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Timing snapshot of one completed frame, published as
/// `engine:performance-update`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameMetrics {
    /// Instantaneous frames per second (from the clamped delta).
    pub fps: f32,
    /// Rolling average FPS over the scheduler's sample window.
    pub avg_fps: f32,
    /// Wall-clock cost of the update passes, in milliseconds.
    pub update_time_ms: f32,
    /// Wall-clock cost of the render pass, in milliseconds.
    pub render_time_ms: f32,
    /// Wall-clock cost of the whole tick, in milliseconds.
    pub total_frame_time_ms: f32,
    /// Process memory usage at the last telemetry refresh, in bytes.
    pub memory_usage_bytes: u64,
    /// Frames completed since `start`.
    pub frame_count: u64,
}
