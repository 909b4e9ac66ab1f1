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

//! The interface metric storage backends implement.

use kairos_core::telemetry::metrics::{
    MetricId, MetricType, MetricValue, MetricsError, MetricsResult,
};
use std::fmt::Debug;

/// Storage for metric values, keyed by [`MetricId`].
///
/// Backends are shared behind an `Arc` between the registry and its handles,
/// so every operation takes `&self`. The convenience methods implement the
/// common read-modify-write cycles with type checking on top of the storage
/// primitives.
pub trait MetricsBackend: Send + Sync + Debug + 'static {
    /// Typed access for downcasting to a concrete backend.
    fn as_any(&self) -> &dyn std::any::Any;

    /// Stores or replaces a metric value.
    fn put(&self, id: MetricId, value: MetricValue);

    /// Retrieves a metric value by id.
    fn get(&self, id: &MetricId) -> MetricsResult<MetricValue>;

    /// Whether a metric with this id is stored.
    fn contains(&self, id: &MetricId) -> bool;

    /// Removes a metric; an error if the id is unknown.
    fn remove(&self, id: &MetricId) -> MetricsResult<()>;

    /// A point-in-time copy of every stored metric.
    fn snapshot(&self) -> Vec<(MetricId, MetricValue)>;

    /// Removes every stored metric.
    fn clear_all(&self);

    /// The number of stored metrics.
    fn metric_count(&self) -> usize;

    /// Adds `delta` to a counter, returning the new value.
    fn increment_counter(&self, id: &MetricId, delta: u64) -> MetricsResult<u64> {
        match self.get(id)? {
            MetricValue::Counter(value) => {
                let next = value.saturating_add(delta);
                self.put(id.clone(), MetricValue::Counter(next));
                Ok(next)
            }
            other => Err(MetricsError::TypeMismatch {
                id: id.clone(),
                registered: other.metric_type(),
                requested: MetricType::Counter,
            }),
        }
    }

    /// Sets a gauge to `value`.
    fn set_gauge(&self, id: &MetricId, value: f64) -> MetricsResult<()> {
        match self.get(id)? {
            MetricValue::Gauge(_) => {
                self.put(id.clone(), MetricValue::Gauge(value));
                Ok(())
            }
            other => Err(MetricsError::TypeMismatch {
                id: id.clone(),
                registered: other.metric_type(),
                requested: MetricType::Gauge,
            }),
        }
    }

    /// Folds one observation into a histogram.
    fn observe_histogram(&self, id: &MetricId, sample: f64) -> MetricsResult<()> {
        match self.get(id)? {
            MetricValue::Histogram(mut summary) => {
                summary.observe(sample);
                self.put(id.clone(), MetricValue::Histogram(summary));
                Ok(())
            }
            other => Err(MetricsError::TypeMismatch {
                id: id.clone(),
                registered: other.metric_type(),
                requested: MetricType::Histogram,
            }),
        }
    }
}
