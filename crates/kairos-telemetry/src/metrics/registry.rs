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

//! Registry for managing metrics.
//!
//! The registry is the high-level entry point of the metrics system: it
//! registers metrics on a shared backend and hands out cheap, cloneable
//! handles the engine loop records through each frame.

use crate::storage::{backend::MetricsBackend, memory_backend::InMemoryBackend};
use kairos_core::telemetry::metrics::{
    HistogramSummary, MetricId, MetricValue, MetricsResult,
};
use std::sync::Arc;

/// Central registry for the runtime's metrics.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    backend: Arc<dyn MetricsBackend>,
}

impl MetricsRegistry {
    /// Creates a registry over the default in-memory backend.
    pub fn new() -> Self {
        Self {
            backend: Arc::new(InMemoryBackend::new()),
        }
    }

    /// Creates a registry over a custom backend.
    pub fn with_backend(backend: Arc<dyn MetricsBackend>) -> Self {
        Self { backend }
    }

    /// Registers a counter starting at zero.
    pub fn counter(
        &self,
        namespace: impl Into<std::borrow::Cow<'static, str>>,
        name: impl Into<std::borrow::Cow<'static, str>>,
    ) -> CounterHandle {
        let id = MetricId::new(namespace, name);
        self.backend.put(id.clone(), MetricValue::Counter(0));
        CounterHandle {
            id,
            backend: Arc::clone(&self.backend),
        }
    }

    /// Registers a gauge starting at zero.
    pub fn gauge(
        &self,
        namespace: impl Into<std::borrow::Cow<'static, str>>,
        name: impl Into<std::borrow::Cow<'static, str>>,
    ) -> GaugeHandle {
        let id = MetricId::new(namespace, name);
        self.backend.put(id.clone(), MetricValue::Gauge(0.0));
        GaugeHandle {
            id,
            backend: Arc::clone(&self.backend),
        }
    }

    /// Registers an empty histogram.
    pub fn histogram(
        &self,
        namespace: impl Into<std::borrow::Cow<'static, str>>,
        name: impl Into<std::borrow::Cow<'static, str>>,
    ) -> HistogramHandle {
        let id = MetricId::new(namespace, name);
        self.backend
            .put(id.clone(), MetricValue::Histogram(HistogramSummary::default()));
        HistogramHandle {
            id,
            backend: Arc::clone(&self.backend),
        }
    }

    /// Retrieves a metric value by id.
    pub fn get(&self, id: &MetricId) -> MetricsResult<MetricValue> {
        self.backend.get(id)
    }

    /// Whether a metric with this id is registered.
    pub fn contains(&self, id: &MetricId) -> bool {
        self.backend.contains(id)
    }

    /// The number of registered metrics.
    pub fn metric_count(&self) -> usize {
        self.backend.metric_count()
    }

    /// A point-in-time copy of every metric.
    pub fn snapshot(&self) -> Vec<(MetricId, MetricValue)> {
        self.backend.snapshot()
    }

    /// Serializes the current snapshot as one JSON object keyed by the
    /// dotted metric id.
    pub fn export_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (id, value) in self.backend.snapshot() {
            match serde_json::to_value(&value) {
                Ok(json) => {
                    map.insert(id.to_string(), json);
                }
                Err(e) => log::error!("Failed to serialize metric '{id}': {e}"),
            }
        }
        serde_json::Value::Object(map)
    }

    /// Direct access to the backend for advanced operations.
    pub fn backend(&self) -> &Arc<dyn MetricsBackend> {
        &self.backend
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for recording a counter metric.
#[derive(Debug, Clone)]
pub struct CounterHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl CounterHandle {
    /// Adds `delta` to the counter, returning the new value.
    pub fn increment(&self, delta: u64) -> MetricsResult<u64> {
        self.backend.increment_counter(&self.id, delta)
    }

    /// The current counter value.
    pub fn value(&self) -> MetricsResult<u64> {
        Ok(self.backend.get(&self.id)?.as_counter().unwrap_or(0))
    }

    /// The metric's id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Handle for recording a gauge metric.
#[derive(Debug, Clone)]
pub struct GaugeHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl GaugeHandle {
    /// Sets the gauge to `value`.
    pub fn set(&self, value: f64) -> MetricsResult<()> {
        self.backend.set_gauge(&self.id, value)
    }

    /// The current gauge value.
    pub fn value(&self) -> MetricsResult<f64> {
        Ok(self.backend.get(&self.id)?.as_gauge().unwrap_or(0.0))
    }

    /// The metric's id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Handle for recording a histogram metric.
#[derive(Debug, Clone)]
pub struct HistogramHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl HistogramHandle {
    /// Folds one observation into the histogram.
    pub fn observe(&self, sample: f64) -> MetricsResult<()> {
        self.backend.observe_histogram(&self.id, sample)
    }

    /// The current distribution summary.
    pub fn summary(&self) -> MetricsResult<HistogramSummary> {
        Ok(self
            .backend
            .get(&self.id)?
            .as_histogram()
            .copied()
            .unwrap_or_default())
    }

    /// The metric's id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn counter_handle_round_trip() {
        let registry = MetricsRegistry::new();
        let frames = registry.counter("engine", "frames");

        assert_eq!(frames.value().unwrap(), 0);
        frames.increment(1).unwrap();
        frames.increment(2).unwrap();
        assert_eq!(frames.value().unwrap(), 3);
        assert!(registry.contains(frames.id()));
    }

    #[test]
    fn gauge_handle_round_trip() {
        let registry = MetricsRegistry::new();
        let fps = registry.gauge("engine", "fps");

        fps.set(59.7).unwrap();
        assert_relative_eq!(fps.value().unwrap(), 59.7);
    }

    #[test]
    fn histogram_handle_summarizes_observations() {
        let registry = MetricsRegistry::new();
        let frame_time = registry.histogram("engine", "frame_time_ms");

        frame_time.observe(16.0).unwrap();
        frame_time.observe(18.0).unwrap();

        let summary = frame_time.summary().unwrap();
        assert_eq!(summary.count, 2);
        assert_relative_eq!(summary.min, 16.0);
        assert_relative_eq!(summary.max, 18.0);
        assert_relative_eq!(summary.mean().unwrap(), 17.0);
    }

    #[test]
    fn re_registering_resets_the_metric() {
        let registry = MetricsRegistry::new();
        let first = registry.counter("engine", "frames");
        first.increment(10).unwrap();

        let second = registry.counter("engine", "frames");
        assert_eq!(second.value().unwrap(), 0);
        assert_eq!(registry.metric_count(), 1);
    }

    #[test]
    fn export_json_keys_on_dotted_ids() {
        let registry = MetricsRegistry::new();
        registry.gauge("engine", "fps").set(60.0).unwrap();
        registry.counter("engine", "frames").increment(5).unwrap();

        let json = registry.export_json();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["engine.fps"]["Gauge"], 60.0);
        assert_eq!(object["engine.frames"]["Counter"], 5);
    }

    #[test]
    fn handles_share_one_backend() {
        let backend = Arc::new(InMemoryBackend::new());
        let registry = MetricsRegistry::with_backend(backend.clone());
        let frames = registry.counter("engine", "frames");
        frames.increment(4).unwrap();

        assert_eq!(
            backend
                .get(&MetricId::new("engine", "frames"))
                .unwrap()
                .as_counter(),
            Some(4)
        );
    }
}
