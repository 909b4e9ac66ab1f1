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

//! In-memory metrics storage.

use crate::storage::backend::MetricsBackend;
use kairos_core::telemetry::metrics::{
    MetricId, MetricType, MetricValue, MetricsError, MetricsResult,
};
use std::collections::HashMap;
use std::sync::RwLock;

/// The default backend: an `RwLock`-guarded map.
///
/// Reads (snapshots, gauge/counter lookups) take the shared lock, so the
/// engine thread writing a handful of metrics per frame never contends with
/// observers exporting them.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    storage: RwLock<HashMap<MetricId, MetricValue>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored metrics of one type.
    pub fn metrics_by_type(&self, metric_type: MetricType) -> Vec<(MetricId, MetricValue)> {
        let storage = self.storage.read().unwrap();
        storage
            .iter()
            .filter(|(_, value)| value.metric_type() == metric_type)
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect()
    }

    /// All stored metrics in one namespace.
    pub fn metrics_by_namespace(&self, namespace: &str) -> Vec<(MetricId, MetricValue)> {
        let storage = self.storage.read().unwrap();
        storage
            .iter()
            .filter(|(id, _)| id.namespace == namespace)
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect()
    }
}

impl MetricsBackend for InMemoryBackend {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn put(&self, id: MetricId, value: MetricValue) {
        self.storage.write().unwrap().insert(id, value);
    }

    fn get(&self, id: &MetricId) -> MetricsResult<MetricValue> {
        self.storage
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| MetricsError::NotFound(id.clone()))
    }

    fn contains(&self, id: &MetricId) -> bool {
        self.storage.read().unwrap().contains_key(id)
    }

    fn remove(&self, id: &MetricId) -> MetricsResult<()> {
        self.storage
            .write()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MetricsError::NotFound(id.clone()))
    }

    fn snapshot(&self) -> Vec<(MetricId, MetricValue)> {
        let storage = self.storage.read().unwrap();
        storage
            .iter()
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect()
    }

    fn clear_all(&self) {
        self.storage.write().unwrap().clear();
    }

    fn metric_count(&self) -> usize {
        self.storage.read().unwrap().len()
    }
}
