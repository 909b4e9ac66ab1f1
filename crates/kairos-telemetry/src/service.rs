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

//! Service tying the metrics registry and resource monitors together.

use crate::metrics::registry::MetricsRegistry;
use crate::monitoring::memory_monitor::SystemMemoryMonitor;
use crate::monitoring::registry::MonitorRegistry;
use kairos_core::config::TelemetryConfig;
use kairos_core::telemetry::MemorySnapshot;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Owns the metrics registry and the resource monitors.
///
/// The engine loop calls [`tick`](Self::tick) once per frame with the frame
/// timestamp; monitors only refresh when the configured interval has
/// elapsed, so telemetry cost is independent of frame rate.
#[derive(Debug)]
pub struct TelemetryService {
    metrics: MetricsRegistry,
    monitors: MonitorRegistry,
    memory: Arc<SystemMemoryMonitor>,
    refresh_interval: Duration,
    last_refresh: Option<Instant>,
}

impl TelemetryService {
    /// Creates the service and registers the system memory monitor.
    pub fn new(config: &TelemetryConfig) -> Self {
        let monitors = MonitorRegistry::new();
        let memory = Arc::new(SystemMemoryMonitor::new());
        monitors.register(memory.clone());

        Self {
            metrics: MetricsRegistry::new(),
            monitors,
            memory,
            refresh_interval: config.refresh_interval(),
            last_refresh: None,
        }
    }

    /// Refreshes all monitors if the interval has elapsed.
    ///
    /// Returns `true` when a refresh ran.
    pub fn tick(&mut self, now: Instant) -> bool {
        let due = self
            .last_refresh
            .is_none_or(|last| now.duration_since(last) >= self.refresh_interval);
        if !due {
            return false;
        }
        log::trace!("Refreshing all resource monitors.");
        self.monitors.update_all();
        self.last_refresh = Some(now);
        true
    }

    /// The memory numbers from the most recent refresh.
    pub fn latest_memory(&self) -> MemorySnapshot {
        self.memory.latest()
    }

    /// The metrics registry.
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// The monitor registry, for registering external monitors.
    pub fn monitors(&self) -> &MonitorRegistry {
        &self.monitors
    }
}
