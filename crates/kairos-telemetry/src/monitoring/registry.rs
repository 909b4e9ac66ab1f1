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

//! Registry for managing resource monitors.

use kairos_core::telemetry::ResourceMonitor;
use std::sync::{Arc, Mutex};

/// A thread-safe registry for resource monitors.
///
/// The runtime registers its system memory monitor here; out-of-scope
/// modules register monitors for the resources they own (VRAM, GPU load).
#[derive(Clone, Default)]
pub struct MonitorRegistry {
    monitors: Arc<Mutex<Vec<Arc<dyn ResourceMonitor>>>>,
}

impl MonitorRegistry {
    /// Creates a new, empty monitor registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new resource monitor.
    pub fn register(&self, monitor: Arc<dyn ResourceMonitor>) {
        let monitor_id = monitor.monitor_id().to_string();
        self.monitors.lock().unwrap().push(monitor);
        log::info!("Registered resource monitor: {monitor_id}");
    }

    /// Refreshes every registered monitor.
    pub fn update_all(&self) {
        let monitors = self.monitors.lock().unwrap();
        for monitor in monitors.iter() {
            monitor.update();
        }
    }

    /// Returns a clone of all registered monitors.
    pub fn monitors(&self) -> Vec<Arc<dyn ResourceMonitor>> {
        self.monitors.lock().unwrap().clone()
    }

    /// The number of registered monitors.
    pub fn len(&self) -> usize {
        self.monitors.lock().unwrap().len()
    }

    /// Whether no monitors are registered.
    pub fn is_empty(&self) -> bool {
        self.monitors.lock().unwrap().is_empty()
    }
}

impl std::fmt::Debug for MonitorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorRegistry")
            .field("monitors", &self.len())
            .finish()
    }
}
