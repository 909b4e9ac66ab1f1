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

//! The resource monitor contract.
//!
//! The runtime ships a system-memory monitor; out-of-scope modules (a
//! renderer, an asset system) may register their own implementations for the
//! resources they own.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::borrow::Cow;

/// The category of resource a monitor observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitoredResourceType {
    /// System memory used by this process.
    SystemRam,
    /// Dedicated video memory, for externally registered GPU monitors.
    Vram,
    /// GPU execution load, for externally registered GPU monitors.
    Gpu,
}

impl std::fmt::Display for MonitoredResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A point-in-time usage report from a resource monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUsageReport {
    /// Bytes currently in use.
    pub current_bytes: u64,
    /// Highest usage observed since the monitor started, if tracked.
    pub peak_bytes: Option<u64>,
    /// Total capacity of the resource, if known.
    pub total_capacity_bytes: Option<u64>,
}

impl ResourceUsageReport {
    /// Usage as a fraction of capacity in `[0, 1]`, when capacity is known.
    pub fn pressure(&self) -> Option<f64> {
        let capacity = self.total_capacity_bytes?;
        if capacity == 0 {
            return None;
        }
        Some((self.current_bytes as f64 / capacity as f64).clamp(0.0, 1.0))
    }
}

/// A periodically sampled observer of one resource.
///
/// `update` is invoked by the telemetry service on its refresh cadence;
/// `usage_report` must be cheap and callable at any time in between.
pub trait ResourceMonitor: Send + Sync {
    /// Stable identifier for logs and registries.
    fn monitor_id(&self) -> Cow<'static, str>;

    /// The resource category this monitor observes.
    fn resource_type(&self) -> MonitoredResourceType;

    /// The latest usage numbers.
    fn usage_report(&self) -> ResourceUsageReport;

    /// Refreshes internal state. Monitors with nothing to refresh keep the
    /// default no-op.
    fn update(&self) {}

    /// Typed access for downcasting to a concrete monitor.
    fn as_any(&self) -> &dyn Any;
}

/// Point-in-time memory numbers used by frame metrics and pressure samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Resident set size of this process, in bytes.
    pub process_bytes: u64,
    /// Highest resident set size observed, in bytes.
    pub peak_process_bytes: u64,
    /// System-wide memory in use, in bytes.
    pub system_used_bytes: u64,
    /// Total physical memory, in bytes.
    pub system_total_bytes: u64,
}

impl MemorySnapshot {
    /// System memory pressure in `[0, 1]`; `0.0` when capacity is unknown.
    pub fn pressure(&self) -> f64 {
        if self.system_total_bytes == 0 {
            return 0.0;
        }
        (self.system_used_bytes as f64 / self.system_total_bytes as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pressure_is_usage_over_capacity() {
        let report = ResourceUsageReport {
            current_bytes: 256,
            peak_bytes: Some(512),
            total_capacity_bytes: Some(1024),
        };
        assert_relative_eq!(report.pressure().unwrap(), 0.25);
    }

    #[test]
    fn pressure_unknown_without_capacity() {
        let report = ResourceUsageReport {
            current_bytes: 256,
            peak_bytes: None,
            total_capacity_bytes: None,
        };
        assert_eq!(report.pressure(), None);

        let zero_capacity = ResourceUsageReport {
            total_capacity_bytes: Some(0),
            ..report
        };
        assert_eq!(zero_capacity.pressure(), None);
    }

    #[test]
    fn snapshot_pressure_defaults_to_zero() {
        assert_relative_eq!(MemorySnapshot::default().pressure(), 0.0);

        let snapshot = MemorySnapshot {
            process_bytes: 10,
            peak_process_bytes: 10,
            system_used_bytes: 900,
            system_total_bytes: 1000,
        };
        assert_relative_eq!(snapshot.pressure(), 0.9);
    }
}
