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

//! System memory resource monitor.
//!
//! Samples the process resident set and system-wide memory through
//! `sysinfo` on the telemetry refresh cadence; the scheduler reads the
//! resulting snapshot for frame metrics and the controller derives its
//! resource-pressure signal from it.

use kairos_core::telemetry::{
    MemorySnapshot, MonitoredResourceType, ResourceMonitor, ResourceUsageReport,
};
use std::borrow::Cow;
use std::sync::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Sysinfo-backed monitor of process and system memory.
pub struct SystemMemoryMonitor {
    pid: Option<Pid>,
    system: Mutex<System>,
    snapshot: Mutex<MemorySnapshot>,
}

impl SystemMemoryMonitor {
    /// Creates the monitor and takes a first sample.
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                log::warn!("Cannot resolve current pid: {e}. Process memory unavailable.");
                None
            }
        };
        let monitor = Self {
            pid,
            system: Mutex::new(System::new()),
            snapshot: Mutex::new(MemorySnapshot::default()),
        };
        monitor.sample();
        monitor
    }

    /// The most recent memory snapshot.
    pub fn latest(&self) -> MemorySnapshot {
        *self.snapshot.lock().unwrap()
    }

    /// Resets peak tracking to the current process usage.
    pub fn reset_peak(&self) {
        let mut snapshot = self.snapshot.lock().unwrap();
        snapshot.peak_process_bytes = snapshot.process_bytes;
    }

    fn sample(&self) {
        let mut system = self.system.lock().unwrap();
        system.refresh_memory();

        let process_bytes = match self.pid {
            Some(pid) => {
                system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
                system.process(pid).map(|p| p.memory()).unwrap_or(0)
            }
            None => 0,
        };

        let mut snapshot = self.snapshot.lock().unwrap();
        snapshot.process_bytes = process_bytes;
        snapshot.peak_process_bytes = snapshot.peak_process_bytes.max(process_bytes);
        snapshot.system_used_bytes = system.used_memory();
        snapshot.system_total_bytes = system.total_memory();

        log::trace!(
            "Memory sample: process {} MiB, system {}/{} MiB.",
            snapshot.process_bytes / (1024 * 1024),
            snapshot.system_used_bytes / (1024 * 1024),
            snapshot.system_total_bytes / (1024 * 1024)
        );
    }
}

impl Default for SystemMemoryMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SystemMemoryMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemMemoryMonitor")
            .field("pid", &self.pid)
            .field("snapshot", &self.latest())
            .finish()
    }
}

impl ResourceMonitor for SystemMemoryMonitor {
    fn monitor_id(&self) -> Cow<'static, str> {
        Cow::Borrowed("system_memory")
    }

    fn resource_type(&self) -> MonitoredResourceType {
        MonitoredResourceType::SystemRam
    }

    fn usage_report(&self) -> ResourceUsageReport {
        let snapshot = self.latest();
        ResourceUsageReport {
            current_bytes: snapshot.process_bytes,
            peak_bytes: Some(snapshot.peak_process_bytes),
            total_capacity_bytes: Some(snapshot.system_total_bytes),
        }
    }

    fn update(&self) {
        self.sample();
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
