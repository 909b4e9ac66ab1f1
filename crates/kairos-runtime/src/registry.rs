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

//! The module registry and its deterministic schedule order.
//!
//! The registry is purely structural: it owns the module records and the
//! cached invocation order. Lifecycle invocation (init, destroy, the frame
//! passes) is the scheduler's job, so that every callback runs under the
//! same isolation guard.

use kairos_core::error::RegistryError;
use kairos_core::module::{CapabilitySet, Module};
use std::time::Duration;

/// One registered unit of per-frame work and its bookkeeping.
pub struct ModuleRecord {
    pub(crate) name: String,
    pub(crate) module: Box<dyn Module>,
    pub(crate) capabilities: CapabilitySet,
    pub(crate) priority: i32,
    pub(crate) enabled: bool,
    pub(crate) initialized: bool,
    pub(crate) seq: u64,
    pub(crate) last_update: Duration,
    pub(crate) last_render: Duration,
    pub(crate) failures: u32,
}

impl std::fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRecord")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("priority", &self.priority)
            .field("enabled", &self.enabled)
            .field("initialized", &self.initialized)
            .field("seq", &self.seq)
            .field("last_update", &self.last_update)
            .field("last_render", &self.last_render)
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

impl ModuleRecord {
    /// The module's registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The capability set declared at registration.
    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    /// The module's priority; higher runs first.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Whether the scheduler currently runs this module.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `init` has completed successfully.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Wall-clock cost of the module's last `update` call.
    pub fn last_update(&self) -> Duration {
        self.last_update
    }

    /// Wall-clock cost of the module's last `render` call.
    pub fn last_render(&self) -> Duration {
        self.last_render
    }

    /// Caught failures since registration (cleared by successful recovery).
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

/// Holds module records and keeps the schedule order current.
///
/// The schedule order is a total order: priority descending, ties broken by
/// registration sequence. It is recomputed on every mutation of the set or
/// of a priority, never during a frame, so the scheduler's passes iterate a
/// stable snapshot.
#[derive(Default)]
pub struct ModuleRegistry {
    records: Vec<ModuleRecord>,
    order: Vec<usize>,
    next_seq: u64,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `module` under `name` with `priority`.
    ///
    /// Rejects duplicate names and modules declaring no capability at all.
    pub fn register(
        &mut self,
        name: &str,
        module: Box<dyn Module>,
        priority: i32,
    ) -> Result<(), RegistryError> {
        if self.index_of(name).is_some() {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        let capabilities = module.capabilities();
        if capabilities.is_empty() {
            return Err(RegistryError::NoCapabilities(name.to_string()));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.records.push(ModuleRecord {
            name: name.to_string(),
            module,
            capabilities,
            priority,
            enabled: true,
            initialized: false,
            seq,
            last_update: Duration::ZERO,
            last_render: Duration::ZERO,
            failures: 0,
        });
        self.recompute_order();
        log::info!("Registered module '{name}' (priority {priority}, {capabilities:?}).");
        Ok(())
    }

    /// Removes and returns the record for `name`.
    ///
    /// The caller is responsible for running `destroy` on an initialized
    /// record; the scheduler does so under its isolation guard.
    pub fn remove(&mut self, name: &str) -> Result<ModuleRecord, RegistryError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| RegistryError::UnknownModule(name.to_string()))?;
        let record = self.records.remove(index);
        self.recompute_order();
        log::info!("Unregistered module '{name}'.");
        Ok(record)
    }

    /// Enables or disables a module without removing it.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), RegistryError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| RegistryError::UnknownModule(name.to_string()))?;
        self.records[index].enabled = enabled;
        Ok(())
    }

    /// Changes a module's priority and recomputes the schedule order.
    pub fn set_priority(&mut self, name: &str, priority: i32) -> Result<(), RegistryError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| RegistryError::UnknownModule(name.to_string()))?;
        self.records[index].priority = priority;
        self.recompute_order();
        Ok(())
    }

    /// Whether a module named `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// The number of registered modules.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no module is registered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record indices in schedule order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Module names in schedule order.
    pub fn ordered_names(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&index| self.records[index].name.as_str())
            .collect()
    }

    /// The record at `index`.
    pub fn record(&self, index: usize) -> &ModuleRecord {
        &self.records[index]
    }

    /// The record at `index`, mutably.
    pub fn record_mut(&mut self, index: usize) -> &mut ModuleRecord {
        &mut self.records[index]
    }

    /// The record for `name`, if registered.
    pub fn by_name(&self, name: &str) -> Option<&ModuleRecord> {
        self.index_of(name).map(|index| &self.records[index])
    }

    /// The record for `name`, mutably.
    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut ModuleRecord> {
        self.index_of(name)
            .map(move |index| &mut self.records[index])
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.records.iter().position(|record| record.name == name)
    }

    fn recompute_order(&mut self) {
        let mut order: Vec<usize> = (0..self.records.len()).collect();
        order.sort_by(|&a, &b| {
            let ra = &self.records[a];
            let rb = &self.records[b];
            rb.priority.cmp(&ra.priority).then(ra.seq.cmp(&rb.seq))
        });
        self.order = order;
    }
}
