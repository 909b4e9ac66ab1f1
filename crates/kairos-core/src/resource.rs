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

//! Contract between the engine and its resource manager.
//!
//! The concrete manager lives in `kairos-resources`; the engine and the event
//! wiring only see this trait. Modules that need typed pool or cache access
//! downcast through [`ResourceHost::as_any_mut`].

use serde::{Deserialize, Serialize};
use std::any::Any;

/// Outcome of a cleanup or memory-pressure pass, published as
/// `memory:cleanup-completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Pools whose available set was reduced.
    pub pools_shrunk: usize,
    /// Pooled objects dropped by shrinking.
    pub pool_objects_dropped: usize,
    /// Caches emptied outright (memory pressure only).
    pub caches_cleared: usize,
    /// Cache entries removed by idle sweeps or clears.
    pub cache_entries_removed: usize,
}

impl CleanupReport {
    /// Returns `true` if the pass freed nothing.
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }

    /// Folds another pass's counts into this report.
    pub fn absorb(&mut self, other: CleanupReport) {
        self.pools_shrunk += other.pools_shrunk;
        self.pool_objects_dropped += other.pool_objects_dropped;
        self.caches_cleared += other.caches_cleared;
        self.cache_entries_removed += other.cache_entries_removed;
    }
}

/// The engine-facing surface of the resource manager.
///
/// All operations are synchronous, non-blocking, and safe to call repeatedly;
/// pressure handling is the only deliberately aggressive one.
pub trait ResourceHost: Send {
    /// Routine maintenance: shrink pools toward their configured baseline and
    /// sweep idle cache entries.
    fn cleanup(&mut self) -> CleanupReport;

    /// Aggressive response to memory pressure: clear every cache, shrink
    /// every pool, and emit a forced-collection hint where the host runtime
    /// offers one. Idempotent.
    fn handle_memory_pressure(&mut self) -> CleanupReport;

    /// Empties all caches without touching pools.
    fn clear_caches(&mut self) -> CleanupReport;

    /// Typed access for downcasting to the concrete manager.
    fn as_any(&self) -> &dyn Any;

    /// Mutable typed access for downcasting to the concrete manager.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_report_is_noop() {
        assert!(CleanupReport::default().is_noop());
    }

    #[test]
    fn absorb_accumulates_counts() {
        let mut report = CleanupReport {
            pools_shrunk: 1,
            pool_objects_dropped: 4,
            caches_cleared: 0,
            cache_entries_removed: 2,
        };
        report.absorb(CleanupReport {
            pools_shrunk: 0,
            pool_objects_dropped: 0,
            caches_cleared: 3,
            cache_entries_removed: 5,
        });
        assert_eq!(report.pools_shrunk, 1);
        assert_eq!(report.caches_cleared, 3);
        assert_eq!(report.cache_entries_removed, 7);
        assert!(!report.is_noop());
    }
}
