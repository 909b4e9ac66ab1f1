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

//! The heterogeneous registry of named pools and caches.
//!
//! Pools and caches of different element types live behind type-erased
//! entries; typed access goes through `as_any` downcasting, the same pattern
//! the telemetry registries use for monitors and metric backends.

use crate::cache::LruCache;
use crate::pool::{Pool, PoolHandle};
use kairos_core::config::ResourceConfig;
use kairos_core::resource::{CleanupReport, ResourceHost};
use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors returned by registry mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    /// A pool with this name already exists.
    #[error("pool '{0}' already exists")]
    DuplicatePool(String),
    /// A cache with this name already exists.
    #[error("cache '{0}' already exists")]
    DuplicateCache(String),
}

trait DynPool: Send {
    fn shrink_to_watermark(&mut self) -> usize;
    fn shrink_all(&mut self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Send + 'static> DynPool for Pool<T> {
    fn shrink_to_watermark(&mut self) -> usize {
        Pool::shrink_to_watermark(self)
    }

    fn shrink_all(&mut self) -> usize {
        self.shrink(0)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

trait DynCache: Send {
    fn clear_all(&mut self) -> usize;
    fn sweep_idle_entries(&mut self, now: Instant, max_age: Duration) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<K, V> DynCache for LruCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    fn clear_all(&mut self) -> usize {
        self.clear()
    }

    fn sweep_idle_entries(&mut self, now: Instant, max_age: Duration) -> usize {
        self.sweep_idle(now, max_age)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Owns every named pool and cache and applies pressure policies to them.
///
/// The manager is the runtime's [`ResourceHost`]: cleanup and
/// memory-pressure handling run through that trait, and modules that need
/// typed access downcast the host back to a `ResourceManager`.
pub struct ResourceManager {
    config: ResourceConfig,
    pools: HashMap<String, Box<dyn DynPool>>,
    caches: HashMap<String, Box<dyn DynCache>>,
}

impl ResourceManager {
    /// Creates an empty manager governed by `config`.
    pub fn new(config: ResourceConfig) -> Self {
        Self {
            config,
            pools: HashMap::new(),
            caches: HashMap::new(),
        }
    }

    /// Registers a new pool under `name`.
    ///
    /// When pooling is disabled by configuration this is a silent no-op:
    /// the call succeeds but no pool is created, and later `acquire` calls
    /// for the name return `None`.
    pub fn create_pool<T, F, R>(
        &mut self,
        name: &str,
        initial_size: usize,
        ceiling: usize,
        factory: F,
        reset: R,
    ) -> Result<(), ResourceError>
    where
        T: Send + 'static,
        F: FnMut() -> anyhow::Result<T> + Send + 'static,
        R: FnMut(&mut T) + Send + 'static,
    {
        if !self.config.pooling_enabled {
            log::debug!("Pooling disabled by configuration; ignoring pool '{name}'.");
            return Ok(());
        }
        if self.pools.contains_key(name) {
            return Err(ResourceError::DuplicatePool(name.to_string()));
        }

        let pool = Pool::new(initial_size, ceiling, factory, reset);
        self.pools.insert(name.to_string(), Box::new(pool));
        log::debug!(
            "Created pool '{name}' (initial: {initial_size}, ceiling: {ceiling})."
        );
        Ok(())
    }

    /// Typed shared access to a pool.
    pub fn pool<T: Send + 'static>(&self, name: &str) -> Option<&Pool<T>> {
        self.pools.get(name)?.as_any().downcast_ref::<Pool<T>>()
    }

    /// Typed exclusive access to a pool.
    pub fn pool_mut<T: Send + 'static>(&mut self, name: &str) -> Option<&mut Pool<T>> {
        self.pools
            .get_mut(name)?
            .as_any_mut()
            .downcast_mut::<Pool<T>>()
    }

    /// Acquires from the named pool; `None` if the pool is absent, at its
    /// ceiling, or of another element type.
    pub fn acquire<T: Send + 'static>(&mut self, name: &str) -> Option<PoolHandle> {
        self.pool_mut::<T>(name)?.acquire()
    }

    /// Releases a handle back to the named pool.
    pub fn release<T: Send + 'static>(&mut self, name: &str, handle: PoolHandle) -> bool {
        match self.pool_mut::<T>(name) {
            Some(pool) => pool.release(handle),
            None => false,
        }
    }

    /// Registers a new cache under `name` bounded to `max_size` entries.
    pub fn create_cache<K, V>(&mut self, name: &str, max_size: usize) -> Result<(), ResourceError>
    where
        K: Eq + Hash + Clone + Send + 'static,
        V: Send + 'static,
    {
        if self.caches.contains_key(name) {
            return Err(ResourceError::DuplicateCache(name.to_string()));
        }
        self.caches
            .insert(name.to_string(), Box::new(LruCache::<K, V>::new(max_size)));
        log::debug!("Created cache '{name}' (max size: {max_size}).");
        Ok(())
    }

    /// Registers a new cache sized by the configured default capacity.
    pub fn create_default_cache<K, V>(&mut self, name: &str) -> Result<(), ResourceError>
    where
        K: Eq + Hash + Clone + Send + 'static,
        V: Send + 'static,
    {
        let capacity = self.config.default_cache_capacity;
        self.create_cache::<K, V>(name, capacity)
    }

    /// Typed shared access to a cache.
    pub fn cache<K, V>(&self, name: &str) -> Option<&LruCache<K, V>>
    where
        K: Eq + Hash + Clone + Send + 'static,
        V: Send + 'static,
    {
        self.caches
            .get(name)?
            .as_any()
            .downcast_ref::<LruCache<K, V>>()
    }

    /// Typed exclusive access to a cache.
    pub fn cache_mut<K, V>(&mut self, name: &str) -> Option<&mut LruCache<K, V>>
    where
        K: Eq + Hash + Clone + Send + 'static,
        V: Send + 'static,
    {
        self.caches
            .get_mut(name)?
            .as_any_mut()
            .downcast_mut::<LruCache<K, V>>()
    }

    /// The number of registered pools.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// The number of registered caches.
    pub fn cache_count(&self) -> usize {
        self.caches.len()
    }
}

impl ResourceHost for ResourceManager {
    /// Routine cleanup: shrinks each pool's available set down to
    /// `max(initial_size, in_use)` and sweeps idle cache entries older than
    /// the configured max age.
    fn cleanup(&mut self) -> CleanupReport {
        let now = Instant::now();
        let max_age = self.config.cache_max_idle();
        let mut report = CleanupReport::default();

        for (name, pool) in &mut self.pools {
            let dropped = pool.shrink_to_watermark();
            if dropped > 0 {
                report.pools_shrunk += 1;
                report.pool_objects_dropped += dropped;
                log::debug!("Pool '{name}' dropped {dropped} idle object(s).");
            }
        }
        for (name, cache) in &mut self.caches {
            let removed = cache.sweep_idle_entries(now, max_age);
            if removed > 0 {
                report.caches_cleared += 1;
                report.cache_entries_removed += removed;
                log::debug!("Cache '{name}' swept {removed} idle entries.");
            }
        }
        report
    }

    /// The aggressive path: empties every cache, shrinks every pool to its
    /// in-use floor, and falls back to a logged warning in place of the
    /// forced-collection hint this host does not provide. Idempotent.
    fn handle_memory_pressure(&mut self) -> CleanupReport {
        log::warn!("Memory pressure: clearing caches and shrinking all pools.");
        let mut report = self.clear_caches();

        for (name, pool) in &mut self.pools {
            let dropped = pool.shrink_all();
            if dropped > 0 {
                report.pools_shrunk += 1;
                report.pool_objects_dropped += dropped;
                log::debug!("Pool '{name}' dropped {dropped} object(s) under pressure.");
            }
        }

        log::warn!("No forced-collection hint available on this host; skipping.");
        report
    }

    fn clear_caches(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();
        for (name, cache) in &mut self.caches {
            let removed = cache.clear_all();
            if removed > 0 {
                report.caches_cleared += 1;
                report.cache_entries_removed += removed;
                log::debug!("Cache '{name}' cleared {removed} entries.");
            }
        }
        report
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("pools", &self.pools.len())
            .field("caches", &self.caches.len())
            .finish()
    }
}
