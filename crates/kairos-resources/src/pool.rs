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

//! Object pooling with lazy growth and a hard ceiling.
//!
//! A [`Pool`] keeps two disjoint sets of objects, *available* and *in-use*.
//! Objects are produced by a fallible factory, recycled through a reset
//! function on release, and never handed out past the configured ceiling:
//! at the ceiling, `acquire` returns `None` and the caller degrades
//! gracefully instead of blocking.

/// Handle to an object acquired from a [`Pool`].
///
/// Handles are generational: once the object is released (or its slot is
/// dropped by a shrink), every handle issued before that moment goes stale
/// and is rejected by `get`, `get_mut`, and `release`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    index: usize,
    generation: u32,
}

/// Point-in-time pool sizes plus cumulative counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Objects sitting in the available set.
    pub available: usize,
    /// Objects currently acquired.
    pub in_use: usize,
    /// Factory invocations that produced an object, since pool creation.
    pub total_created: u64,
    /// Successful `acquire` calls since pool creation.
    pub total_acquired: u64,
    /// Successful `release` calls since pool creation.
    pub total_released: u64,
    /// Factory invocations that failed, since pool creation.
    pub factory_failures: u64,
}

struct Slot<T> {
    value: Option<T>,
    generation: u32,
    in_use: bool,
}

/// A generational object pool.
///
/// Slots live in one backing vector; the free list and the vacant list hold
/// indices into it. An object is in exactly one of the two sets at any time,
/// and a failing factory never corrupts that bookkeeping.
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    vacant: Vec<usize>,
    initial_size: usize,
    ceiling: usize,
    factory: Box<dyn FnMut() -> anyhow::Result<T> + Send>,
    reset: Box<dyn FnMut(&mut T) + Send>,
    total_created: u64,
    total_acquired: u64,
    total_released: u64,
    factory_failures: u64,
}

impl<T> Pool<T> {
    /// Creates a pool and pre-populates `initial_size` objects.
    ///
    /// If the factory fails during pre-population the pool stops early with
    /// a logged error and starts with however many objects were produced.
    pub fn new<F, R>(initial_size: usize, ceiling: usize, factory: F, reset: R) -> Self
    where
        F: FnMut() -> anyhow::Result<T> + Send + 'static,
        R: FnMut(&mut T) + Send + 'static,
    {
        let mut pool = Self {
            slots: Vec::new(),
            free: Vec::new(),
            vacant: Vec::new(),
            initial_size,
            ceiling,
            factory: Box::new(factory),
            reset: Box::new(reset),
            total_created: 0,
            total_acquired: 0,
            total_released: 0,
            factory_failures: 0,
        };

        for _ in 0..initial_size.min(ceiling) {
            match (pool.factory)() {
                Ok(value) => {
                    let index = pool.store(value);
                    pool.free.push(index);
                    pool.total_created += 1;
                }
                Err(e) => {
                    log::error!(
                        "Pool factory failed during pre-population after {} object(s): {e:#}",
                        pool.free.len()
                    );
                    pool.factory_failures += 1;
                    break;
                }
            }
        }

        pool
    }

    /// Takes an object out of the pool.
    ///
    /// Pops from the available set first. When that is empty and the pool is
    /// below its ceiling, a new object is created lazily; a factory failure
    /// is logged and counted, and the call returns `None`. At the ceiling
    /// the call returns `None` without invoking the factory.
    pub fn acquire(&mut self) -> Option<PoolHandle> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.in_use = true;
            self.total_acquired += 1;
            return Some(PoolHandle {
                index,
                generation: slot.generation,
            });
        }

        if self.live() >= self.ceiling {
            return None;
        }

        match (self.factory)() {
            Ok(value) => {
                let index = self.store(value);
                let slot = &mut self.slots[index];
                slot.in_use = true;
                self.total_created += 1;
                self.total_acquired += 1;
                Some(PoolHandle {
                    index,
                    generation: slot.generation,
                })
            }
            Err(e) => {
                log::error!("Pool factory failed during acquire: {e:#}");
                self.factory_failures += 1;
                None
            }
        }
    }

    /// Returns an object to the available set.
    ///
    /// Runs the reset function on the object first. Stale or foreign handles
    /// (wrong generation, not in use) are a no-op.
    ///
    /// ## Returns
    /// `true` if the handle was valid and the object was recycled.
    pub fn release(&mut self, handle: PoolHandle) -> bool {
        let slot = match self.slots.get_mut(handle.index) {
            Some(slot) => slot,
            None => return false,
        };
        if slot.generation != handle.generation || !slot.in_use {
            return false;
        }
        let value = match slot.value.as_mut() {
            Some(value) => value,
            None => return false,
        };

        (self.reset)(value);
        slot.in_use = false;
        // Invalidate every handle issued for this acquisition.
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.total_released += 1;
        true
    }

    /// A reference to the object behind a live handle.
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        let slot = self.slots.get(handle.index)?;
        if slot.generation != handle.generation || !slot.in_use {
            return None;
        }
        slot.value.as_ref()
    }

    /// A mutable reference to the object behind a live handle.
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index)?;
        if slot.generation != handle.generation || !slot.in_use {
            return None;
        }
        slot.value.as_mut()
    }

    /// Drops available objects until at most `target_available` remain.
    ///
    /// In-use objects are never touched.
    ///
    /// ## Returns
    /// The number of objects dropped.
    pub fn shrink(&mut self, target_available: usize) -> usize {
        let mut dropped = 0;
        while self.free.len() > target_available {
            match self.free.pop() {
                Some(index) => {
                    let slot = &mut self.slots[index];
                    slot.value = None;
                    slot.generation = slot.generation.wrapping_add(1);
                    self.vacant.push(index);
                    dropped += 1;
                }
                None => break,
            }
        }
        dropped
    }

    /// Drops available objects down to `max(initial_size, in_use)`.
    ///
    /// This is the routine-cleanup shrink target: a busy pool keeps a large
    /// available set, an idle one returns to its initial footprint.
    pub fn shrink_to_watermark(&mut self) -> usize {
        let target = self.initial_size.max(self.in_use());
        self.shrink(target)
    }

    /// The number of objects in the available set.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// The number of objects currently acquired.
    pub fn in_use(&self) -> usize {
        self.live() - self.free.len()
    }

    /// The combined size of the available and in-use sets.
    pub fn live(&self) -> usize {
        self.slots.len() - self.vacant.len()
    }

    /// The hard ceiling on combined pool size.
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// The configured pre-population size.
    pub fn initial_size(&self) -> usize {
        self.initial_size
    }

    /// Current sizes and cumulative counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            available: self.available(),
            in_use: self.in_use(),
            total_created: self.total_created,
            total_acquired: self.total_acquired,
            total_released: self.total_released,
            factory_failures: self.factory_failures,
        }
    }

    fn store(&mut self, value: T) -> usize {
        match self.vacant.pop() {
            Some(index) => {
                self.slots[index].value = Some(value);
                index
            }
            None => {
                self.slots.push(Slot {
                    value: Some(value),
                    generation: 0,
                    in_use: false,
                });
                self.slots.len() - 1
            }
        }
    }
}

impl<T> std::fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("available", &self.available())
            .field("in_use", &self.in_use())
            .field("ceiling", &self.ceiling)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting_pool(initial: usize, ceiling: usize) -> (Pool<u32>, Arc<AtomicU32>) {
        let created = Arc::new(AtomicU32::new(0));
        let created_clone = Arc::clone(&created);
        let pool = Pool::new(
            initial,
            ceiling,
            move || Ok(created_clone.fetch_add(1, Ordering::SeqCst)),
            |value| *value = 0,
        );
        (pool, created)
    }

    #[test]
    fn new_prepopulates_initial_size() {
        let (pool, created) = counting_pool(5, 20);
        let stats = pool.stats();
        assert_eq!(stats.available, 5);
        assert_eq!(stats.in_use, 0);
        assert_eq!(stats.total_created, 5);
        assert_eq!(created.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn acquire_prefers_available_then_grows() {
        let (mut pool, created) = counting_pool(1, 2);

        let first = pool.acquire().unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 1, "no growth yet");

        let _second = pool.acquire().unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 2, "grew lazily");

        assert!(pool.acquire().is_none(), "at ceiling");
        assert!(pool.release(first));
        assert!(pool.acquire().is_some(), "released slot is reusable");
    }

    #[test]
    fn acquire_at_ceiling_returns_none() {
        let (mut pool, _created) = counting_pool(5, 20);

        let handles: Vec<_> = (0..20).map(|_| pool.acquire().unwrap()).collect();
        assert_eq!(pool.in_use(), 20);

        assert!(pool.acquire().is_none(), "21st acquire must fail");
        let stats = pool.stats();
        assert_eq!(stats.total_created, 20);
        assert_eq!(stats.total_acquired, 20);

        assert!(pool.release(handles[0]));
        assert!(pool.acquire().is_some());
    }

    #[test]
    fn release_resets_object_and_rejects_stale_handles() {
        let (mut pool, _created) = counting_pool(1, 1);

        let handle = pool.acquire().unwrap();
        *pool.get_mut(handle).unwrap() = 99;
        assert!(pool.release(handle));
        assert!(!pool.release(handle), "double release is a no-op");

        let recycled = pool.acquire().unwrap();
        assert_eq!(*pool.get(recycled).unwrap(), 0, "reset ran on release");
        assert!(
            pool.get(handle).is_none(),
            "handle from the previous acquisition is stale"
        );
        assert_eq!(pool.stats().total_released, 1);
    }

    #[test]
    fn factory_failure_during_acquire_is_contained() {
        let mut pool: Pool<u32> = Pool::new(
            0,
            4,
            || anyhow::bail!("allocation refused"),
            |_| {},
        );

        assert!(pool.acquire().is_none());
        let stats = pool.stats();
        assert_eq!(stats.factory_failures, 1);
        assert_eq!(stats.total_created, 0);
        assert_eq!(stats.available + stats.in_use, 0, "bookkeeping intact");
    }

    #[test]
    fn factory_failure_during_prepopulation_stops_early() {
        let created = Arc::new(AtomicU32::new(0));
        let created_clone = Arc::clone(&created);
        let pool: Pool<u32> = Pool::new(
            5,
            20,
            move || {
                let n = created_clone.fetch_add(1, Ordering::SeqCst);
                if n >= 3 {
                    anyhow::bail!("out of objects")
                }
                Ok(n)
            },
            |_| {},
        );

        let stats = pool.stats();
        assert_eq!(stats.available, 3);
        assert_eq!(stats.total_created, 3);
        assert_eq!(stats.factory_failures, 1);
    }

    #[test]
    fn shrink_drops_available_only() {
        let (mut pool, _created) = counting_pool(5, 20);
        let held = pool.acquire().unwrap();

        let dropped = pool.shrink(1);
        assert_eq!(dropped, 3);
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.in_use(), 1);
        assert!(pool.get(held).is_some(), "in-use object survived the shrink");
    }

    #[test]
    fn shrink_to_watermark_keeps_max_of_initial_and_in_use() {
        let (mut pool, _created) = counting_pool(2, 20);

        // Grow the pool well past its initial size, then idle it.
        let handles: Vec<_> = (0..10).map(|_| pool.acquire().unwrap()).collect();
        for handle in handles {
            pool.release(handle);
        }
        assert_eq!(pool.available(), 10);

        let dropped = pool.shrink_to_watermark();
        assert_eq!(dropped, 8);
        assert_eq!(pool.available(), 2, "idle pool returns to initial size");
    }

    #[test]
    fn shrunk_slot_is_reused_for_lazy_growth() {
        let (mut pool, created) = counting_pool(3, 3);
        pool.shrink(0);
        assert_eq!(pool.live(), 0);

        let handle = pool.acquire().unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 4, "factory ran again");
        assert!(pool.get(handle).is_some());
        assert_eq!(pool.live(), 1);
    }
}
