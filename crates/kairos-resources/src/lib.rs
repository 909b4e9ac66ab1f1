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

//! Pooling, caching, and memory-pressure handling for the runtime.
//!
//! The [`ResourceManager`] owns named object pools and LRU caches behind
//! type-erased entries and implements the runtime's `ResourceHost` contract:
//! routine cleanup shrinks idle capacity, and the memory-pressure path
//! reclaims everything that is not in use.

pub mod cache;
pub mod manager;
pub mod pool;

pub use cache::{CacheStats, LruCache};
pub use manager::{ResourceError, ResourceManager};
pub use pool::{Pool, PoolHandle, PoolStats};
