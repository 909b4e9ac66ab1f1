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

//! # Kairos Telemetry
//!
//! Collection machinery for the runtime's metrics and resource monitors:
//! a metrics registry with counter/gauge/histogram handles over a pluggable
//! storage backend, a monitor registry with a sysinfo-backed system memory
//! monitor, the interval-gated [`TelemetryService`] the engine ticks each
//! frame, and the `env_logger` bootstrap.
//!
//! The shared vocabulary (metric ids and values, the
//! [`ResourceMonitor`](kairos_core::telemetry::ResourceMonitor) trait) lives
//! in `kairos-core`; this crate provides the implementations.

#![warn(missing_docs)]

pub mod logging;
pub mod metrics;
pub mod monitoring;
pub mod service;
pub mod storage;

pub use metrics::registry::{CounterHandle, GaugeHandle, HistogramHandle, MetricsRegistry};
pub use monitoring::memory_monitor::SystemMemoryMonitor;
pub use monitoring::registry::MonitorRegistry;
pub use service::TelemetryService;
pub use storage::backend::MetricsBackend;
pub use storage::memory_backend::InMemoryBackend;
