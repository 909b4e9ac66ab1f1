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

//! Runtime configuration surface.
//!
//! Every option has a default and is independently overridable, so a host can
//! ship a partial JSON document that only names the fields it cares about.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Frame scheduler options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Fixed simulation rate in ticks per second.
    pub target_tick_rate: f64,
    /// Delta clamp expressed as a minimum effective frame rate. A raw delta
    /// larger than `1 / min_effective_fps` is never treated as real time, so
    /// a stalled host cannot trigger a catch-up spiral.
    pub min_effective_fps: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            target_tick_rate: 60.0,
            min_effective_fps: 20.0,
        }
    }
}

impl SchedulerConfig {
    /// Duration of one fixed simulation step.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_tick_rate)
    }

    /// Largest delta the scheduler will accumulate from a single tick.
    pub fn max_delta(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.min_effective_fps)
    }
}

/// Adaptive performance controller options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Milliseconds between analysis passes.
    pub analysis_interval_ms: u64,
    /// Minimum milliseconds between two mitigation rounds.
    pub cooldown_ms: u64,
    /// Milliseconds to wait before measuring a mitigation's actual effect.
    pub impact_delay_ms: u64,
    /// The frame rate the controller is trying to hold.
    pub target_fps: f32,
    /// Resource pressure (0..1) above which a resource bottleneck is flagged.
    pub pressure_warn: f32,
    /// Resource pressure (0..1) that forces mitigation regardless of level.
    pub pressure_critical: f32,
    /// Dropped-frame count within the sample window that forces mitigation.
    pub frame_drop_threshold: usize,
    /// Apply every applicable strategy per cycle instead of only the most
    /// impactful one.
    pub aggressive: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            analysis_interval_ms: 2000,
            cooldown_ms: 5000,
            impact_delay_ms: 3000,
            target_fps: 60.0,
            pressure_warn: 0.75,
            pressure_critical: 0.90,
            frame_drop_threshold: 5,
            aggressive: false,
        }
    }
}

impl ControllerConfig {
    /// Interval between analysis passes.
    pub fn analysis_interval(&self) -> Duration {
        Duration::from_millis(self.analysis_interval_ms)
    }

    /// Mitigation cooldown window.
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Delay before a mitigation's effect is re-measured.
    pub fn impact_delay(&self) -> Duration {
        Duration::from_millis(self.impact_delay_ms)
    }
}

/// Resource manager options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// When `false`, `create_pool` becomes a no-op and every acquire misses.
    pub pooling_enabled: bool,
    /// Cache entries untouched for longer than this are removed by `cleanup`.
    pub cache_max_idle_ms: u64,
    /// Capacity used when a cache is created without an explicit size.
    pub default_cache_capacity: usize,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            pooling_enabled: true,
            cache_max_idle_ms: 60_000,
            default_cache_capacity: 128,
        }
    }
}

impl ResourceConfig {
    /// Maximum idle age before a cache entry is swept.
    pub fn cache_max_idle(&self) -> Duration {
        Duration::from_millis(self.cache_max_idle_ms)
    }
}

/// Telemetry refresh options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Milliseconds between resource monitor refreshes.
    pub refresh_interval_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 1000,
        }
    }
}

impl TelemetryConfig {
    /// Interval between monitor refreshes.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

/// Error isolation and recovery options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Process-wide error budget ceiling. Crossing it pauses the scheduler
    /// and starts a recovery plan.
    pub error_ceiling: u32,
    /// Disable a module after its first caught failure.
    pub disable_on_error: bool,
    /// Reinitialization attempts before the engine enters the failed state.
    pub retry_count: u32,
    /// Milliseconds between recovery attempts.
    pub retry_delay_ms: u64,
    /// Amount subtracted from the process error budget per clean frame.
    pub budget_decay: f64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            error_ceiling: 10,
            disable_on_error: true,
            retry_count: 3,
            retry_delay_ms: 1000,
            budget_decay: 0.1,
        }
    }
}

impl RecoveryConfig {
    /// Delay between recovery attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frame scheduler options.
    pub scheduler: SchedulerConfig,
    /// Adaptive performance controller options.
    pub controller: ControllerConfig,
    /// Resource manager options.
    pub resources: ResourceConfig,
    /// Telemetry refresh options.
    pub telemetry: TelemetryConfig,
    /// Error isolation and recovery options.
    pub recovery: RecoveryConfig,
}

impl EngineConfig {
    /// Parses a configuration from a JSON document.
    ///
    /// Missing fields fall back to their defaults, so `{}` is a valid
    /// document and so is a partial override of a single section.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("failed to parse engine configuration")
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        Self::from_json_str(&contents)
    }
}
