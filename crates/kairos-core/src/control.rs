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

//! Shared vocabulary of the adaptive performance control loop.
//!
//! These types travel as event payloads between the scheduler, the
//! performance controller, and out-of-scope consumers; the control logic
//! itself lives in `kairos-control`.

use serde::{Deserialize, Serialize};

/// Coarse performance classification derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerformanceLevel {
    /// Frame rate is healthy and stable.
    High,
    /// Degraded but tolerable; mitigation is optional.
    Medium,
    /// Sustained degradation; mitigation is required.
    Low,
}

impl std::fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Classification of frame-rate steadiness over the sample window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FpsStability {
    /// Standard deviation within the stable threshold.
    Stable,
    /// Noticeable jitter.
    Moderate,
    /// Severe jitter; frame pacing is broken.
    Unstable,
}

/// Direction of the resource-pressure signal over the sample window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceTrend {
    /// Pressure is flat within the noise threshold.
    Stable,
    /// Pressure is rising between window halves.
    Increasing,
    /// Pressure is falling between window halves.
    Decreasing,
}

/// The class of a detected performance problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BottleneckKind {
    /// Instantaneous frame rate below the acceptable fraction of target.
    Fps,
    /// Resource pressure above the configured threshold.
    Resource,
    /// Frame time exceeding the fixed-step budget.
    Rendering,
}

/// How urgent a detected bottleneck is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Degradation worth reporting.
    Warning,
    /// Degradation requiring immediate mitigation.
    Critical,
}

/// One detected performance problem.
///
/// Ephemeral: produced per analysis tick and consumed immediately for
/// mitigation selection; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    /// Problem class.
    pub kind: BottleneckKind,
    /// Urgency.
    pub severity: Severity,
    /// Human-readable description for logs and telemetry.
    pub description: String,
}

/// Snapshot of one analysis pass, published as `optimizer:analysis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    /// Frame-rate steadiness classification.
    pub fps_stability: FpsStability,
    /// Resource-pressure direction classification.
    pub resource_trend: ResourceTrend,
    /// Composite health score in `[0, 100]`.
    pub score: f32,
    /// Performance level the score maps to.
    pub level: PerformanceLevel,
    /// Average FPS over the window.
    pub avg_fps: f32,
    /// Samples in the window below the acceptable fraction of target FPS.
    pub frame_drops: usize,
    /// Problems detected from instantaneous readings.
    pub bottlenecks: Vec<Bottleneck>,
}

/// A mitigation the controller can apply, ordered most impactful first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Ask world/effect modules to cut their particle budgets.
    ReduceParticles,
    /// Ask rendering modules to drop one visual quality tier.
    LowerQuality,
    /// Ask rendering modules to turn off non-essential effects.
    DisableEffects,
    /// Ask the resource manager for a cleanup pass.
    RequestCleanup,
    /// Ask the resource manager to clear caches and shrink pools outright.
    ForceCollection,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Relative cost/benefit tier of a mitigation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Impact {
    /// Barely observable to the user.
    Low,
    /// Observable but acceptable.
    Medium,
    /// Clearly observable; applied one at a time unless aggressive.
    High,
}

/// Measured effect of an applied mitigation round, published after the
/// configured re-measurement delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MitigationImpact {
    /// Strategies the round applied.
    pub strategies: Vec<StrategyKind>,
    /// Average FPS change since the round was applied.
    pub fps_delta: f32,
    /// Resource-pressure change since the round was applied.
    pub pressure_delta: f32,
}
