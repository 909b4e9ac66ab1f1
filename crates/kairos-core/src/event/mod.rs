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

//! Event-driven communication between the engine core and its modules.
//!
//! Two primitives live here. The [`EventHub`] is the synchronous pub/sub
//! channel the engine loop and its subsystems talk over; handlers run on the
//! emitting thread, inside the emitting call. The [`EventBus`] is a generic
//! flume-backed channel used to tap the hub's traffic from other threads.

mod bus;
mod hub;

pub use self::bus::EventBus;
pub use self::hub::{EventHub, SubscriptionId};

use crate::control::{AnalysisSnapshot, MitigationImpact, PerformanceLevel, StrategyKind};
use crate::module::Lifecycle;
use crate::resource::CleanupReport;
use crate::telemetry::FrameMetrics;

/// The closed set of topics events are published under.
///
/// Wire names follow the `namespace:kebab-name` convention and are stable:
/// external tooling that records event streams keys on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// A new frame has begun.
    FrameStart,
    /// The variable-rate update phase is about to run.
    UpdateStart,
    /// The variable-rate update phase finished.
    UpdateEnd,
    /// The render phase is about to run.
    RenderStart,
    /// The render phase finished.
    RenderEnd,
    /// Periodic frame metrics publication.
    PerformanceUpdate,
    /// A module callback failed.
    ModuleError,
    /// A module was added to the registry.
    ModuleRegistered,
    /// A module was removed from the registry.
    ModuleUnregistered,
    /// The performance controller produced an analysis snapshot.
    Analysis,
    /// Mitigation strategies were applied.
    OptimizationCompleted,
    /// Delayed measurement of an applied mitigation's effect.
    MitigationImpact,
    /// A resource cleanup pass finished.
    CleanupCompleted,
    /// Request to start the engine.
    Start,
    /// Request to stop the engine.
    Stop,
    /// Request to pause the engine.
    Pause,
    /// Request to resume the engine.
    Resume,
    /// Request a resource cleanup pass.
    Cleanup,
    /// Request a forced collection hint to the host.
    ForceGc,
    /// Request that all caches be emptied.
    ClearCaches,
    /// Request an immediate controller analysis, bypassing the interval.
    ForceOptimization,
    /// Request a specific performance level.
    SetPerformanceLevel,
    /// Mitigation command: reduce particle counts.
    ReduceParticles,
    /// Mitigation command: lower visual quality.
    LowerQuality,
    /// Mitigation command: disable non-essential effects.
    DisableEffects,
}

impl Topic {
    /// The stable wire name of this topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::FrameStart => "engine:frame-start",
            Topic::UpdateStart => "engine:update-start",
            Topic::UpdateEnd => "engine:update-end",
            Topic::RenderStart => "engine:render-start",
            Topic::RenderEnd => "engine:render-end",
            Topic::PerformanceUpdate => "engine:performance-update",
            Topic::ModuleError => "engine:module-error",
            Topic::ModuleRegistered => "engine:module-registered",
            Topic::ModuleUnregistered => "engine:module-unregistered",
            Topic::Analysis => "optimizer:analysis",
            Topic::OptimizationCompleted => "optimizer:optimization-completed",
            Topic::MitigationImpact => "optimizer:mitigation-impact",
            Topic::CleanupCompleted => "memory:cleanup-completed",
            Topic::Start => "engine:start",
            Topic::Stop => "engine:stop",
            Topic::Pause => "engine:pause",
            Topic::Resume => "engine:resume",
            Topic::Cleanup => "memory:cleanup",
            Topic::ForceGc => "memory:force-gc",
            Topic::ClearCaches => "memory:clear-caches",
            Topic::ForceOptimization => "optimizer:force-optimization",
            Topic::SetPerformanceLevel => "optimizer:set-performance-level",
            Topic::ReduceParticles => "optimizer:reduce-particles",
            Topic::LowerQuality => "optimizer:lower-quality",
            Topic::DisableEffects => "optimizer:disable-effects",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event published over the [`EventHub`].
///
/// Timestamps are seconds since the engine loop started. Duration payloads
/// are milliseconds, matching the frame metrics they feed.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A new frame has begun.
    FrameStart {
        /// Seconds since the engine loop started.
        timestamp: f64,
    },
    /// The variable-rate update phase is about to run.
    UpdateStart {
        /// Seconds since the engine loop started.
        timestamp: f64,
    },
    /// The variable-rate update phase finished.
    UpdateEnd {
        /// Seconds since the engine loop started.
        timestamp: f64,
        /// Wall-clock time the phase took, in milliseconds.
        duration_ms: f32,
    },
    /// The render phase is about to run.
    RenderStart {
        /// Seconds since the engine loop started.
        timestamp: f64,
    },
    /// The render phase finished.
    RenderEnd {
        /// Seconds since the engine loop started.
        timestamp: f64,
        /// Wall-clock time the phase took, in milliseconds.
        duration_ms: f32,
    },
    /// Periodic frame metrics publication.
    PerformanceUpdate(FrameMetrics),
    /// A module callback failed and the module was disabled.
    ModuleError {
        /// The failing module's registered name.
        name: String,
        /// The lifecycle stage that failed.
        stage: Lifecycle,
        /// The rendered error chain.
        error: String,
    },
    /// A module was added to the registry.
    ModuleRegistered {
        /// The module's registered name.
        name: String,
    },
    /// A module was removed from the registry.
    ModuleUnregistered {
        /// The module's registered name.
        name: String,
    },
    /// The performance controller produced an analysis snapshot.
    Analysis(AnalysisSnapshot),
    /// Mitigation strategies were applied.
    OptimizationCompleted {
        /// The strategies applied, in application order.
        strategies: Vec<StrategyKind>,
    },
    /// Delayed measurement of an applied mitigation's effect.
    MitigationMeasured(MitigationImpact),
    /// A resource cleanup pass finished.
    CleanupCompleted(CleanupReport),
    /// Request to start the engine.
    Start,
    /// Request to stop the engine.
    Stop,
    /// Request to pause the engine.
    Pause,
    /// Request to resume the engine.
    Resume,
    /// Request a resource cleanup pass.
    CleanupRequested,
    /// Request a forced collection hint to the host.
    ForceGc,
    /// Request that all caches be emptied.
    ClearCaches,
    /// Request an immediate controller analysis, bypassing the interval.
    ForceOptimization,
    /// Request a specific performance level.
    SetPerformanceLevel(PerformanceLevel),
    /// Mitigation command: reduce particle counts.
    ReduceParticles,
    /// Mitigation command: lower visual quality.
    LowerQuality,
    /// Mitigation command: disable non-essential effects.
    DisableEffects,
}

impl EngineEvent {
    /// The topic this event is published under.
    pub fn topic(&self) -> Topic {
        match self {
            EngineEvent::FrameStart { .. } => Topic::FrameStart,
            EngineEvent::UpdateStart { .. } => Topic::UpdateStart,
            EngineEvent::UpdateEnd { .. } => Topic::UpdateEnd,
            EngineEvent::RenderStart { .. } => Topic::RenderStart,
            EngineEvent::RenderEnd { .. } => Topic::RenderEnd,
            EngineEvent::PerformanceUpdate(_) => Topic::PerformanceUpdate,
            EngineEvent::ModuleError { .. } => Topic::ModuleError,
            EngineEvent::ModuleRegistered { .. } => Topic::ModuleRegistered,
            EngineEvent::ModuleUnregistered { .. } => Topic::ModuleUnregistered,
            EngineEvent::Analysis(_) => Topic::Analysis,
            EngineEvent::OptimizationCompleted { .. } => Topic::OptimizationCompleted,
            EngineEvent::MitigationMeasured(_) => Topic::MitigationImpact,
            EngineEvent::CleanupCompleted(_) => Topic::CleanupCompleted,
            EngineEvent::Start => Topic::Start,
            EngineEvent::Stop => Topic::Stop,
            EngineEvent::Pause => Topic::Pause,
            EngineEvent::Resume => Topic::Resume,
            EngineEvent::CleanupRequested => Topic::Cleanup,
            EngineEvent::ForceGc => Topic::ForceGc,
            EngineEvent::ClearCaches => Topic::ClearCaches,
            EngineEvent::ForceOptimization => Topic::ForceOptimization,
            EngineEvent::SetPerformanceLevel(_) => Topic::SetPerformanceLevel,
            EngineEvent::ReduceParticles => Topic::ReduceParticles,
            EngineEvent::LowerQuality => Topic::LowerQuality,
            EngineEvent::DisableEffects => Topic::DisableEffects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_use_namespaced_wire_names() {
        assert_eq!(Topic::FrameStart.as_str(), "engine:frame-start");
        assert_eq!(Topic::PerformanceUpdate.as_str(), "engine:performance-update");
        assert_eq!(Topic::ModuleError.as_str(), "engine:module-error");
        assert_eq!(Topic::Analysis.as_str(), "optimizer:analysis");
        assert_eq!(
            Topic::OptimizationCompleted.as_str(),
            "optimizer:optimization-completed"
        );
        assert_eq!(Topic::CleanupCompleted.as_str(), "memory:cleanup-completed");
        assert_eq!(Topic::ForceGc.as_str(), "memory:force-gc");
        assert_eq!(
            Topic::SetPerformanceLevel.as_str(),
            "optimizer:set-performance-level"
        );
    }

    #[test]
    fn events_map_to_their_topic() {
        assert_eq!(
            EngineEvent::FrameStart { timestamp: 0.0 }.topic(),
            Topic::FrameStart
        );
        assert_eq!(
            EngineEvent::ModuleError {
                name: "physics".to_string(),
                stage: Lifecycle::Update,
                error: "boom".to_string(),
            }
            .topic(),
            Topic::ModuleError
        );
        assert_eq!(
            EngineEvent::SetPerformanceLevel(PerformanceLevel::Low).topic(),
            Topic::SetPerformanceLevel
        );
        assert_eq!(EngineEvent::CleanupRequested.topic(), Topic::Cleanup);
    }

    #[test]
    fn topic_display_matches_wire_name() {
        assert_eq!(Topic::UpdateEnd.to_string(), "engine:update-end");
        assert_eq!(Topic::ReduceParticles.to_string(), "optimizer:reduce-particles");
    }
}
