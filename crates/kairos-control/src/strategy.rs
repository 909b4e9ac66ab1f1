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

//! The priority-ordered mitigation table.
//!
//! Each strategy is a command the controller can publish; consumers are the
//! resource manager (cleanup, forced collection) and out-of-scope rendering
//! and world modules (particles, quality, effects). Selection walks the
//! table most-impactful-first and, unless the aggressive mode is configured,
//! stops at the first applicable entry so one cycle never overcorrects.

use kairos_core::control::{Bottleneck, BottleneckKind, Impact, Severity, StrategyKind};
use kairos_core::event::{EngineEvent, EventHub};

/// One row of the mitigation table.
#[derive(Debug, Clone, Copy)]
struct Strategy {
    kind: StrategyKind,
    impact: Impact,
    /// Bottleneck classes this strategy can help with.
    targets: &'static [BottleneckKind],
    /// Only applicable when a targeted bottleneck is critical.
    critical_only: bool,
}

const RENDER_BOUND: &[BottleneckKind] = &[BottleneckKind::Fps, BottleneckKind::Rendering];
const RESOURCE_BOUND: &[BottleneckKind] = &[BottleneckKind::Resource];

/// The default table, most impactful first.
const TABLE: &[Strategy] = &[
    Strategy {
        kind: StrategyKind::LowerQuality,
        impact: Impact::High,
        targets: RENDER_BOUND,
        critical_only: false,
    },
    Strategy {
        kind: StrategyKind::ForceCollection,
        impact: Impact::High,
        targets: RESOURCE_BOUND,
        critical_only: true,
    },
    Strategy {
        kind: StrategyKind::ReduceParticles,
        impact: Impact::Medium,
        targets: RENDER_BOUND,
        critical_only: false,
    },
    Strategy {
        kind: StrategyKind::RequestCleanup,
        impact: Impact::Medium,
        targets: RESOURCE_BOUND,
        critical_only: false,
    },
    Strategy {
        kind: StrategyKind::DisableEffects,
        impact: Impact::Low,
        targets: RENDER_BOUND,
        critical_only: false,
    },
];

/// Selects and applies mitigation strategies against detected bottlenecks.
#[derive(Debug, Default)]
pub struct StrategyTable;

impl StrategyTable {
    /// Creates the table with the default rows.
    pub fn new() -> Self {
        Self
    }

    /// Picks the strategies to apply for `bottlenecks`.
    ///
    /// In the default mode only the single most impactful applicable
    /// strategy is returned; in aggressive mode every applicable one is, in
    /// table order.
    pub fn select(&self, bottlenecks: &[Bottleneck], aggressive: bool) -> Vec<StrategyKind> {
        let mut selected = Vec::new();
        for strategy in TABLE {
            if !Self::applies(strategy, bottlenecks) {
                continue;
            }
            selected.push(strategy.kind);
            if !aggressive {
                break;
            }
        }
        selected
    }

    /// Publishes the command event for each selected strategy, then the
    /// `optimizer:optimization-completed` summary.
    ///
    /// The controller never touches rendering or resource state directly:
    /// rendering commands go to out-of-scope consumers, and the memory
    /// topics are picked up by the engine's resource-manager wiring.
    pub fn apply(&self, strategies: &[StrategyKind], hub: &EventHub) {
        for &kind in strategies {
            log::info!("Mitigation: applying {kind}.");
            hub.emit(Self::command_event(kind));
        }
        hub.emit(EngineEvent::OptimizationCompleted {
            strategies: strategies.to_vec(),
        });
    }

    fn command_event(kind: StrategyKind) -> EngineEvent {
        match kind {
            StrategyKind::ReduceParticles => EngineEvent::ReduceParticles,
            StrategyKind::LowerQuality => EngineEvent::LowerQuality,
            StrategyKind::DisableEffects => EngineEvent::DisableEffects,
            StrategyKind::RequestCleanup => EngineEvent::CleanupRequested,
            StrategyKind::ForceCollection => EngineEvent::ForceGc,
        }
    }

    fn applies(strategy: &Strategy, bottlenecks: &[Bottleneck]) -> bool {
        bottlenecks.iter().any(|b| {
            strategy.targets.contains(&b.kind)
                && (!strategy.critical_only || b.severity == Severity::Critical)
        })
    }

    /// The impact tier of `kind` in the table.
    pub fn impact_of(&self, kind: StrategyKind) -> Option<Impact> {
        TABLE
            .iter()
            .find(|strategy| strategy.kind == kind)
            .map(|strategy| strategy.impact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_core::event::Topic;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn bottleneck(kind: BottleneckKind, severity: Severity) -> Bottleneck {
        Bottleneck {
            kind,
            severity,
            description: String::new(),
        }
    }

    #[test]
    fn fps_bottleneck_selects_quality_drop_first() {
        let table = StrategyTable::new();
        let selected = table.select(
            &[bottleneck(BottleneckKind::Fps, Severity::Warning)],
            false,
        );
        assert_eq!(selected, vec![StrategyKind::LowerQuality]);
    }

    #[test]
    fn resource_warning_requests_cleanup_not_collection() {
        let table = StrategyTable::new();
        let selected = table.select(
            &[bottleneck(BottleneckKind::Resource, Severity::Warning)],
            false,
        );
        assert_eq!(selected, vec![StrategyKind::RequestCleanup]);
    }

    #[test]
    fn critical_resource_pressure_forces_collection() {
        let table = StrategyTable::new();
        let selected = table.select(
            &[bottleneck(BottleneckKind::Resource, Severity::Critical)],
            false,
        );
        assert_eq!(selected, vec![StrategyKind::ForceCollection]);
    }

    #[test]
    fn aggressive_mode_selects_every_applicable_row_in_order() {
        let table = StrategyTable::new();
        let selected = table.select(
            &[
                bottleneck(BottleneckKind::Fps, Severity::Warning),
                bottleneck(BottleneckKind::Resource, Severity::Critical),
            ],
            true,
        );
        assert_eq!(
            selected,
            vec![
                StrategyKind::LowerQuality,
                StrategyKind::ForceCollection,
                StrategyKind::ReduceParticles,
                StrategyKind::RequestCleanup,
                StrategyKind::DisableEffects,
            ]
        );
    }

    #[test]
    fn no_bottlenecks_selects_nothing() {
        let table = StrategyTable::new();
        assert!(table.select(&[], true).is_empty());
    }

    #[test]
    fn apply_publishes_commands_and_a_summary() {
        let hub = EventHub::new();
        let quality = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));

        let quality_clone = Arc::clone(&quality);
        hub.on(Topic::LowerQuality, move |_| {
            quality_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let completed_clone = Arc::clone(&completed);
        hub.on(Topic::OptimizationCompleted, move |event| {
            if let EngineEvent::OptimizationCompleted { strategies } = event {
                assert_eq!(strategies, &[StrategyKind::LowerQuality]);
            }
            completed_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        StrategyTable::new().apply(&[StrategyKind::LowerQuality], &hub);

        assert_eq!(quality.load(Ordering::SeqCst), 1);
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn table_rows_expose_their_impact() {
        let table = StrategyTable::new();
        assert_eq!(table.impact_of(StrategyKind::LowerQuality), Some(Impact::High));
        assert_eq!(
            table.impact_of(StrategyKind::DisableEffects),
            Some(Impact::Low)
        );
    }
}
