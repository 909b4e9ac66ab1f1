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

//! The interval-gated controller driving analysis and mitigation.
//!
//! The controller runs inside the engine loop: the scheduler feeds it one
//! frame record per tick, telemetry feeds it pressure samples, and
//! [`PerformanceController::tick`] decides on its own cadence whether to
//! analyze and whether to mitigate. Everything is driven by an explicit
//! `now` so tests advance virtual time deterministically.

use crate::analysis::{HeuristicEngine, SampleWindows};
use crate::strategy::StrategyTable;
use kairos_core::config::EngineConfig;
use kairos_core::control::{AnalysisSnapshot, MitigationImpact, PerformanceLevel, StrategyKind};
use kairos_core::event::{EngineEvent, EventHub, Topic};
use kairos_core::telemetry::FrameMetrics;
use kairos_core::time::TaskQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A scheduled re-measurement of an applied mitigation round.
struct ImpactProbe {
    strategies: Vec<StrategyKind>,
    baseline_fps: f32,
    baseline_pressure: f32,
}

/// Observes engine health and applies mitigations through the event hub.
pub struct PerformanceController {
    analysis_interval: Duration,
    cooldown: Duration,
    impact_delay: Duration,
    fixed_step_ms: f32,
    config: kairos_core::config::ControllerConfig,

    windows: SampleWindows,
    engine: HeuristicEngine,
    table: StrategyTable,
    last_analysis: Option<Instant>,
    cooldown_until: Option<Instant>,
    probes: TaskQueue<ImpactProbe>,
    last_snapshot: Option<AnalysisSnapshot>,

    // Written by hub handlers, read at tick top.
    force_requested: Arc<AtomicBool>,
    pinned_level: Arc<Mutex<Option<PerformanceLevel>>>,
}

impl PerformanceController {
    /// Creates a controller from the engine configuration.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            analysis_interval: Duration::from_millis(config.controller.analysis_interval_ms),
            cooldown: Duration::from_millis(config.controller.cooldown_ms),
            impact_delay: Duration::from_millis(config.controller.impact_delay_ms),
            fixed_step_ms: config.scheduler.tick_duration().as_secs_f32() * 1000.0,
            config: config.controller.clone(),
            windows: SampleWindows::new(),
            engine: HeuristicEngine,
            table: StrategyTable::new(),
            last_analysis: None,
            cooldown_until: None,
            probes: TaskQueue::new(),
            last_snapshot: None,
            force_requested: Arc::new(AtomicBool::new(false)),
            pinned_level: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribes the controller's consumed topics on `hub`.
    ///
    /// `optimizer:force-optimization` makes the next tick analyze and
    /// mitigate regardless of interval and cooldown;
    /// `optimizer:set-performance-level` pins the published level until
    /// [`clear_pinned_level`](Self::clear_pinned_level).
    pub fn attach(&self, hub: &EventHub) {
        let force = Arc::clone(&self.force_requested);
        hub.on(Topic::ForceOptimization, move |_| {
            force.store(true, Ordering::SeqCst);
            Ok(())
        });

        let pinned = Arc::clone(&self.pinned_level);
        hub.on(Topic::SetPerformanceLevel, move |event| {
            if let EngineEvent::SetPerformanceLevel(level) = event {
                log::info!("Controller: performance level pinned to {level}.");
                *pinned.lock().unwrap() = Some(*level);
            }
            Ok(())
        });
    }

    /// Records one completed frame.
    pub fn record_frame(&mut self, metrics: &FrameMetrics) {
        self.windows
            .record_frame(metrics.fps, metrics.total_frame_time_ms);
    }

    /// Records one resource-pressure sample in `[0, 1]`.
    pub fn record_pressure(&mut self, pressure: f32) {
        self.windows.record_pressure(pressure);
    }

    /// Unpins an externally set performance level.
    pub fn clear_pinned_level(&self) {
        *self.pinned_level.lock().unwrap() = None;
    }

    /// The most recent analysis snapshot, if one has been produced.
    pub fn last_snapshot(&self) -> Option<&AnalysisSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// The current performance level; `High` before the first analysis.
    pub fn level(&self) -> PerformanceLevel {
        self.last_snapshot
            .as_ref()
            .map(|snapshot| snapshot.level)
            .unwrap_or(PerformanceLevel::High)
    }

    /// Whether a mitigation round is still cooling down at `now`.
    pub fn in_cooldown(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| until > now)
    }

    /// Runs the controller's cadence once.
    ///
    /// Fires due impact probes, then analyzes if the interval elapsed (or a
    /// forced analysis is pending) and mitigates if warranted.
    pub fn tick(&mut self, now: Instant, hub: &EventHub) {
        for probe in self.probes.poll(now) {
            self.measure_impact(probe, hub);
        }

        let forced = self.force_requested.swap(false, Ordering::SeqCst);
        let due = self
            .last_analysis
            .is_none_or(|last| now.duration_since(last) >= self.analysis_interval);
        if !forced && !due {
            return;
        }
        self.last_analysis = Some(now);

        let mut snapshot = self
            .engine
            .analyze(&self.windows, &self.config, self.fixed_step_ms);
        if let Some(level) = *self.pinned_level.lock().unwrap() {
            snapshot.level = level;
        }
        log::debug!(
            "Controller: score {:.0} -> {} ({} bottleneck(s)).",
            snapshot.score,
            snapshot.level,
            snapshot.bottlenecks.len()
        );
        hub.emit(EngineEvent::Analysis(snapshot.clone()));

        let pressure = self.windows.pressure.last().unwrap_or(0.0);
        let needs_mitigation = snapshot.level == PerformanceLevel::Low
            || pressure >= self.config.pressure_critical
            || snapshot.frame_drops > self.config.frame_drop_threshold;
        let blocked = self.in_cooldown(now) && !forced;

        if needs_mitigation && !blocked {
            let strategies = self
                .table
                .select(&snapshot.bottlenecks, self.config.aggressive);
            if !strategies.is_empty() {
                self.table.apply(&strategies, hub);
                self.cooldown_until = Some(now + self.cooldown);
                self.probes.schedule_at(
                    now + self.impact_delay,
                    ImpactProbe {
                        strategies,
                        baseline_fps: self.windows.fps.average(),
                        baseline_pressure: self.windows.pressure.average(),
                    },
                );
            }
        }

        self.last_snapshot = Some(snapshot);
    }

    fn measure_impact(&self, probe: ImpactProbe, hub: &EventHub) {
        let impact = MitigationImpact {
            strategies: probe.strategies,
            fps_delta: self.windows.fps.average() - probe.baseline_fps,
            pressure_delta: self.windows.pressure.average() - probe.baseline_pressure,
        };
        log::info!(
            "Mitigation impact: fps {:+.1}, pressure {:+.3}.",
            impact.fps_delta,
            impact.pressure_delta
        );
        hub.emit(EngineEvent::MitigationMeasured(impact));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::atomic::AtomicUsize;

    fn test_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.controller.analysis_interval_ms = 100;
        config.controller.cooldown_ms = 500;
        config.controller.impact_delay_ms = 200;
        config
    }

    fn frame(fps: f32) -> FrameMetrics {
        FrameMetrics {
            fps,
            avg_fps: fps,
            update_time_ms: 1.0,
            render_time_ms: 2.0,
            total_frame_time_ms: 1000.0 / fps,
            memory_usage_bytes: 0,
            frame_count: 0,
        }
    }

    fn feed_frames(controller: &mut PerformanceController, fps: f32, count: usize) {
        for _ in 0..count {
            controller.record_frame(&frame(fps));
        }
    }

    fn analysis_counter(hub: &EventHub) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let clone = Arc::clone(&count);
        hub.on(Topic::Analysis, move |_| {
            clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        count
    }

    #[test]
    fn analysis_is_gated_by_the_interval() {
        let hub = EventHub::new();
        let analyses = analysis_counter(&hub);
        let mut controller = PerformanceController::new(&test_config());
        let t0 = Instant::now();

        controller.tick(t0, &hub);
        assert_eq!(analyses.load(Ordering::SeqCst), 1);

        // Within the interval: no new analysis.
        controller.tick(t0 + Duration::from_millis(50), &hub);
        assert_eq!(analyses.load(Ordering::SeqCst), 1);

        controller.tick(t0 + Duration::from_millis(100), &hub);
        assert_eq!(analyses.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn forced_optimization_bypasses_the_interval() {
        let hub = EventHub::new();
        let analyses = analysis_counter(&hub);
        let mut controller = PerformanceController::new(&test_config());
        controller.attach(&hub);
        let t0 = Instant::now();

        controller.tick(t0, &hub);
        hub.emit(EngineEvent::ForceOptimization);
        controller.tick(t0 + Duration::from_millis(10), &hub);

        assert_eq!(analyses.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn degraded_health_applies_one_strategy_and_cools_down() {
        let hub = EventHub::new();
        let optimizations = Arc::new(AtomicUsize::new(0));
        let clone = Arc::clone(&optimizations);
        hub.on(Topic::OptimizationCompleted, move |event| {
            if let EngineEvent::OptimizationCompleted { strategies } = event {
                // Default mode: exactly one, the most impactful applicable.
                assert_eq!(strategies, &[StrategyKind::LowerQuality]);
            }
            clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let mut controller = PerformanceController::new(&test_config());
        feed_frames(&mut controller, 20.0, 30);
        let t0 = Instant::now();

        controller.tick(t0, &hub);
        assert_eq!(optimizations.load(Ordering::SeqCst), 1);
        assert!(controller.in_cooldown(t0 + Duration::from_millis(1)));
        assert_eq!(controller.level(), PerformanceLevel::Low);

        // The next analysis lands inside the cooldown: no second round.
        controller.tick(t0 + Duration::from_millis(100), &hub);
        assert_eq!(optimizations.load(Ordering::SeqCst), 1);

        // After the cooldown the controller may mitigate again.
        controller.tick(t0 + Duration::from_millis(600), &hub);
        assert_eq!(optimizations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn healthy_windows_never_mitigate() {
        let hub = EventHub::new();
        let optimizations = Arc::new(AtomicUsize::new(0));
        let clone = Arc::clone(&optimizations);
        hub.on(Topic::OptimizationCompleted, move |_| {
            clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let mut controller = PerformanceController::new(&test_config());
        feed_frames(&mut controller, 60.0, 30);
        controller.tick(Instant::now(), &hub);

        assert_eq!(optimizations.load(Ordering::SeqCst), 0);
        assert_eq!(controller.level(), PerformanceLevel::High);
    }

    #[test]
    fn pinned_level_overrides_the_derived_one() {
        let hub = EventHub::new();
        let mut controller = PerformanceController::new(&test_config());
        controller.attach(&hub);
        feed_frames(&mut controller, 60.0, 30);

        hub.emit(EngineEvent::SetPerformanceLevel(PerformanceLevel::Low));
        controller.tick(Instant::now(), &hub);
        assert_eq!(controller.level(), PerformanceLevel::Low);

        controller.clear_pinned_level();
        controller.tick(Instant::now() + Duration::from_millis(150), &hub);
        assert_eq!(controller.level(), PerformanceLevel::High);
    }

    #[test]
    fn impact_is_measured_after_the_configured_delay() {
        let hub = EventHub::new();
        let measured = Arc::new(Mutex::new(None));
        let clone = Arc::clone(&measured);
        hub.on(Topic::MitigationImpact, move |event| {
            if let EngineEvent::MitigationMeasured(impact) = event {
                *clone.lock().unwrap() = Some(impact.clone());
            }
            Ok(())
        });

        let mut controller = PerformanceController::new(&test_config());
        feed_frames(&mut controller, 20.0, 30);
        let t0 = Instant::now();
        controller.tick(t0, &hub);
        assert!(measured.lock().unwrap().is_none());

        // The mitigation helped: the window fills entirely with healthy frames.
        feed_frames(&mut controller, 60.0, 60);
        controller.tick(t0 + Duration::from_millis(200), &hub);

        let impact = measured.lock().unwrap().clone().expect("impact published");
        assert_eq!(impact.strategies, vec![StrategyKind::LowerQuality]);
        assert_relative_eq!(impact.fps_delta, 40.0, epsilon = 0.01);
    }
}
