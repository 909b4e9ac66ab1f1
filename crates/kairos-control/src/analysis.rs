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

//! Heuristic analysis of the engine's health.
//!
//! The `HeuristicEngine` turns the controller's rolling sample windows into
//! one [`AnalysisSnapshot`]: stability and trend classification, a composite
//! score mapped to a performance level, and the bottlenecks detected from the
//! most recent instantaneous readings.

use kairos_core::collections::RingBuffer;
use kairos_core::config::ControllerConfig;
use kairos_core::control::{
    AnalysisSnapshot, Bottleneck, BottleneckKind, FpsStability, PerformanceLevel, ResourceTrend,
    Severity,
};

/// Number of samples each analysis window retains.
pub const WINDOW: usize = 60;

/// Minimum samples before window statistics are trusted.
const MIN_SAMPLES: usize = 10;
/// FPS standard deviation at or below which pacing counts as stable.
const FPS_STABLE_STD_DEV: f32 = 2.0;
/// FPS standard deviation above which pacing counts as unstable.
const FPS_UNSTABLE_STD_DEV: f32 = 8.0;
/// Half-window pressure change (percent) below which the trend is flat.
const PRESSURE_TREND_PCT: f32 = 5.0;
/// Fraction of target FPS below which a sample is a dropped frame.
const FRAME_DROP_FRACTION: f32 = 0.8;
/// Fraction of target FPS below which the FPS bottleneck is critical.
const FPS_CRITICAL_FRACTION: f32 = 0.5;
/// Frame time over this multiple of the fixed-step budget flags rendering.
const FRAME_TIME_BUDGET_RATIO: f32 = 1.5;
/// Score penalty for unstable frame pacing.
const PENALTY_UNSTABLE: f32 = 30.0;
/// Score penalty for moderately jittery frame pacing.
const PENALTY_MODERATE: f32 = 15.0;
/// Score penalty for pressure rising across the window.
const PENALTY_PRESSURE_RISING: f32 = 15.0;
/// Ceiling on the penalty for average FPS shortfall.
const PENALTY_FPS_MAX: f32 = 40.0;
/// Ceiling on the penalty for the dropped-frame ratio.
const PENALTY_DROPS_MAX: f32 = 30.0;
/// Composite score at or above which the level is `High`.
const LEVEL_HIGH_SCORE: f32 = 80.0;
/// Composite score at or above which the level is `Medium`.
const LEVEL_MEDIUM_SCORE: f32 = 50.0;

/// The controller's rolling sample windows.
///
/// One push per completed frame for FPS and frame time, one per telemetry
/// refresh for pressure. All three are bounded rings; analysis reads them
/// without draining.
#[derive(Debug, Clone, Default)]
pub struct SampleWindows {
    /// Instantaneous FPS per frame.
    pub fps: RingBuffer<f32, WINDOW>,
    /// Total frame time per frame, in milliseconds.
    pub frame_time_ms: RingBuffer<f32, WINDOW>,
    /// Resource pressure in `[0, 1]` per telemetry refresh.
    pub pressure: RingBuffer<f32, WINDOW>,
}

impl SampleWindows {
    /// Creates empty windows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed frame.
    pub fn record_frame(&mut self, fps: f32, frame_time_ms: f32) {
        self.fps.push(fps);
        self.frame_time_ms.push(frame_time_ms);
    }

    /// Records one resource-pressure sample.
    pub fn record_pressure(&mut self, pressure: f32) {
        self.pressure.push(pressure.clamp(0.0, 1.0));
    }

    /// Drops all samples.
    pub fn clear(&mut self) {
        self.fps.clear();
        self.frame_time_ms.clear();
        self.pressure.clear();
    }
}

/// Analyzes sample windows to classify the engine's current health.
pub struct HeuristicEngine;

impl HeuristicEngine {
    /// Produces one analysis snapshot from the current windows.
    ///
    /// The heuristics, in order:
    /// 1. **FPS stability**: standard deviation over the window.
    /// 2. **Pressure trend**: percentage change between window halves.
    /// 3. **Composite score**: starts at 100, penalized for instability,
    ///    FPS shortfall against target, and sustained pressure increase;
    ///    mapped to a [`PerformanceLevel`].
    /// 4. **Bottlenecks**: derived from the latest instantaneous readings,
    ///    not the window averages.
    pub fn analyze(
        &self,
        windows: &SampleWindows,
        config: &ControllerConfig,
        fixed_step_ms: f32,
    ) -> AnalysisSnapshot {
        let has_fps_window = windows.fps.len() >= MIN_SAMPLES;

        // ── 1. FPS Stability ─────────────────────────────────────────────
        let fps_stability = if !has_fps_window {
            FpsStability::Stable
        } else {
            let std_dev = windows.fps.std_dev();
            if std_dev > FPS_UNSTABLE_STD_DEV {
                log::info!("Analysis: FPS std-dev {std_dev:.2} — pacing unstable.");
                FpsStability::Unstable
            } else if std_dev > FPS_STABLE_STD_DEV {
                FpsStability::Moderate
            } else {
                FpsStability::Stable
            }
        };

        // ── 2. Pressure Trend ────────────────────────────────────────────
        let resource_trend = match windows.pressure.half_averages() {
            Some((first, second)) if first > 0.0 && windows.pressure.len() >= MIN_SAMPLES => {
                let pct = (second - first) / first * 100.0;
                if pct > PRESSURE_TREND_PCT {
                    log::info!("Analysis: resource pressure rising ({pct:+.1}% across window).");
                    ResourceTrend::Increasing
                } else if pct < -PRESSURE_TREND_PCT {
                    ResourceTrend::Decreasing
                } else {
                    ResourceTrend::Stable
                }
            }
            _ => ResourceTrend::Stable,
        };

        // ── 3. Dropped Frames ────────────────────────────────────────────
        let drop_floor = config.target_fps * FRAME_DROP_FRACTION;
        let frame_drops = windows.fps.iter().filter(|&&fps| fps < drop_floor).count();

        // ── 4. Composite Score ───────────────────────────────────────────
        let avg_fps = windows.fps.average();
        let mut score: f32 = 100.0;

        match fps_stability {
            FpsStability::Unstable => score -= PENALTY_UNSTABLE,
            FpsStability::Moderate => score -= PENALTY_MODERATE,
            FpsStability::Stable => {}
        }
        if has_fps_window && avg_fps < config.target_fps {
            let shortfall = (config.target_fps - avg_fps) / config.target_fps;
            score -= (shortfall * 100.0).min(PENALTY_FPS_MAX);
        }
        if has_fps_window && frame_drops > 0 {
            let drop_ratio = frame_drops as f32 / windows.fps.len() as f32;
            score -= drop_ratio * PENALTY_DROPS_MAX;
        }
        if resource_trend == ResourceTrend::Increasing {
            score -= PENALTY_PRESSURE_RISING;
        }
        score = score.clamp(0.0, 100.0);

        let level = if score >= LEVEL_HIGH_SCORE {
            PerformanceLevel::High
        } else if score >= LEVEL_MEDIUM_SCORE {
            PerformanceLevel::Medium
        } else {
            PerformanceLevel::Low
        };

        // ── 5. Bottlenecks (instantaneous readings) ──────────────────────
        let mut bottlenecks = Vec::new();

        if let Some(fps) = windows.fps.last() {
            if fps < config.target_fps * FRAME_DROP_FRACTION {
                let severity = if fps < config.target_fps * FPS_CRITICAL_FRACTION {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
                bottlenecks.push(Bottleneck {
                    kind: BottleneckKind::Fps,
                    severity,
                    description: format!(
                        "fps {fps:.1} below 80% of target {:.1}",
                        config.target_fps
                    ),
                });
            }
        }
        if let Some(pressure) = windows.pressure.last() {
            if pressure >= config.pressure_warn {
                let severity = if pressure >= config.pressure_critical {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
                bottlenecks.push(Bottleneck {
                    kind: BottleneckKind::Resource,
                    severity,
                    description: format!(
                        "resource pressure {:.0}% above {:.0}% threshold",
                        pressure * 100.0,
                        config.pressure_warn * 100.0
                    ),
                });
            }
        }
        if let Some(frame_time) = windows.frame_time_ms.last() {
            if frame_time > fixed_step_ms * FRAME_TIME_BUDGET_RATIO {
                bottlenecks.push(Bottleneck {
                    kind: BottleneckKind::Rendering,
                    severity: Severity::Warning,
                    description: format!(
                        "frame time {frame_time:.1}ms exceeds 1.5x the {fixed_step_ms:.1}ms step budget"
                    ),
                });
            }
        }

        AnalysisSnapshot {
            fps_stability,
            resource_trend,
            score,
            level,
            avg_fps,
            frame_drops,
            bottlenecks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config() -> ControllerConfig {
        ControllerConfig::default()
    }

    fn windows_with_fps(samples: &[f32]) -> SampleWindows {
        let mut windows = SampleWindows::new();
        for &fps in samples {
            windows.record_frame(fps, 1000.0 / fps.max(1.0));
        }
        windows
    }

    #[test]
    fn steady_target_fps_scores_high() {
        let windows = windows_with_fps(&[60.0; 30]);
        let snapshot = HeuristicEngine.analyze(&windows, &config(), 16.67);

        assert_eq!(snapshot.fps_stability, FpsStability::Stable);
        assert_eq!(snapshot.resource_trend, ResourceTrend::Stable);
        assert_eq!(snapshot.level, PerformanceLevel::High);
        assert_relative_eq!(snapshot.score, 100.0);
        assert_eq!(snapshot.frame_drops, 0);
        assert!(snapshot.bottlenecks.is_empty());
    }

    #[test]
    fn too_few_samples_stays_neutral() {
        let windows = windows_with_fps(&[12.0; 5]);
        let snapshot = HeuristicEngine.analyze(&windows, &config(), 16.67);

        // Below MIN_SAMPLES the window statistics are not trusted, but the
        // instantaneous bottleneck still fires.
        assert_eq!(snapshot.fps_stability, FpsStability::Stable);
        assert_eq!(snapshot.level, PerformanceLevel::High);
        assert_eq!(snapshot.bottlenecks.len(), 1);
        assert_eq!(snapshot.bottlenecks[0].kind, BottleneckKind::Fps);
    }

    #[test]
    fn jittery_fps_is_unstable_and_penalized() {
        let samples: Vec<f32> = (0..30)
            .map(|i| if i % 2 == 0 { 60.0 } else { 30.0 })
            .collect();
        let snapshot = HeuristicEngine.analyze(&windows_with_fps(&samples), &config(), 16.67);

        assert_eq!(snapshot.fps_stability, FpsStability::Unstable);
        assert!(snapshot.score < 70.0);
        assert!(snapshot.frame_drops > 0);
    }

    #[test]
    fn sustained_low_fps_maps_to_low_level() {
        let windows = windows_with_fps(&[20.0; 30]);
        let snapshot = HeuristicEngine.analyze(&windows, &config(), 16.67);

        assert_eq!(snapshot.level, PerformanceLevel::Low);
        let fps_bottleneck = snapshot
            .bottlenecks
            .iter()
            .find(|b| b.kind == BottleneckKind::Fps)
            .expect("fps bottleneck");
        // 20 fps is below half the 60 fps target.
        assert_eq!(fps_bottleneck.severity, Severity::Critical);
        assert_eq!(snapshot.frame_drops, 30);
    }

    #[test]
    fn rising_pressure_is_classified_increasing() {
        let mut windows = windows_with_fps(&[60.0; 30]);
        for i in 0..20 {
            windows.record_pressure(0.40 + i as f32 * 0.02);
        }
        let snapshot = HeuristicEngine.analyze(&windows, &config(), 16.67);

        assert_eq!(snapshot.resource_trend, ResourceTrend::Increasing);
        assert_relative_eq!(snapshot.score, 100.0 - PENALTY_PRESSURE_RISING);
    }

    #[test]
    fn critical_pressure_flags_resource_bottleneck() {
        let mut windows = windows_with_fps(&[60.0; 30]);
        for _ in 0..12 {
            windows.record_pressure(0.95);
        }
        let snapshot = HeuristicEngine.analyze(&windows, &config(), 16.67);

        let resource = snapshot
            .bottlenecks
            .iter()
            .find(|b| b.kind == BottleneckKind::Resource)
            .expect("resource bottleneck");
        assert_eq!(resource.severity, Severity::Critical);
    }

    #[test]
    fn slow_frames_flag_rendering_bottleneck() {
        let mut windows = SampleWindows::new();
        for _ in 0..12 {
            // 55 fps but a 30ms frame: render-bound, not pacing-bound.
            windows.record_frame(55.0, 30.0);
        }
        let snapshot = HeuristicEngine.analyze(&windows, &config(), 16.67);

        assert!(snapshot
            .bottlenecks
            .iter()
            .any(|b| b.kind == BottleneckKind::Rendering));
    }

    #[test]
    fn empty_windows_produce_a_healthy_snapshot() {
        let snapshot = HeuristicEngine.analyze(&SampleWindows::new(), &config(), 16.67);
        assert_eq!(snapshot.level, PerformanceLevel::High);
        assert!(snapshot.bottlenecks.is_empty());
        assert_eq!(snapshot.frame_drops, 0);
    }
}
