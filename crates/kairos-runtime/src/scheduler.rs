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

//! The fixed-timestep frame scheduler.
//!
//! One [`tick_at`](Scheduler::tick_at) call runs one frame: drain due
//! recovery tasks, accumulate the clamped delta, catch up fixed simulation
//! steps, run the variable update, render, and publish the frame's metrics.
//! Every module callback runs under the isolation guard; a budget breach
//! pauses the scheduler and schedules a bounded recovery plan instead of
//! crashing the process.
//!
//! All timing flows through the explicit `now` argument, so hosts drive
//! wall-clock time and tests drive virtual time through the same path.

use crate::isolation::{guard_stage, ErrorBudget};
use crate::recovery::RecoveryPlan;
use crate::registry::ModuleRegistry;
use kairos_core::collections::RingBuffer;
use kairos_core::config::EngineConfig;
use kairos_core::engine::RunState;
use kairos_core::error::{EngineError, RegistryError};
use kairos_core::event::{EngineEvent, EventHub};
use kairos_core::module::{InitContext, Lifecycle, Module, RenderContext};
use kairos_core::resource::ResourceHost;
use kairos_core::telemetry::FrameMetrics;
use kairos_core::time::TaskQueue;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Frames kept in the rolling FPS window.
pub const FPS_WINDOW: usize = 120;

/// Drives module lifecycles at a fixed logical rate over variable wall time.
pub struct Scheduler {
    registry: ModuleRegistry,
    state: RunState,
    config: EngineConfig,
    hub: Arc<EventHub>,
    resources: Arc<Mutex<dyn ResourceHost>>,

    tick_duration: Duration,
    max_delta: Duration,
    accumulator: Duration,
    interpolation: f32,
    last_tick: Option<Instant>,
    started_at: Option<Instant>,
    frame_count: u64,
    fps_window: RingBuffer<f32, FPS_WINDOW>,

    budget: ErrorBudget,
    recovery: Option<RecoveryPlan>,
    retries: TaskQueue<String>,
}

impl Scheduler {
    /// Creates a stopped scheduler with an empty registry.
    pub fn new(
        config: EngineConfig,
        hub: Arc<EventHub>,
        resources: Arc<Mutex<dyn ResourceHost>>,
    ) -> Self {
        Self {
            registry: ModuleRegistry::new(),
            state: RunState::Stopped,
            tick_duration: config.scheduler.tick_duration(),
            max_delta: config.scheduler.max_delta(),
            budget: ErrorBudget::new(&config.recovery),
            config,
            hub,
            resources,
            accumulator: Duration::ZERO,
            interpolation: 0.0,
            last_tick: None,
            started_at: None,
            frame_count: 0,
            fps_window: RingBuffer::new(),
            recovery: None,
            retries: TaskQueue::new(),
        }
    }

    // ── Registry surface ────────────────────────────────────────────────

    /// Registers `module` and publishes `engine:module-registered`.
    ///
    /// When the engine is already running the module is initialized
    /// immediately; otherwise `init` runs at the next `start`.
    pub fn register(
        &mut self,
        name: &str,
        module: Box<dyn Module>,
        priority: i32,
    ) -> Result<(), RegistryError> {
        self.registry.register(name, module, priority)?;
        if matches!(self.state, RunState::Running | RunState::Paused) {
            if let Some(index) = self.registry.index_of(name) {
                self.init_module(index);
            }
        }
        self.hub.emit(EngineEvent::ModuleRegistered {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Destroys (if initialized) and removes a module, publishing
    /// `engine:module-unregistered`.
    pub fn unregister(&mut self, name: &str) -> Result<(), RegistryError> {
        let index = self
            .registry
            .index_of(name)
            .ok_or_else(|| RegistryError::UnknownModule(name.to_string()))?;
        if self.registry.record(index).is_initialized() {
            let record = self.registry.record_mut(index);
            guard_stage(
                record,
                Lifecycle::Destroy,
                &self.hub,
                &mut self.budget,
                false,
                |module| module.destroy(),
            );
            self.registry.record_mut(index).initialized = false;
        }
        self.registry.remove(name)?;
        self.hub.emit(EngineEvent::ModuleUnregistered {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Enables or disables a module.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), RegistryError> {
        self.registry.set_enabled(name, enabled)
    }

    /// Changes a module's priority.
    pub fn set_priority(&mut self, name: &str, priority: i32) -> Result<(), RegistryError> {
        self.registry.set_priority(name, priority)
    }

    /// The module registry.
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    // ── Run-state machine ───────────────────────────────────────────────

    /// The current run state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Frames completed since the last `start`.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The fractional fixed-step remainder of the last frame.
    pub fn interpolation(&self) -> f32 {
        self.interpolation
    }

    /// Rolling average FPS over the sample window.
    pub fn average_fps(&self) -> f32 {
        self.fps_window.average()
    }

    /// The module a recovery plan is in flight for, if any.
    pub fn recovery_in_flight(&self) -> Option<&str> {
        self.recovery.as_ref().map(|plan| plan.module())
    }

    /// Initializes all modules and enters `Running`.
    ///
    /// Valid only from `Stopped`. A module whose `init` fails is left
    /// disabled; the remaining modules still initialize.
    pub fn start(&mut self, now: Instant) -> Result<(), EngineError> {
        match self.state {
            RunState::Stopped => {}
            RunState::Failed => return Err(EngineError::Failed),
            from => {
                return Err(EngineError::InvalidTransition {
                    from,
                    to: RunState::Running,
                })
            }
        }
        log::info!("Starting engine with {} module(s).", self.registry.len());

        self.budget.reset();
        self.recovery = None;
        self.retries.clear();
        self.accumulator = Duration::ZERO;
        self.interpolation = 0.0;
        self.frame_count = 0;
        self.fps_window.clear();
        self.last_tick = None;
        self.started_at = Some(now);
        self.state = RunState::Running;

        for index in self.registry.order().to_vec() {
            let record = self.registry.record(index);
            if record.enabled && !record.initialized {
                self.init_module(index);
            }
        }
        Ok(())
    }

    /// Tears down initialized modules and returns to `Stopped`.
    ///
    /// Valid from any state, including `Failed`; a stopped engine may be
    /// started again.
    pub fn stop(&mut self) {
        if self.state == RunState::Stopped {
            return;
        }
        log::info!("Stopping engine after {} frame(s).", self.frame_count);

        for index in self.registry.order().to_vec() {
            if !self.registry.record(index).is_initialized() {
                continue;
            }
            let record = self.registry.record_mut(index);
            guard_stage(
                record,
                Lifecycle::Destroy,
                &self.hub,
                &mut self.budget,
                false,
                |module| module.destroy(),
            );
            self.registry.record_mut(index).initialized = false;
        }

        self.state = RunState::Stopped;
        self.recovery = None;
        self.retries.clear();
        self.accumulator = Duration::ZERO;
        self.interpolation = 0.0;
        self.last_tick = None;
        self.started_at = None;
    }

    /// Suspends simulation passes; rendering and recovery continue.
    pub fn pause(&mut self) -> Result<(), EngineError> {
        match self.state {
            RunState::Running => {
                self.state = RunState::Paused;
                Ok(())
            }
            RunState::Failed => Err(EngineError::Failed),
            from => Err(EngineError::InvalidTransition {
                from,
                to: RunState::Paused,
            }),
        }
    }

    /// Returns from `Paused` to `Running`.
    ///
    /// Refused while a recovery plan is still in flight.
    pub fn resume(&mut self) -> Result<(), EngineError> {
        match self.state {
            RunState::Paused => {
                if let Some(plan) = &self.recovery {
                    return Err(EngineError::RecoveryPending(plan.module().to_string()));
                }
                self.state = RunState::Running;
                Ok(())
            }
            RunState::Failed => Err(EngineError::Failed),
            from => Err(EngineError::InvalidTransition {
                from,
                to: RunState::Running,
            }),
        }
    }

    // ── The frame ───────────────────────────────────────────────────────

    /// Runs one frame against the wall clock.
    pub fn tick(&mut self, memory_usage_bytes: u64) -> Option<FrameMetrics> {
        self.tick_at(Instant::now(), memory_usage_bytes)
    }

    /// Runs one frame at the given instant.
    ///
    /// Returns the frame's metrics, or `None` when the scheduler is
    /// `Stopped` or `Failed` and no frame ran.
    pub fn tick_at(&mut self, now: Instant, memory_usage_bytes: u64) -> Option<FrameMetrics> {
        if matches!(self.state, RunState::Stopped | RunState::Failed) {
            return None;
        }
        let frame_timer = Instant::now();

        // Recovery attempts fire at tick boundaries, also while paused.
        self.run_due_recovery(now);
        if self.state == RunState::Failed {
            return None;
        }

        let raw = match self.last_tick {
            Some(last) => now.saturating_duration_since(last),
            None => self.tick_duration,
        };
        self.last_tick = Some(now);
        let delta = raw.min(self.max_delta);
        if raw > self.max_delta {
            log::debug!(
                "Delta clamped from {}ms to {}ms; skipping lost time.",
                raw.as_millis(),
                delta.as_millis()
            );
        }

        let timestamp = self
            .started_at
            .map(|start| now.saturating_duration_since(start).as_secs_f64())
            .unwrap_or(0.0);
        let mut clean = true;

        self.hub.emit(EngineEvent::FrameStart { timestamp });

        let mut update_time_ms = 0.0;
        if self.state == RunState::Running {
            let update_timer = Instant::now();
            self.hub.emit(EngineEvent::UpdateStart { timestamp });

            self.accumulator += delta;
            let step = self.tick_duration;
            while self.accumulator >= step && self.state == RunState::Running {
                clean &= self.fixed_pass(step, now);
                self.accumulator -= step;
            }
            self.interpolation =
                (self.accumulator.as_secs_f64() / step.as_secs_f64()) as f32;

            if self.state == RunState::Running {
                clean &= self.update_pass(delta, now);
            }

            update_time_ms = update_timer.elapsed().as_secs_f32() * 1000.0;
            self.hub.emit(EngineEvent::UpdateEnd {
                timestamp,
                duration_ms: update_time_ms,
            });
        }

        let render_timer = Instant::now();
        self.hub.emit(EngineEvent::RenderStart { timestamp });
        clean &= self.render_pass(timestamp, now);
        let render_time_ms = render_timer.elapsed().as_secs_f32() * 1000.0;
        self.hub.emit(EngineEvent::RenderEnd {
            timestamp,
            duration_ms: render_time_ms,
        });

        self.frame_count += 1;
        let delta_secs = delta.as_secs_f32();
        let fps = if delta_secs > 0.0 { 1.0 / delta_secs } else { 0.0 };
        self.fps_window.push(fps);

        if self.state == RunState::Running && clean {
            self.budget.decay();
        }

        let metrics = FrameMetrics {
            fps,
            avg_fps: self.fps_window.average(),
            update_time_ms,
            render_time_ms,
            total_frame_time_ms: frame_timer.elapsed().as_secs_f32() * 1000.0,
            memory_usage_bytes,
            frame_count: self.frame_count,
        };
        self.hub.emit(EngineEvent::PerformanceUpdate(metrics));
        Some(metrics)
    }

    // ── Passes ──────────────────────────────────────────────────────────

    fn fixed_pass(&mut self, step: Duration, now: Instant) -> bool {
        let mut clean = true;
        for index in self.registry.order().to_vec() {
            let record = self.registry.record_mut(index);
            if !record.enabled
                || !record.initialized
                || !record.capabilities.contains(Lifecycle::FixedUpdate)
            {
                continue;
            }
            let ok = guard_stage(
                record,
                Lifecycle::FixedUpdate,
                &self.hub,
                &mut self.budget,
                self.config.recovery.disable_on_error,
                |module| module.fixed_update(step),
            );
            if !ok {
                clean = false;
                let name = self.registry.record(index).name().to_string();
                self.handle_breach(&name, now);
            }
        }
        clean
    }

    fn update_pass(&mut self, delta: Duration, now: Instant) -> bool {
        let mut clean = true;
        let interpolation = self.interpolation;
        for index in self.registry.order().to_vec() {
            let record = self.registry.record_mut(index);
            if !record.enabled
                || !record.initialized
                || !record.capabilities.contains(Lifecycle::Update)
            {
                continue;
            }
            let timer = Instant::now();
            let ok = guard_stage(
                record,
                Lifecycle::Update,
                &self.hub,
                &mut self.budget,
                self.config.recovery.disable_on_error,
                |module| module.update(delta, interpolation),
            );
            self.registry.record_mut(index).last_update = timer.elapsed();
            if !ok {
                clean = false;
                let name = self.registry.record(index).name().to_string();
                self.handle_breach(&name, now);
            }
        }
        clean
    }

    fn render_pass(&mut self, timestamp: f64, now: Instant) -> bool {
        let mut clean = true;
        let ctx = RenderContext {
            timestamp,
            interpolation: self.interpolation,
            frame_count: self.frame_count,
        };
        for index in self.registry.order().to_vec() {
            let record = self.registry.record_mut(index);
            if !record.enabled
                || !record.initialized
                || !record.capabilities.contains(Lifecycle::Render)
            {
                continue;
            }
            let timer = Instant::now();
            let ok = guard_stage(
                record,
                Lifecycle::Render,
                &self.hub,
                &mut self.budget,
                self.config.recovery.disable_on_error,
                |module| module.render(&ctx),
            );
            self.registry.record_mut(index).last_render = timer.elapsed();
            if !ok {
                clean = false;
                let name = self.registry.record(index).name().to_string();
                self.handle_breach(&name, now);
            }
        }
        clean
    }

    // ── Init, breach, recovery ──────────────────────────────────────────

    fn init_module(&mut self, index: usize) {
        let record = self.registry.record_mut(index);
        // A failing init always leaves the module disabled, regardless of
        // the disable-on-error policy for frame stages.
        let ok = guard_stage(
            record,
            Lifecycle::Init,
            &self.hub,
            &mut self.budget,
            true,
            |module| {
                let mut ctx = InitContext {
                    hub: &self.hub,
                    config: &self.config,
                    resources: &self.resources,
                };
                module.init(&mut ctx)
            },
        );
        if ok {
            self.registry.record_mut(index).initialized = true;
        }
    }

    fn handle_breach(&mut self, name: &str, now: Instant) {
        if !self.budget.is_breached() || self.recovery.is_some() {
            return;
        }
        log::warn!(
            "Error budget breached (level {:.1}); pausing and scheduling recovery for '{name}'.",
            self.budget.level()
        );
        if self.state == RunState::Running {
            self.state = RunState::Paused;
        }
        let plan = RecoveryPlan::new(name, &self.config.recovery);
        if plan.is_exhausted() {
            self.enter_failed(name, "no recovery attempts configured".to_string());
            return;
        }
        self.retries
            .schedule_at(now + plan.retry_delay(), name.to_string());
        self.recovery = Some(plan);
    }

    fn run_due_recovery(&mut self, now: Instant) {
        for name in self.retries.poll(now) {
            let matches_plan = self
                .recovery
                .as_ref()
                .is_some_and(|plan| plan.module() == name);
            if matches_plan {
                self.attempt_recovery(&name, now);
            }
        }
    }

    fn attempt_recovery(&mut self, name: &str, now: Instant) {
        let Some(mut plan) = self.recovery.take() else {
            return;
        };
        let Some(index) = self.registry.index_of(name) else {
            log::warn!("Recovery target '{name}' is no longer registered; dropping the plan.");
            return;
        };
        log::info!(
            "Recovery attempt {} of {} for module '{name}'.",
            plan.attempts_made() + 1,
            plan.max_attempts()
        );

        let record = self.registry.record_mut(index);
        let result = record.module.destroy().and_then(|()| {
            let mut ctx = InitContext {
                hub: &self.hub,
                config: &self.config,
                resources: &self.resources,
            };
            record.module.init(&mut ctx)
        });

        match result {
            Ok(()) => {
                let record = self.registry.record_mut(index);
                record.enabled = true;
                record.initialized = true;
                record.failures = 0;
                self.budget.reset();
                log::info!("Module '{name}' recovered; awaiting resume.");
            }
            Err(error) => {
                plan.record_attempt();
                log::warn!(
                    "Recovery attempt {} for '{name}' failed: {error:#}.",
                    plan.attempts_made()
                );
                if plan.is_exhausted() {
                    self.enter_failed(name, format!("{error:#}"));
                } else {
                    self.retries
                        .schedule_at(now + plan.retry_delay(), name.to_string());
                    self.recovery = Some(plan);
                }
            }
        }
    }

    fn enter_failed(&mut self, name: &str, error: String) {
        log::error!(
            "Recovery for module '{name}' exhausted; engine entering the failed state: {error}"
        );
        self.state = RunState::Failed;
        self.recovery = None;
        self.retries.clear();
        self.hub.emit(EngineEvent::ModuleError {
            name: name.to_string(),
            stage: Lifecycle::Init,
            error,
        });
    }
}
