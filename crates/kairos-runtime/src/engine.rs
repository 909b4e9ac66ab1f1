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

//! The engine facade.
//!
//! [`Engine`] owns the scheduler, the resource manager, the telemetry
//! service, and the performance controller, and wires them together over
//! the event hub. Hosts either drive [`Engine::tick`] themselves or hand
//! the thread to [`Engine::run`].
//!
//! Control can come from three places that all converge on the same state
//! machine: direct method calls, the cross-thread command queue, and the
//! hub's `engine:*` control topics. Queued and topic-driven commands take
//! effect at the next tick boundary.

use crate::scheduler::Scheduler;
use crossbeam_channel::{bounded, Receiver, Sender};
use kairos_control::PerformanceController;
use kairos_core::config::EngineConfig;
use kairos_core::engine::{EngineCommand, RunState};
use kairos_core::error::{EngineError, RegistryError};
use kairos_core::event::{EngineEvent, EventBus, EventHub, Topic};
use kairos_core::module::Module;
use kairos_core::resource::ResourceHost;
use kairos_core::telemetry::FrameMetrics;
use kairos_resources::ResourceManager;
use kairos_telemetry::{
    CounterHandle, GaugeHandle, HistogramHandle, MetricsRegistry, TelemetryService,
};
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

/// Capacity of the cross-thread command queue.
const COMMAND_QUEUE_CAPACITY: usize = 64;

/// The assembled runtime: scheduler, resources, telemetry, and control.
pub struct Engine {
    config: EngineConfig,
    hub: Arc<EventHub>,
    resources: Arc<Mutex<dyn ResourceHost>>,
    scheduler: Scheduler,
    telemetry: TelemetryService,
    controller: PerformanceController,
    command_tx: Sender<EngineCommand>,
    command_rx: Receiver<EngineCommand>,
    fps_gauge: GaugeHandle,
    frame_time: HistogramHandle,
    frames: CounterHandle,
}

impl Engine {
    /// Assembles an engine from `config`.
    pub fn new(config: EngineConfig) -> Self {
        let hub = Arc::new(EventHub::new());
        let resources: Arc<Mutex<dyn ResourceHost>> = Arc::new(Mutex::new(
            ResourceManager::new(config.resources.clone()),
        ));
        let scheduler = Scheduler::new(
            config.clone(),
            Arc::clone(&hub),
            Arc::clone(&resources),
        );
        let telemetry = TelemetryService::new(&config.telemetry);
        let controller = PerformanceController::new(&config);
        controller.attach(&hub);

        let (command_tx, command_rx) = bounded(COMMAND_QUEUE_CAPACITY);
        Self::wire_control_topics(&hub, &command_tx);
        Self::wire_memory_topics(&hub, &resources);

        let fps_gauge = telemetry.metrics().gauge("engine", "fps");
        let frame_time = telemetry.metrics().histogram("engine", "frame_time_ms");
        let frames = telemetry.metrics().counter("engine", "frames");

        Self {
            config,
            hub,
            resources,
            scheduler,
            telemetry,
            controller,
            command_tx,
            command_rx,
            fps_gauge,
            frame_time,
            frames,
        }
    }

    /// Forwards the hub's `engine:*` control topics into the command queue.
    fn wire_control_topics(hub: &Arc<EventHub>, command_tx: &Sender<EngineCommand>) {
        for (topic, command) in [
            (Topic::Start, EngineCommand::Start),
            (Topic::Stop, EngineCommand::Stop),
            (Topic::Pause, EngineCommand::Pause),
            (Topic::Resume, EngineCommand::Resume),
        ] {
            let tx = command_tx.clone();
            hub.on(topic, move |_| {
                if tx.try_send(command).is_err() {
                    log::warn!("Command queue full; dropping {command:?} from '{topic}'.");
                }
                Ok(())
            });
        }
    }

    /// Routes the `memory:*` request topics to the resource host.
    ///
    /// Handlers hold the hub weakly; the completion event is published from
    /// inside the handler and flushed by the emitting dispatch.
    fn wire_memory_topics(hub: &Arc<EventHub>, resources: &Arc<Mutex<dyn ResourceHost>>) {
        for topic in [Topic::Cleanup, Topic::ForceGc, Topic::ClearCaches] {
            let host = Arc::clone(resources);
            let weak: Weak<EventHub> = Arc::downgrade(hub);
            hub.on(topic, move |_| {
                let report = {
                    let mut host = host.lock().unwrap();
                    match topic {
                        Topic::ForceGc => host.handle_memory_pressure(),
                        Topic::ClearCaches => host.clear_caches(),
                        _ => host.cleanup(),
                    }
                };
                if let Some(hub) = weak.upgrade() {
                    hub.emit(EngineEvent::CleanupCompleted(report));
                }
                Ok(())
            });
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The event hub.
    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    /// A cloneable sender for cross-thread control commands.
    pub fn commands(&self) -> Sender<EngineCommand> {
        self.command_tx.clone()
    }

    /// Opens a cross-thread tap receiving a copy of every engine event.
    pub fn tap(&self) -> EventBus<EngineEvent> {
        self.hub.add_tap()
    }

    /// The metrics registry.
    pub fn metrics(&self) -> &MetricsRegistry {
        self.telemetry.metrics()
    }

    /// The current run state.
    pub fn state(&self) -> RunState {
        self.scheduler.state()
    }

    /// Frames completed since the last start.
    pub fn frame_count(&self) -> u64 {
        self.scheduler.frame_count()
    }

    /// Runs `f` against the concrete resource manager.
    ///
    /// Returns `None` if the host is not the built-in manager (a test
    /// substitute, for instance).
    pub fn with_resources<T>(&self, f: impl FnOnce(&mut ResourceManager) -> T) -> Option<T> {
        let mut host = self.resources.lock().unwrap();
        host.as_any_mut().downcast_mut::<ResourceManager>().map(f)
    }

    // ── Module surface ──────────────────────────────────────────────────

    /// Registers a module. See [`Scheduler::register`].
    pub fn register(
        &mut self,
        name: &str,
        module: Box<dyn Module>,
        priority: i32,
    ) -> Result<(), RegistryError> {
        self.scheduler.register(name, module, priority)
    }

    /// Unregisters a module. See [`Scheduler::unregister`].
    pub fn unregister(&mut self, name: &str) -> Result<(), RegistryError> {
        self.scheduler.unregister(name)
    }

    /// Enables or disables a module.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), RegistryError> {
        self.scheduler.set_enabled(name, enabled)
    }

    /// Changes a module's priority.
    pub fn set_priority(&mut self, name: &str, priority: i32) -> Result<(), RegistryError> {
        self.scheduler.set_priority(name, priority)
    }

    // ── Control surface ─────────────────────────────────────────────────

    /// Starts the engine.
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.scheduler.start(Instant::now())
    }

    /// Stops the engine. Valid from any state.
    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// Pauses simulation; rendering continues.
    pub fn pause(&mut self) -> Result<(), EngineError> {
        self.scheduler.pause()
    }

    /// Resumes simulation.
    pub fn resume(&mut self) -> Result<(), EngineError> {
        self.scheduler.resume()
    }

    // ── The loop ────────────────────────────────────────────────────────

    /// Runs one frame against the wall clock.
    pub fn tick(&mut self) -> Option<FrameMetrics> {
        self.tick_at(Instant::now())
    }

    /// Runs one frame at the given instant.
    ///
    /// Drains queued commands, gives telemetry its interval-gated refresh,
    /// runs the scheduler's frame, feeds the controller, and records the
    /// frame metrics.
    pub fn tick_at(&mut self, now: Instant) -> Option<FrameMetrics> {
        self.drain_commands(now);

        self.telemetry.tick(now);
        let memory = self.telemetry.latest_memory();

        let metrics = self.scheduler.tick_at(now, memory.process_bytes)?;

        self.controller.record_frame(&metrics);
        self.controller.record_pressure(memory.pressure() as f32);
        self.record_metrics(&metrics);
        self.controller.tick(now, &self.hub);

        Some(metrics)
    }

    /// Starts the engine and drives it until it stops or fails.
    ///
    /// Paces the loop to the fixed tick rate; a frame that overruns its
    /// budget is followed immediately by the next one.
    pub fn run(&mut self) -> Result<(), EngineError> {
        self.start()?;
        let budget = self.config.scheduler.tick_duration();
        while matches!(self.state(), RunState::Running | RunState::Paused) {
            let frame_start = Instant::now();
            self.tick_at(frame_start);
            let elapsed = frame_start.elapsed();
            if elapsed < budget {
                std::thread::sleep(budget - elapsed);
            }
        }
        if self.state() == RunState::Failed {
            return Err(EngineError::Failed);
        }
        Ok(())
    }

    fn drain_commands(&mut self, now: Instant) {
        while let Ok(command) = self.command_rx.try_recv() {
            let result = match command {
                EngineCommand::Start => self.scheduler.start(now),
                EngineCommand::Stop => {
                    self.scheduler.stop();
                    Ok(())
                }
                EngineCommand::Pause => self.scheduler.pause(),
                EngineCommand::Resume => self.scheduler.resume(),
            };
            if let Err(e) = result {
                log::warn!("Ignoring queued {command:?}: {e}");
            }
        }
    }

    fn record_metrics(&self, metrics: &FrameMetrics) {
        if let Err(e) = self.fps_gauge.set(f64::from(metrics.fps)) {
            log::error!("Failed to record fps gauge: {e}");
        }
        if let Err(e) = self.frame_time.observe(f64::from(metrics.total_frame_time_ms)) {
            log::error!("Failed to record frame-time histogram: {e}");
        }
        if let Err(e) = self.frames.increment(1) {
            log::error!("Failed to record frame counter: {e}");
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.state() != RunState::Stopped {
            self.scheduler.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_core::telemetry::MetricId;

    #[test]
    fn frame_metrics_land_in_the_registry() {
        let mut engine = Engine::new(EngineConfig::default());
        engine.start().unwrap();
        let t0 = Instant::now();
        engine.tick_at(t0);
        engine.tick_at(t0 + std::time::Duration::from_millis(16));

        let frames = engine
            .metrics()
            .get(&MetricId::new("engine", "frames"))
            .unwrap();
        assert_eq!(frames.as_counter(), Some(2));

        let frame_time = engine
            .metrics()
            .get(&MetricId::new("engine", "frame_time_ms"))
            .unwrap();
        assert_eq!(frame_time.as_histogram().unwrap().count, 2);

        assert!(engine
            .metrics()
            .get(&MetricId::new("engine", "fps"))
            .unwrap()
            .as_gauge()
            .is_some());
    }

    #[test]
    fn queued_commands_apply_at_the_tick_boundary() {
        let mut engine = Engine::new(EngineConfig::default());
        engine.start().unwrap();
        let t0 = Instant::now();
        engine.tick_at(t0);

        engine.commands().send(EngineCommand::Pause).unwrap();
        assert_eq!(engine.state(), RunState::Running);

        engine.tick_at(t0 + std::time::Duration::from_millis(16));
        assert_eq!(engine.state(), RunState::Paused);
    }

    #[test]
    fn ticking_a_stopped_engine_is_inert() {
        let mut engine = Engine::new(EngineConfig::default());
        assert!(engine.tick_at(Instant::now()).is_none());
        assert_eq!(engine.frame_count(), 0);
    }

    #[test]
    fn with_resources_reaches_the_concrete_manager() {
        let engine = Engine::new(EngineConfig::default());
        let counts = engine.with_resources(|manager| (manager.pool_count(), manager.cache_count()));
        assert_eq!(counts, Some((0, 0)));
    }
}
