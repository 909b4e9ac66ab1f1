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

//! End-to-end behavior of the assembled engine.

use kairos_core::config::EngineConfig;
use kairos_core::engine::RunState;
use kairos_core::event::{EngineEvent, Topic};
use kairos_core::module::{CapabilitySet, Lifecycle, Module, RenderContext};
use kairos_runtime::Engine;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Default)]
struct FrameLog {
    updates: AtomicUsize,
    renders: AtomicUsize,
}

struct Observer {
    log: Arc<FrameLog>,
}

impl Module for Observer {
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::empty()
            .with(Lifecycle::Update)
            .with(Lifecycle::Render)
    }

    fn update(&mut self, _delta: Duration, _interpolation: f32) -> anyhow::Result<()> {
        self.log.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn render(&mut self, _ctx: &RenderContext) -> anyhow::Result<()> {
        self.log.renders.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn pool_handles_are_bounded_by_the_ceiling() {
    let engine = Engine::new(EngineConfig::default());
    engine
        .with_resources(|manager| {
            manager.create_pool(
                "projectiles",
                5,
                20,
                || Ok(Vec::<u8>::with_capacity(64)),
                Vec::clear,
            )
        })
        .expect("built-in resource manager")
        .unwrap();

    let handles = engine
        .with_resources(|manager| {
            let pool = manager.pool_mut::<Vec<u8>>("projectiles").unwrap();
            (0..20).map(|_| pool.acquire()).collect::<Vec<_>>()
        })
        .unwrap();
    assert!(handles.iter().all(Option::is_some), "20 acquires succeed");

    // The ceiling is hard: the 21st acquire misses instead of growing.
    let over = engine
        .with_resources(|manager| manager.acquire::<Vec<u8>>("projectiles"))
        .unwrap();
    assert!(over.is_none());

    // One release frees exactly one slot.
    let released = handles[0].unwrap();
    engine
        .with_resources(|manager| {
            assert!(manager.release::<Vec<u8>>("projectiles", released));
            assert!(manager.acquire::<Vec<u8>>("projectiles").is_some());
        })
        .unwrap();
}

#[test]
fn hub_control_topics_apply_at_the_tick_boundary() {
    let mut engine = Engine::new(EngineConfig::default());
    engine.start().unwrap();
    let t0 = Instant::now();
    engine.tick_at(t0);

    // The pause request is queued, not applied mid-frame.
    engine.hub().emit(EngineEvent::Pause);
    assert_eq!(engine.state(), RunState::Running);

    engine.tick_at(t0 + Duration::from_millis(16));
    assert_eq!(engine.state(), RunState::Paused);

    engine.hub().emit(EngineEvent::Resume);
    engine.tick_at(t0 + Duration::from_millis(32));
    assert_eq!(engine.state(), RunState::Running);

    engine.hub().emit(EngineEvent::Stop);
    engine.tick_at(t0 + Duration::from_millis(48));
    assert_eq!(engine.state(), RunState::Stopped);
}

#[test]
fn a_frame_publishes_its_events_in_order() {
    let mut engine = Engine::new(EngineConfig::default());
    let log = Arc::new(FrameLog::default());
    engine
        .register("observer", Box::new(Observer { log: Arc::clone(&log) }), 0)
        .unwrap();

    let tap = engine.tap();
    engine.start().unwrap();
    engine.tick_at(Instant::now());

    let topics: Vec<Topic> = tap
        .receiver()
        .try_iter()
        .map(|event| event.topic())
        .collect();
    let position = |topic: Topic| {
        topics
            .iter()
            .position(|&t| t == topic)
            .unwrap_or_else(|| panic!("missing {topic}"))
    };

    assert!(position(Topic::FrameStart) < position(Topic::UpdateStart));
    assert!(position(Topic::UpdateStart) < position(Topic::UpdateEnd));
    assert!(position(Topic::UpdateEnd) < position(Topic::RenderStart));
    assert!(position(Topic::RenderStart) < position(Topic::RenderEnd));
    assert!(position(Topic::RenderEnd) < position(Topic::PerformanceUpdate));
    assert_eq!(log.updates.load(Ordering::SeqCst), 1);
    assert_eq!(log.renders.load(Ordering::SeqCst), 1);
}

#[test]
fn taps_fan_out_across_threads() {
    let mut engine = Engine::new(EngineConfig::default());
    let tap = engine.tap();
    engine.start().unwrap();

    let watcher = std::thread::spawn(move || {
        let mut frames = 0;
        while let Ok(event) = tap.receiver().recv_timeout(Duration::from_secs(5)) {
            if event.topic() == Topic::PerformanceUpdate {
                frames += 1;
                if frames == 3 {
                    break;
                }
            }
        }
        frames
    });

    let t0 = Instant::now();
    for i in 0..3 {
        engine.tick_at(t0 + Duration::from_millis(16 * i));
    }
    assert_eq!(watcher.join().unwrap(), 3);
}

#[test]
fn clear_caches_request_empties_caches_and_reports() {
    let engine = Engine::new(EngineConfig::default());
    engine
        .with_resources(|manager| {
            manager.create_default_cache::<String, u32>("meshes").unwrap();
            let cache = manager.cache_mut::<String, u32>("meshes").unwrap();
            cache.insert("cube".to_string(), 8);
            cache.insert("sphere".to_string(), 64);
        })
        .unwrap();

    let reports = Arc::new(Mutex::new(Vec::new()));
    let clone = Arc::clone(&reports);
    engine.hub().on(Topic::CleanupCompleted, move |event| {
        if let EngineEvent::CleanupCompleted(report) = event {
            clone.lock().unwrap().push(*report);
        }
        Ok(())
    });

    engine.hub().emit(EngineEvent::ClearCaches);

    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].caches_cleared, 1);
    assert_eq!(reports[0].cache_entries_removed, 2);
    assert_eq!(
        engine
            .with_resources(|manager| manager.cache::<String, u32>("meshes").unwrap().len())
            .unwrap(),
        0
    );
}

#[test]
fn cleanup_requests_are_idempotent() {
    let engine = Engine::new(EngineConfig::default());
    let completions = Arc::new(AtomicUsize::new(0));
    let clone = Arc::clone(&completions);
    engine.hub().on(Topic::CleanupCompleted, move |_| {
        clone.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    engine.hub().emit(EngineEvent::CleanupRequested);
    engine.hub().emit(EngineEvent::ForceGc);
    engine.hub().emit(EngineEvent::ForceGc);

    // Every request completes, even when there is nothing left to free.
    assert_eq!(completions.load(Ordering::SeqCst), 3);
}

#[test]
fn analysis_events_flow_during_normal_operation() {
    let mut config = EngineConfig::default();
    config.controller.analysis_interval_ms = 10;
    let mut engine = Engine::new(config);

    let analyses = Arc::new(AtomicUsize::new(0));
    let clone = Arc::clone(&analyses);
    engine.hub().on(Topic::Analysis, move |_| {
        clone.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    engine.start().unwrap();
    let t0 = Instant::now();
    for i in 0..4 {
        engine.tick_at(t0 + Duration::from_millis(10 * i));
    }
    assert!(analyses.load(Ordering::SeqCst) >= 2);
}
