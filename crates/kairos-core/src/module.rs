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

//! The module capability surface.
//!
//! A module is a named unit of per-frame work exposing any subset of the six
//! lifecycle stages. The implemented subset is declared once through
//! [`Module::capabilities`] and checked at registration; the scheduler never
//! re-probes it per frame.

use crate::config::EngineConfig;
use crate::event::EventHub;
use crate::resource::ResourceHost;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// The six lifecycle stages a module may implement.
///
/// Doubles as the stage tag carried by `engine:module-error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// One-time setup before the first frame.
    Init,
    /// Fixed-timestep simulation step.
    FixedUpdate,
    /// Variable-timestep per-frame step.
    Update,
    /// Presentation pass; runs even while paused.
    Render,
    /// Teardown on unregistration or engine stop.
    Destroy,
    /// Return to a pristine state without teardown.
    Reset,
}

impl Lifecycle {
    /// All stages, in scheduler invocation order.
    pub const ALL: [Lifecycle; 6] = [
        Lifecycle::Init,
        Lifecycle::FixedUpdate,
        Lifecycle::Update,
        Lifecycle::Render,
        Lifecycle::Destroy,
        Lifecycle::Reset,
    ];

    /// Stable wire name of the stage, as carried in error events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Init => "init",
            Lifecycle::FixedUpdate => "fixed-update",
            Lifecycle::Update => "update",
            Lifecycle::Render => "render",
            Lifecycle::Destroy => "destroy",
            Lifecycle::Reset => "reset",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Lifecycle::Init => 1 << 0,
            Lifecycle::FixedUpdate => 1 << 1,
            Lifecycle::Update => 1 << 2,
            Lifecycle::Render => 1 << 3,
            Lifecycle::Destroy => 1 << 4,
            Lifecycle::Reset => 1 << 5,
        }
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The tagged set of lifecycle stages a module implements.
///
/// Built once in [`Module::capabilities`]; a module whose set is empty is
/// rejected at registration.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns a copy of the set with `stage` added. Usable in constants.
    pub const fn with(self, stage: Lifecycle) -> Self {
        Self(self.0 | stage.bit())
    }

    /// Adds `stage` in place.
    pub fn insert(&mut self, stage: Lifecycle) {
        self.0 |= stage.bit();
    }

    /// Returns `true` if `stage` is in the set.
    pub const fn contains(&self, stage: Lifecycle) -> bool {
        self.0 & stage.bit() != 0
    }

    /// Returns `true` if no stage is declared.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of declared stages.
    pub const fn len(&self) -> u32 {
        self.0.count_ones()
    }
}

impl std::fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut set = f.debug_set();
        for stage in Lifecycle::ALL {
            if self.contains(stage) {
                set.entry(&stage);
            }
        }
        set.finish()
    }
}

/// Host services handed to a module's `init`.
pub struct InitContext<'a> {
    /// The engine's event channel; modules clone the `Arc` to keep it.
    pub hub: &'a Arc<EventHub>,
    /// The active configuration.
    pub config: &'a EngineConfig,
    /// The shared resource manager, behind its host trait.
    pub resources: &'a Arc<Mutex<dyn ResourceHost>>,
}

/// Frame snapshot handed to a module's `render`.
///
/// Rendering itself is out of scope for the core; modules draw to whatever
/// surface they acquired during `init`.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    /// Seconds since the engine started.
    pub timestamp: f64,
    /// Fractional progress between the last two fixed steps, in `[0, 1)`.
    pub interpolation: f32,
    /// Frames completed so far.
    pub frame_count: u64,
}

/// A named unit of per-frame work driven by the scheduler.
///
/// All lifecycle methods default to `Ok(())`; implementations override the
/// stages they declare in [`Module::capabilities`]. Returning an `Err` is the
/// module's way of failing a stage — the isolation guard catches it, the
/// frame continues.
pub trait Module: Send {
    /// The lifecycle stages this module implements.
    fn capabilities(&self) -> CapabilitySet;

    /// One-time setup. A failing `init` leaves the module disabled.
    fn init(&mut self, _ctx: &mut InitContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// One fixed simulation step of exactly `step` simulated time.
    fn fixed_update(&mut self, _step: Duration) -> anyhow::Result<()> {
        Ok(())
    }

    /// One variable step of `delta` wall-clock time; `interpolation` is the
    /// fractional fixed-step remainder for smoothing.
    fn update(&mut self, _delta: Duration, _interpolation: f32) -> anyhow::Result<()> {
        Ok(())
    }

    /// One presentation pass. Invoked even while the scheduler is paused.
    fn render(&mut self, _ctx: &RenderContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Teardown. Invoked on unregistration, engine stop, and recovery.
    fn destroy(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Returns the module to a pristine state without tearing it down.
    fn reset(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
