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

//! # Kairos Runtime
//!
//! The frame-driven heart of the engine: the module registry and its
//! deterministic schedule order, the fixed-timestep [`Scheduler`] with its
//! error-isolation guard and bounded recovery, and the [`Engine`] facade
//! that wires the scheduler to the event hub, the resource manager, the
//! performance controller, and telemetry.
//!
//! Everything runs single-threaded and cooperatively: the host calls
//! [`Engine::tick`] once per display refresh, and every module callback
//! runs to completion on that thread in schedule order.

#![warn(missing_docs)]

pub mod engine;
pub mod isolation;
pub mod recovery;
pub mod registry;
pub mod scheduler;

pub use engine::Engine;
pub use isolation::ErrorBudget;
pub use recovery::RecoveryPlan;
pub use registry::{ModuleRecord, ModuleRegistry};
pub use scheduler::Scheduler;
