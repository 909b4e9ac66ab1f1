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

//! # Kairos Control
//!
//! The adaptive performance controller. It watches the timing and
//! resource-pressure signals the scheduler and telemetry publish, classifies
//! the engine's health, and when the health is bad enough applies mitigation
//! strategies by publishing command events — it never touches rendering or
//! module state itself.
//!
//! Three pieces:
//! - [`analysis`]: the heuristic engine turning sample windows into an
//!   [`AnalysisSnapshot`](kairos_core::control::AnalysisSnapshot).
//! - [`strategy`]: the priority-ordered mitigation table and its application.
//! - [`controller`]: the interval-gated driver owning the windows, the
//!   cooldown, and the delayed impact measurement.

#![warn(missing_docs)]

pub mod analysis;
pub mod controller;
pub mod strategy;

pub use analysis::{HeuristicEngine, SampleWindows};
pub use controller::PerformanceController;
pub use strategy::StrategyTable;
