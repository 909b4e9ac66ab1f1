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

//! # Kairos Core
//!
//! Foundational crate containing traits, core types, and interface contracts
//! that define the runtime's architecture: the module capability surface, the
//! event channel, configuration, timing utilities, and telemetry value types.

#![warn(missing_docs)]

pub mod collections;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod event;
pub mod module;
pub mod resource;
pub mod telemetry;
pub mod time;

pub use config::EngineConfig;
pub use engine::{EngineCommand, RunState};
pub use error::{EngineError, RegistryError};
pub use event::{EngineEvent, EventHub, Topic};
pub use module::{CapabilitySet, Lifecycle, Module};
pub use time::Stopwatch;
