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

//! Error taxonomy of the runtime's public API.
//!
//! Module callback failures travel as `anyhow::Error` through the isolation
//! guard; the enums here cover the structural failures the API returns by
//! value and never panics over.

use crate::engine::RunState;
use thiserror::Error;

/// Failures of the module registry's public operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A module with the same name is already registered.
    #[error("module '{0}' is already registered")]
    DuplicateName(String),

    /// The module declares no lifecycle capability at all.
    #[error("module '{0}' implements none of the recognized lifecycle capabilities")]
    NoCapabilities(String),

    /// No module with that name is registered.
    #[error("module '{0}' is not registered")]
    UnknownModule(String),
}

/// Failures of the scheduler's control surface.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The requested run-state transition is not part of the state machine.
    #[error("invalid run-state transition: {from} -> {to}")]
    InvalidTransition {
        /// State the scheduler was in.
        from: RunState,
        /// State the caller asked for.
        to: RunState,
    },

    /// `resume` was called while a recovery plan is still in flight.
    #[error("cannot resume: recovery for module '{0}' has not completed")]
    RecoveryPending(String),

    /// The engine reached the terminal failed state; only `stop` is accepted.
    #[error("engine is in the terminal failed state")]
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_errors_render_module_names() {
        let err = RegistryError::DuplicateName("physics".to_string());
        assert_eq!(err.to_string(), "module 'physics' is already registered");
    }

    #[test]
    fn transition_error_renders_both_states() {
        let err = EngineError::InvalidTransition {
            from: RunState::Running,
            to: RunState::Running,
        };
        assert_eq!(
            err.to_string(),
            "invalid run-state transition: Running -> Running"
        );
    }
}
