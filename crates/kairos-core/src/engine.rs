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

//! Run-state vocabulary shared between the scheduler and its observers.

use serde::{Deserialize, Serialize};

/// The scheduler's lifecycle state.
///
/// Transitions: `Stopped → Running ⇄ Paused → Stopped`. `Failed` is terminal
/// and entered only when a recovery plan exhausts its attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RunState {
    /// Not started, or stopped after teardown. The only state `start` accepts.
    #[default]
    Stopped,
    /// Ticking normally.
    Running,
    /// Simulation suspended; render passes and recovery still run.
    Paused,
    /// Recovery exhausted its attempts. Terminal and observable.
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A control command applied by the scheduler at the next tick boundary.
///
/// Commands arrive either through the engine's command queue or through the
/// corresponding `engine:*` control topics on the event hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    /// Initialize all modules and enter `Running`.
    Start,
    /// Tear down initialized modules and enter `Stopped`.
    Stop,
    /// Suspend simulation passes, keep rendering.
    Pause,
    /// Return from `Paused` to `Running`.
    Resume,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_stopped() {
        assert_eq!(RunState::default(), RunState::Stopped);
    }

    #[test]
    fn state_displays_as_variant_name() {
        assert_eq!(RunState::Paused.to_string(), "Paused");
    }
}
