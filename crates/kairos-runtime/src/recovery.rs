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

//! Bounded recovery plans for modules that breached the error budget.

use kairos_core::config::RecoveryConfig;
use std::time::Duration;

/// One in-flight attempt to bring a failing module back.
///
/// A plan is created when the error budget breaches and names the offending
/// module. Each attempt is a destroy-then-init cycle run by the scheduler
/// from its deferred-task queue; the plan only does the bookkeeping. At most
/// one plan exists at a time, and exhausting the attempt bound is what sends
/// the engine to the terminal failed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPlan {
    module: String,
    attempts_made: u32,
    max_attempts: u32,
    retry_delay: Duration,
}

impl RecoveryPlan {
    /// Creates a plan for `module` bounded by the recovery configuration.
    pub fn new(module: impl Into<String>, config: &RecoveryConfig) -> Self {
        Self {
            module: module.into(),
            attempts_made: 0,
            max_attempts: config.retry_count,
            retry_delay: config.retry_delay(),
        }
    }

    /// The module this plan is recovering.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Attempts already made.
    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    /// The configured attempt bound.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Books one failed attempt.
    pub fn record_attempt(&mut self) {
        self.attempts_made += 1;
    }

    /// Whether the attempt bound is used up.
    pub fn is_exhausted(&self) -> bool {
        self.attempts_made >= self.max_attempts
    }

    /// Delay between consecutive attempts.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(retries: u32, delay_ms: u64) -> RecoveryConfig {
        RecoveryConfig {
            retry_count: retries,
            retry_delay_ms: delay_ms,
            ..RecoveryConfig::default()
        }
    }

    #[test]
    fn fresh_plan_has_attempts_left() {
        let plan = RecoveryPlan::new("physics", &config(3, 1000));
        assert_eq!(plan.module(), "physics");
        assert_eq!(plan.attempts_made(), 0);
        assert!(!plan.is_exhausted());
        assert_eq!(plan.retry_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn exhausts_exactly_at_the_bound() {
        let mut plan = RecoveryPlan::new("physics", &config(3, 100));
        plan.record_attempt();
        plan.record_attempt();
        assert!(!plan.is_exhausted());

        plan.record_attempt();
        assert!(plan.is_exhausted());
    }

    #[test]
    fn zero_retries_is_exhausted_immediately() {
        let plan = RecoveryPlan::new("physics", &config(0, 100));
        assert!(plan.is_exhausted());
    }
}
