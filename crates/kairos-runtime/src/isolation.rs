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

//! The error-isolation guard and the process-wide error budget.
//!
//! Every module callback the scheduler runs goes through [`guard_stage`].
//! This is the only place an `Err` is stopped from propagating out of the
//! per-frame loop; everywhere else failures surface through `Result`.

use crate::registry::ModuleRecord;
use kairos_core::config::RecoveryConfig;
use kairos_core::event::{EngineEvent, EventHub};
use kairos_core::module::{Lifecycle, Module};

/// A leaky-bucket failure counter shared by all modules.
///
/// Each caught failure charges one unit; each clean `Running` frame decays
/// the level by the configured amount. The budget is breached once the
/// level *exceeds* the ceiling, so a ceiling of 10 tolerates exactly 10
/// consecutive failing frames before the eleventh triggers recovery.
#[derive(Debug)]
pub struct ErrorBudget {
    level: f64,
    ceiling: u32,
    decay: f64,
}

impl ErrorBudget {
    /// Creates a budget from the recovery configuration.
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            level: 0.0,
            ceiling: config.error_ceiling,
            decay: config.budget_decay,
        }
    }

    /// Charges one caught failure.
    pub fn charge(&mut self) {
        self.level += 1.0;
    }

    /// Applies one clean frame's worth of decay.
    pub fn decay(&mut self) {
        self.level = (self.level - self.decay).max(0.0);
    }

    /// Drains the budget back to zero.
    pub fn reset(&mut self) {
        self.level = 0.0;
    }

    /// The current accumulated level.
    pub fn level(&self) -> f64 {
        self.level
    }

    /// Whether the accumulated level has crossed the ceiling.
    pub fn is_breached(&self) -> bool {
        self.level > f64::from(self.ceiling)
    }
}

/// Runs one lifecycle callback under isolation.
///
/// On `Err`: the failure is charged to the module and the process budget,
/// `engine:module-error` is published, and under `disable_on_error` the
/// module is disabled. The caller checks the budget afterwards; breach
/// handling (pause plus recovery plan) belongs to the scheduler.
///
/// ## Returns
/// `true` if the callback succeeded.
pub(crate) fn guard_stage<F>(
    record: &mut ModuleRecord,
    stage: Lifecycle,
    hub: &EventHub,
    budget: &mut ErrorBudget,
    disable_on_error: bool,
    run: F,
) -> bool
where
    F: FnOnce(&mut dyn Module) -> anyhow::Result<()>,
{
    match run(record.module.as_mut()) {
        Ok(()) => true,
        Err(error) => {
            record.failures += 1;
            budget.charge();
            let rendered = format!("{error:#}");
            log::error!(
                "Module '{}' failed during {stage}: {rendered} (failure #{}, budget {:.1}).",
                record.name,
                record.failures,
                budget.level()
            );
            if disable_on_error {
                record.enabled = false;
            }
            hub.emit(EngineEvent::ModuleError {
                name: record.name.clone(),
                stage,
                error: rendered,
            });
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kairos_core::event::Topic;
    use kairos_core::module::CapabilitySet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct Unreliable;

    impl Module for Unreliable {
        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::empty().with(Lifecycle::Update)
        }

        fn update(&mut self, _delta: Duration, _interpolation: f32) -> anyhow::Result<()> {
            anyhow::bail!("simulation diverged")
        }
    }

    fn record() -> ModuleRecord {
        let mut registry = crate::registry::ModuleRegistry::new();
        registry.register("physics", Box::new(Unreliable), 0).unwrap();
        registry.remove("physics").unwrap()
    }

    fn budget(ceiling: u32, decay: f64) -> ErrorBudget {
        ErrorBudget::new(&RecoveryConfig {
            error_ceiling: ceiling,
            budget_decay: decay,
            ..RecoveryConfig::default()
        })
    }

    #[test]
    fn ceiling_is_breached_on_the_following_charge() {
        let mut budget = budget(3, 0.1);
        for _ in 0..3 {
            budget.charge();
        }
        assert!(!budget.is_breached());

        budget.charge();
        assert!(budget.is_breached());
    }

    #[test]
    fn decay_drains_toward_zero() {
        let mut budget = budget(10, 0.5);
        budget.charge();
        budget.decay();
        assert_relative_eq!(budget.level(), 0.5);

        budget.decay();
        budget.decay();
        assert_relative_eq!(budget.level(), 0.0);
    }

    #[test]
    fn reset_clears_the_level() {
        let mut budget = budget(10, 0.1);
        for _ in 0..20 {
            budget.charge();
        }
        assert!(budget.is_breached());

        budget.reset();
        assert!(!budget.is_breached());
        assert_relative_eq!(budget.level(), 0.0);
    }

    #[test]
    fn guard_charges_disables_and_publishes_on_failure() {
        let hub = EventHub::new();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let clone = Arc::clone(&errors);
        hub.on(Topic::ModuleError, move |event| {
            if let EngineEvent::ModuleError { name, stage, error } = event {
                clone.lock().unwrap().push((name.clone(), *stage, error.clone()));
            }
            Ok(())
        });

        let mut record = record();
        let mut budget = budget(10, 0.1);
        let clean = guard_stage(
            &mut record,
            Lifecycle::Update,
            &hub,
            &mut budget,
            true,
            |module| module.update(Duration::from_millis(16), 0.0),
        );

        assert!(!clean);
        assert!(!record.is_enabled());
        assert_eq!(record.failures(), 1);
        assert_relative_eq!(budget.level(), 1.0);

        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "physics");
        assert_eq!(errors[0].1, Lifecycle::Update);
        assert!(errors[0].2.contains("simulation diverged"));
    }

    #[test]
    fn guard_keeps_the_module_enabled_when_policy_says_so() {
        let hub = EventHub::new();
        let mut record = record();
        let mut budget = budget(10, 0.1);

        let clean = guard_stage(
            &mut record,
            Lifecycle::Update,
            &hub,
            &mut budget,
            false,
            |module| module.update(Duration::from_millis(16), 0.0),
        );

        assert!(!clean);
        assert!(record.is_enabled());
        assert_eq!(record.failures(), 1);
    }

    #[test]
    fn guard_is_silent_on_success() {
        let hub = EventHub::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let clone = Arc::clone(&fired);
        hub.on(Topic::ModuleError, move |_| {
            clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let mut record = record();
        let mut budget = budget(10, 0.1);
        let clean = guard_stage(
            &mut record,
            Lifecycle::Destroy,
            &hub,
            &mut budget,
            true,
            |module| module.destroy(),
        );

        assert!(clean);
        assert!(record.is_enabled());
        assert_eq!(record.failures(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_relative_eq!(budget.level(), 0.0);
    }
}
