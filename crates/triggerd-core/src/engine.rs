//! Per-reading evaluation pipeline.
//!
//! For one reading: stage the new value, fetch the matching triggers, run
//! each condition and, when it holds, its action, then commit the previous
//! value. Every condition and action runs isolated: an error or a panic is
//! logged against its trigger and the loop moves on.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::context::{Capabilities, ExecutionContext};
use crate::error::{ActionError, ConditionError, Result};
use crate::registry::RuleRegistry;
use crate::state::SensorStateStore;
use crate::strategy::Observation;
use crate::value::Reading;

/// What happened to one reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchReport {
    pub sensor_id: String,
    pub evaluated: usize,
    pub fired: Vec<String>,
    pub condition_errors: usize,
    pub action_errors: usize,
}

pub struct Engine {
    state: Arc<SensorStateStore>,
    registry: Arc<RuleRegistry>,
    caps: Capabilities,
    sensor_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Engine {
    pub fn new(
        state: Arc<SensorStateStore>,
        registry: Arc<RuleRegistry>,
        caps: Capabilities,
    ) -> Self {
        Self {
            state,
            registry,
            caps,
            sensor_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn state(&self) -> &Arc<SensorStateStore> {
        &self.state
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// Parse a raw telemetry payload and dispatch it. A malformed payload is
    /// logged and rejected without touching sensor state.
    pub fn dispatch_raw(&self, payload: &[u8]) -> Result<DispatchReport> {
        match Reading::parse(payload) {
            Ok(reading) => Ok(self.dispatch(&reading)),
            Err(e) => {
                tracing::warn!(error = %e, "discarding malformed reading");
                Err(e)
            }
        }
    }

    pub fn dispatch(&self, reading: &Reading) -> DispatchReport {
        let sensor_id = reading.sensor_id.as_str();
        let lock = self.sensor_lock(sensor_id);
        let _guard = match lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let previous = self.state.update(sensor_id, reading.value.clone());
        let candidates = self.registry.matching(sensor_id);
        let ctx = ExecutionContext::new(&self.state, &self.caps, reading, previous.as_ref());
        let obs = Observation {
            sensor_id,
            value: &reading.value,
            previous: previous.as_ref(),
        };

        let mut report = DispatchReport {
            sensor_id: sensor_id.to_string(),
            evaluated: candidates.len(),
            ..Default::default()
        };

        for trigger in &candidates {
            let binding = trigger.binding();

            let held = catch_unwind(AssertUnwindSafe(|| {
                trigger.condition.evaluate(&ctx, &binding, &obs)
            }))
            .unwrap_or_else(|p| Err(ConditionError::Panicked(panic_message(p))));

            match held {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    report.condition_errors += 1;
                    tracing::warn!(
                        trigger_id = %trigger.id,
                        sensor_id,
                        value = %reading.value,
                        error = %e,
                        "condition failed; treating as false"
                    );
                    continue;
                }
            }

            tracing::debug!(trigger_id = %trigger.id, sensor_id, "trigger fired");
            report.fired.push(trigger.id.clone());

            let ran = catch_unwind(AssertUnwindSafe(|| {
                trigger.action.execute(&ctx, &binding, &obs)
            }))
            .unwrap_or_else(|p| Err(ActionError::Panicked(panic_message(p))));

            if let Err(e) = ran {
                report.action_errors += 1;
                tracing::error!(
                    trigger_id = %trigger.id,
                    sensor_id,
                    value = %reading.value,
                    error = %e,
                    "action failed"
                );
            }
        }

        self.state.commit(sensor_id);
        report
    }

    fn sensor_lock(&self, sensor_id: &str) -> Arc<Mutex<()>> {
        let mut locks = match self.sensor_locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks
            .entry(sensor_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
