//! Capabilities that record effects instead of performing them.
//!
//! Used by `triggerd replay` to show what a stream of readings would do, and
//! by tests throughout the workspace.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::context::{ActuatorCall, ActuatorGateway, Capabilities, FaultSink, Publisher};
use crate::error::{Result, TriggerdError};
use crate::store::FaultRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    Publish { topic: String, payload: String },
    Call(ActuatorCall),
    Fault(FaultRecord),
}

struct Recorder {
    effects: Mutex<Vec<Effect>>,
    actuators: bool,
}

impl Recorder {
    fn push(&self, effect: Effect) {
        self.lock().push(effect);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Effect>> {
        match self.effects.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Publisher for Recorder {
    fn publish(&self, topic: &str, payload: String) -> Result<()> {
        self.push(Effect::Publish {
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }
}

impl ActuatorGateway for Recorder {
    fn call(&self, call: ActuatorCall) -> Result<()> {
        if !self.actuators {
            return Err(TriggerdError::UnknownActuator(call.actuator_id));
        }
        self.push(Effect::Call(call));
        Ok(())
    }
}

impl FaultSink for Recorder {
    fn record(&self, fault: FaultRecord) -> Result<()> {
        self.push(Effect::Fault(fault));
        Ok(())
    }
}

#[derive(Clone)]
pub struct Capture {
    recorder: Arc<Recorder>,
}

impl Default for Capture {
    fn default() -> Self {
        Self::new()
    }
}

impl Capture {
    pub fn new() -> Self {
        Self {
            recorder: Arc::new(Recorder {
                effects: Mutex::new(Vec::new()),
                actuators: true,
            }),
        }
    }

    /// Reject every actuator call as unknown.
    pub fn without_actuators(self) -> Self {
        Self {
            recorder: Arc::new(Recorder {
                effects: Mutex::new(Vec::new()),
                actuators: false,
            }),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::new(
            self.recorder.clone(),
            self.recorder.clone(),
            self.recorder.clone(),
        )
    }

    pub fn effects(&self) -> Vec<Effect> {
        self.recorder.lock().clone()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<Effect> {
        std::mem::take(&mut *self.recorder.lock())
    }
}
