//! The execution context handed to every condition and action.
//!
//! Strategies never see transport or HTTP handles directly; they go through
//! the three capability traits below, injected once at engine construction.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ActionError, Result};
use crate::state::SensorStateStore;
use crate::store::FaultRecord;
use crate::value::{Reading, SensorValue};

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Publish a payload on a transport channel.
pub trait Publisher: Send + Sync {
    fn publish(&self, topic: &str, payload: String) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// An outbound request addressed to an actuator by id; the gateway maps the
/// id to a concrete endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActuatorCall {
    pub actuator_id: String,
    pub method: HttpMethod,
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Submit an actuator call. Implementations resolve the endpoint
/// synchronously and run the request detached; `Ok` means "submitted".
pub trait ActuatorGateway: Send + Sync {
    fn call(&self, call: ActuatorCall) -> Result<()>;
}

/// Persist a fault raised by an action.
pub trait FaultSink: Send + Sync {
    fn record(&self, fault: FaultRecord) -> Result<()>;
}

#[derive(Clone)]
pub struct Capabilities {
    pub publisher: Arc<dyn Publisher>,
    pub actuators: Arc<dyn ActuatorGateway>,
    pub faults: Arc<dyn FaultSink>,
}

impl Capabilities {
    pub fn new(
        publisher: Arc<dyn Publisher>,
        actuators: Arc<dyn ActuatorGateway>,
        faults: Arc<dyn FaultSink>,
    ) -> Self {
        Self {
            publisher,
            actuators,
            faults,
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutionContext
// ---------------------------------------------------------------------------

/// Shared by every trigger evaluated for one reading. Holds no per-rule state.
pub struct ExecutionContext<'a> {
    state: &'a SensorStateStore,
    caps: &'a Capabilities,
    reading: &'a Reading,
    previous: Option<&'a SensorValue>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        state: &'a SensorStateStore,
        caps: &'a Capabilities,
        reading: &'a Reading,
        previous: Option<&'a SensorValue>,
    ) -> Self {
        Self {
            state,
            caps,
            reading,
            previous,
        }
    }

    pub fn reading(&self) -> &Reading {
        self.reading
    }

    pub fn current(&self, sensor_id: &str) -> Option<SensorValue> {
        self.state.current(sensor_id)
    }

    /// Previous value of `sensor_id`. For the sensor being dispatched this is
    /// the value before the current reading, even though it is not yet
    /// committed to the store.
    pub fn previous(&self, sensor_id: &str) -> Option<SensorValue> {
        if sensor_id == self.reading.sensor_id {
            self.previous.cloned()
        } else {
            self.state.previous(sensor_id)
        }
    }

    pub fn publish(&self, topic: &str, payload: String) -> std::result::Result<(), ActionError> {
        self.caps
            .publisher
            .publish(topic, payload)
            .map_err(|e| ActionError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn call(&self, call: ActuatorCall) -> std::result::Result<(), ActionError> {
        let actuator_id = call.actuator_id.clone();
        self.caps.actuators.call(call).map_err(|e| match e {
            crate::TriggerdError::UnknownActuator(_) => ActionError::UnknownActuator(actuator_id),
            other => ActionError::Call {
                actuator_id,
                reason: other.to_string(),
            },
        })
    }

    pub fn record_fault(&self, fault: FaultRecord) -> std::result::Result<(), ActionError> {
        self.caps
            .faults
            .record(fault)
            .map_err(|e| ActionError::Fault(e.to_string()))
    }
}
