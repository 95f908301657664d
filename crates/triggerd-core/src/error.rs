use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerdError {
    #[error("not initialized: run 'triggerd init'")]
    NotInitialized,

    #[error("malformed reading: {0}")]
    Parse(String),

    #[error("trigger '{id}' rejected: {source}")]
    Load {
        id: String,
        #[source]
        source: LoadError,
    },

    #[error("trigger already registered: {0}")]
    DuplicateTrigger(String),

    #[error("trigger not found: {0}")]
    TriggerNotFound(String),

    #[error("sensor not seen: {0}")]
    SensorNotFound(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no endpoint configured for actuator '{0}'")]
    UnknownActuator(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("ingress paused: {0}")]
    IngressPaused(String),

    #[error("dispatcher is shutting down")]
    ShuttingDown,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TriggerdError>;

// ---------------------------------------------------------------------------
// Trigger-scoped errors
// ---------------------------------------------------------------------------

/// Why a trigger definition could not be compiled into the registry.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LoadError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid sensor id '{0}'")]
    InvalidSensorId(String),

    #[error("unknown or malformed condition: {0}")]
    Condition(String),

    #[error("unknown or malformed action: {0}")]
    Action(String),

    #[error("invalid template '{template}': unknown placeholder '{{{placeholder}}}'")]
    Template {
        template: String,
        placeholder: String,
    },

    #[error("duplicate trigger id")]
    Duplicate,
}

/// Failure while evaluating a condition. The engine treats it as `false`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConditionError {
    #[error("value '{0}' is not numeric")]
    NotNumeric(String),

    #[error("no value recorded for sensor '{0}'")]
    MissingSensor(String),

    #[error("trigger has no validator sensor")]
    NoValidator,

    #[error("condition panicked: {0}")]
    Panicked(String),
}

/// Failure while executing an action. Logged; never rolls back state.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ActionError {
    #[error("publish to '{topic}' failed: {reason}")]
    Publish { topic: String, reason: String },

    #[error("no endpoint configured for actuator '{0}'")]
    UnknownActuator(String),

    #[error("call to actuator '{actuator_id}' failed: {reason}")]
    Call { actuator_id: String, reason: String },

    #[error("fault could not be recorded: {0}")]
    Fault(String),

    #[error("action panicked: {0}")]
    Panicked(String),
}
