use serde::{Deserialize, Deserializer, Serialize};

use crate::error::LoadError;
use crate::strategy::{Action, Binding, Condition};
use crate::value::is_valid_sensor_id;

// ---------------------------------------------------------------------------
// TriggerRecord — stored form
// ---------------------------------------------------------------------------

/// A trigger as persisted and exchanged on the wire. Strategy objects stay raw
/// JSON so one undecodable record never blocks listing the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub sensor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actuator_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator_id: Option<String>,
    #[serde(default)]
    pub condition: serde_json::Value,
    #[serde(default)]
    pub action: serde_json::Value,
    #[serde(default = "default_active", deserialize_with = "bool_or_string")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

fn bool_or_string<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }
    match Flag::deserialize(de)? {
        Flag::Bool(b) => Ok(b),
        Flag::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "active must be true or false, got '{other}'"
            ))),
        },
    }
}

impl TriggerRecord {
    pub fn new(
        id: impl Into<String>,
        sensor_id: impl Into<String>,
        condition: serde_json::Value,
        action: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: None,
            sensor_id: sensor_id.into(),
            actuator_id: None,
            validator_id: None,
            condition,
            action,
            active: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_actuator(mut self, actuator_id: impl Into<String>) -> Self {
        self.actuator_id = Some(actuator_id.into());
        self
    }

    pub fn with_validator(mut self, validator_id: impl Into<String>) -> Self {
        self.validator_id = Some(validator_id.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Resolve the strategy objects against the catalog and check every
    /// reference the trigger makes.
    pub fn compile(&self) -> Result<Trigger, LoadError> {
        if self.id.trim().is_empty() {
            return Err(LoadError::MissingField("id"));
        }
        if self.sensor_id.is_empty() {
            return Err(LoadError::MissingField("sensor_id"));
        }
        if !is_valid_sensor_id(&self.sensor_id) {
            return Err(LoadError::InvalidSensorId(self.sensor_id.clone()));
        }
        for id in [&self.actuator_id, &self.validator_id].into_iter().flatten() {
            if !is_valid_sensor_id(id) {
                return Err(LoadError::InvalidSensorId(id.clone()));
            }
        }
        if self.condition.is_null() {
            return Err(LoadError::MissingField("condition"));
        }
        if self.action.is_null() {
            return Err(LoadError::MissingField("action"));
        }

        let condition: Condition = serde_json::from_value(self.condition.clone())
            .map_err(|e| LoadError::Condition(e.to_string()))?;
        let action: Action = serde_json::from_value(self.action.clone())
            .map_err(|e| LoadError::Action(e.to_string()))?;

        let trigger = Trigger {
            id: self.id.clone(),
            name: self.name.clone().unwrap_or_else(|| self.id.clone()),
            sensor_id: self.sensor_id.clone(),
            actuator_id: self.actuator_id.clone(),
            validator_id: self.validator_id.clone(),
            condition,
            action,
            active: self.active,
        };
        let binding = trigger.binding();
        trigger.condition.validate(&binding)?;
        trigger.action.validate(&binding)?;
        Ok(trigger)
    }
}

// ---------------------------------------------------------------------------
// Trigger — compiled form
// ---------------------------------------------------------------------------

/// A loaded trigger. Immutable once in the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trigger {
    pub id: String,
    pub name: String,
    pub sensor_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actuator_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator_id: Option<String>,
    pub condition: Condition,
    pub action: Action,
    pub active: bool,
}

impl Trigger {
    pub fn binding(&self) -> Binding<'_> {
        Binding {
            trigger_id: &self.id,
            sensor_id: &self.sensor_id,
            actuator_id: self.actuator_id.as_deref(),
            validator_id: self.validator_id.as_deref(),
        }
    }

    pub fn to_record(&self) -> TriggerRecord {
        TriggerRecord {
            id: self.id.clone(),
            name: (self.name != self.id).then(|| self.name.clone()),
            sensor_id: self.sensor_id.clone(),
            actuator_id: self.actuator_id.clone(),
            validator_id: self.validator_id.clone(),
            condition: serde_json::to_value(&self.condition).unwrap_or_default(),
            action: serde_json::to_value(&self.action).unwrap_or_default(),
            active: self.active,
        }
    }
}
