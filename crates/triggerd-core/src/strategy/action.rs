use serde::{Deserialize, Serialize};

use crate::context::{ActuatorCall, ExecutionContext, HttpMethod};
use crate::error::{ActionError, LoadError};
use crate::store::FaultRecord;
use crate::topics;

use super::template::{Template, TemplateVars};
use super::{Binding, Observation};

fn default_display_path() -> String {
    "/lcd/text".to_string()
}

fn default_display_template() -> Template {
    Template::new("{value}")
}

/// Named, parameterised effects run when a trigger's condition holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Publish `{"alert": <alert>}` on the sensor's alert channel, or on
    /// `topic` when given.
    PublishAlert {
        alert: Template,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic: Option<Template>,
    },
    /// Publish a rendered payload on a rendered topic.
    Publish { topic: Template, payload: Template },
    /// Publish `{"action": <command>}` on the actuator's control channel.
    SwitchActuator { command: String },
    /// HTTP call to the actuator's configured endpoint.
    CallActuator {
        #[serde(default)]
        method: HttpMethod,
        path: Template,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<Template>,
    },
    /// POST the rendered text to a display endpoint as `lcdtext`.
    DisplayValue {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        actuator_id: Option<String>,
        #[serde(default = "default_display_path")]
        path: String,
        #[serde(default = "default_display_template")]
        template: Template,
    },
    /// Persist a fault record and announce it on the device error channel.
    RecordFault { fault_type: String, message: Template },
    Log { message: Template },
    /// Run steps in order; the first failure stops the rest.
    Sequence { steps: Vec<Action> },
}

impl Action {
    pub fn validate(&self, binding: &Binding<'_>) -> Result<(), LoadError> {
        match self {
            Self::PublishAlert { alert, topic } => {
                alert.validate()?;
                if let Some(t) = topic {
                    t.validate()?;
                }
            }
            Self::Publish { topic, payload } => {
                topic.validate()?;
                payload.validate()?;
                if topic.as_str().trim().is_empty() {
                    return Err(LoadError::Action("publish topic is empty".into()));
                }
            }
            Self::SwitchActuator { command } => {
                if command.trim().is_empty() {
                    return Err(LoadError::Action("switch_actuator command is empty".into()));
                }
                require_actuator(binding)?;
            }
            Self::CallActuator { path, body, .. } => {
                path.validate()?;
                if let Some(b) = body {
                    b.validate()?;
                }
                require_actuator(binding)?;
            }
            Self::DisplayValue {
                actuator_id,
                template,
                ..
            } => {
                template.validate()?;
                if actuator_id.is_none() {
                    require_actuator(binding)?;
                }
            }
            Self::RecordFault {
                fault_type,
                message,
            } => {
                if fault_type.trim().is_empty() {
                    return Err(LoadError::Action("record_fault fault_type is empty".into()));
                }
                message.validate()?;
            }
            Self::Log { message } => message.validate()?,
            Self::Sequence { steps } => {
                for step in steps {
                    step.validate(binding)?;
                }
            }
        }
        Ok(())
    }

    pub fn execute(
        &self,
        ctx: &ExecutionContext<'_>,
        binding: &Binding<'_>,
        obs: &Observation<'_>,
    ) -> Result<(), ActionError> {
        let vars = TemplateVars {
            value: obs.value.to_string(),
            previous: obs.previous.map(ToString::to_string),
            sensor_id: obs.sensor_id.to_string(),
            trigger: binding.trigger_id.to_string(),
            actuator_id: binding.actuator_id.map(str::to_string),
            validator_id: binding.validator_id.map(str::to_string),
        };

        match self {
            Self::PublishAlert { alert, topic } => {
                let topic = match topic {
                    Some(t) => t.render(&vars),
                    None => topics::alert_topic(obs.sensor_id),
                };
                let payload = serde_json::json!({ "alert": alert.render(&vars) });
                ctx.publish(&topic, payload.to_string())
            }
            Self::Publish { topic, payload } => {
                ctx.publish(&topic.render(&vars), payload.render(&vars))
            }
            Self::SwitchActuator { command } => {
                let actuator = actuator_of(binding, None)?;
                let payload = serde_json::json!({ "action": command });
                ctx.publish(&topics::control_topic(actuator), payload.to_string())
            }
            Self::CallActuator { method, path, body } => ctx.call(ActuatorCall {
                actuator_id: actuator_of(binding, None)?.to_string(),
                method: *method,
                path: path.render(&vars),
                query: Vec::new(),
                body: body.as_ref().map(|b| b.render(&vars)),
            }),
            Self::DisplayValue {
                actuator_id,
                path,
                template,
            } => ctx.call(ActuatorCall {
                actuator_id: actuator_of(binding, actuator_id.as_deref())?.to_string(),
                method: HttpMethod::Post,
                path: path.clone(),
                query: vec![("lcdtext".to_string(), template.render(&vars))],
                body: None,
            }),
            Self::RecordFault {
                fault_type,
                message,
            } => {
                let fault = FaultRecord::new(fault_type.clone(), message.render(&vars))
                    .with_trigger(binding.trigger_id, obs.sensor_id);
                let device = binding.actuator_id.unwrap_or(obs.sensor_id);
                let payload = serde_json::json!({
                    "type": fault.fault_type,
                    "message": fault.message,
                });
                ctx.record_fault(fault)?;
                ctx.publish(&topics::error_topic(device), payload.to_string())
            }
            Self::Log { message } => {
                tracing::info!(
                    trigger_id = binding.trigger_id,
                    sensor_id = obs.sensor_id,
                    "{}",
                    message.render(&vars)
                );
                Ok(())
            }
            Self::Sequence { steps } => {
                for step in steps {
                    step.execute(ctx, binding, obs)?;
                }
                Ok(())
            }
        }
    }
}

fn require_actuator(binding: &Binding<'_>) -> Result<(), LoadError> {
    if binding.actuator_id.is_none() {
        return Err(LoadError::MissingField("actuator_id"));
    }
    Ok(())
}

fn actuator_of<'a>(
    binding: &Binding<'a>,
    explicit: Option<&'a str>,
) -> Result<&'a str, ActionError> {
    explicit
        .or(binding.actuator_id)
        .ok_or_else(|| ActionError::UnknownActuator(String::new()))
}
