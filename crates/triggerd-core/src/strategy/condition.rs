use serde::{Deserialize, Serialize};

use crate::context::ExecutionContext;
use crate::error::{ConditionError, LoadError};
use crate::value::{is_valid_sensor_id, SensorValue};

use super::{Binding, Observation};

/// Named, parameterised predicates over a sensor observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Fires on every reading.
    Always,
    GreaterThan { threshold: f64 },
    LessThan { threshold: f64 },
    AtLeast { threshold: f64 },
    AtMost { threshold: f64 },
    /// Inclusive on both ends.
    Between { low: f64, high: f64 },
    Outside { low: f64, high: f64 },
    /// Numeric comparison when both sides are numeric, exact text otherwise.
    Equals { value: SensorValue },
    /// True when the value differs from the previous one, or there is none.
    Changed,
    /// previous <= threshold < value. Needs a previous value.
    CrossedAbove { threshold: f64 },
    /// previous >= threshold > value. Needs a previous value.
    CrossedBelow { threshold: f64 },
    /// Evaluate `condition` against another sensor's current value.
    OnSensor {
        sensor_id: String,
        condition: Box<Condition>,
    },
    /// Evaluate `condition` against the trigger's validator sensor.
    OnValidator { condition: Box<Condition> },
    All { conditions: Vec<Condition> },
    Any { conditions: Vec<Condition> },
    Not { condition: Box<Condition> },
}

impl Condition {
    pub fn validate(&self, binding: &Binding<'_>) -> Result<(), LoadError> {
        let bad = |msg: String| Err::<(), _>(LoadError::Condition(msg));
        match self {
            Self::GreaterThan { threshold }
            | Self::LessThan { threshold }
            | Self::AtLeast { threshold }
            | Self::AtMost { threshold }
            | Self::CrossedAbove { threshold }
            | Self::CrossedBelow { threshold } => {
                if !threshold.is_finite() {
                    return bad(format!("threshold {threshold} is not finite"));
                }
            }
            Self::Between { low, high } | Self::Outside { low, high } => {
                if !(low.is_finite() && high.is_finite()) || low > high {
                    return bad(format!("invalid range [{low}, {high}]"));
                }
            }
            Self::OnSensor {
                sensor_id,
                condition,
            } => {
                if !is_valid_sensor_id(sensor_id) {
                    return Err(LoadError::InvalidSensorId(sensor_id.clone()));
                }
                condition.validate(binding)?;
            }
            Self::OnValidator { condition } => {
                if binding.validator_id.is_none() {
                    return Err(LoadError::MissingField("validator_id"));
                }
                condition.validate(binding)?;
            }
            Self::All { conditions } | Self::Any { conditions } => {
                for c in conditions {
                    c.validate(binding)?;
                }
            }
            Self::Not { condition } => condition.validate(binding)?,
            Self::Always | Self::Equals { .. } | Self::Changed => {}
        }
        Ok(())
    }

    pub fn evaluate(
        &self,
        ctx: &ExecutionContext<'_>,
        binding: &Binding<'_>,
        obs: &Observation<'_>,
    ) -> Result<bool, ConditionError> {
        let held = match self {
            Self::Always => true,
            Self::GreaterThan { threshold } => numeric(obs.value)? > *threshold,
            Self::LessThan { threshold } => numeric(obs.value)? < *threshold,
            Self::AtLeast { threshold } => numeric(obs.value)? >= *threshold,
            Self::AtMost { threshold } => numeric(obs.value)? <= *threshold,
            Self::Between { low, high } => {
                let v = numeric(obs.value)?;
                *low <= v && v <= *high
            }
            Self::Outside { low, high } => {
                let v = numeric(obs.value)?;
                v < *low || v > *high
            }
            Self::Equals { value } => same_value(obs.value, value),
            Self::Changed => match obs.previous {
                Some(prev) => !same_value(obs.value, prev),
                None => true,
            },
            Self::CrossedAbove { threshold } => match obs.previous {
                Some(prev) => numeric(prev)? <= *threshold && numeric(obs.value)? > *threshold,
                None => false,
            },
            Self::CrossedBelow { threshold } => match obs.previous {
                Some(prev) => numeric(prev)? >= *threshold && numeric(obs.value)? < *threshold,
                None => false,
            },
            Self::OnSensor {
                sensor_id,
                condition,
            } => evaluate_on(ctx, binding, sensor_id, condition)?,
            Self::OnValidator { condition } => {
                let validator = binding.validator_id.ok_or(ConditionError::NoValidator)?;
                evaluate_on(ctx, binding, validator, condition)?
            }
            Self::All { conditions } => {
                for c in conditions {
                    if !c.evaluate(ctx, binding, obs)? {
                        return Ok(false);
                    }
                }
                true
            }
            Self::Any { conditions } => {
                for c in conditions {
                    if c.evaluate(ctx, binding, obs)? {
                        return Ok(true);
                    }
                }
                false
            }
            Self::Not { condition } => !condition.evaluate(ctx, binding, obs)?,
        };
        Ok(held)
    }
}

fn evaluate_on(
    ctx: &ExecutionContext<'_>,
    binding: &Binding<'_>,
    sensor_id: &str,
    condition: &Condition,
) -> Result<bool, ConditionError> {
    let value = ctx
        .current(sensor_id)
        .ok_or_else(|| ConditionError::MissingSensor(sensor_id.to_string()))?;
    let previous = ctx.previous(sensor_id);
    let obs = Observation {
        sensor_id,
        value: &value,
        previous: previous.as_ref(),
    };
    condition.evaluate(ctx, binding, &obs)
}

fn numeric(value: &SensorValue) -> Result<f64, ConditionError> {
    value
        .as_f64()
        .ok_or_else(|| ConditionError::NotNumeric(value.to_string()))
}

fn same_value(a: &SensorValue, b: &SensorValue) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a.to_string() == b.to_string(),
    }
}
