//! The closed library of condition and action strategies.
//!
//! Trigger records name a strategy with a `type` tag plus parameters, e.g.
//! `{"type": "greater_than", "threshold": 27}`. Anything outside this
//! catalog fails to deserialize and the trigger is rejected at load time.

pub mod action;
pub mod condition;
pub mod template;

pub use action::Action;
pub use condition::Condition;
pub use template::{Template, TemplateVars};

use crate::value::SensorValue;

/// The trigger-side references a strategy may need.
#[derive(Debug, Clone, Copy)]
pub struct Binding<'a> {
    pub trigger_id: &'a str,
    pub sensor_id: &'a str,
    pub actuator_id: Option<&'a str>,
    pub validator_id: Option<&'a str>,
}

/// The value being judged, with the value in effect before it.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub sensor_id: &'a str,
    pub value: &'a SensorValue,
    pub previous: Option<&'a SensorValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Capture, Effect};
    use crate::context::ExecutionContext;
    use crate::error::ConditionError;
    use crate::state::SensorStateStore;
    use crate::value::Reading;

    fn binding() -> Binding<'static> {
        Binding {
            trigger_id: "t1",
            sensor_id: "temperature",
            actuator_id: Some("fan"),
            validator_id: Some("sound"),
        }
    }

    fn condition(json: serde_json::Value) -> Condition {
        serde_json::from_value(json).unwrap()
    }

    fn action(json: serde_json::Value) -> Action {
        serde_json::from_value(json).unwrap()
    }

    /// Evaluate `cond` for `value` with `previous`, against a store where
    /// `others` have already reported.
    fn check(
        cond: &Condition,
        value: SensorValue,
        previous: Option<SensorValue>,
        others: &[(&str, SensorValue)],
    ) -> Result<bool, ConditionError> {
        let state = SensorStateStore::new();
        for (id, v) in others {
            state.update(id, v.clone());
            state.commit(id);
        }
        state.update("temperature", value.clone());
        let capture = Capture::new();
        let caps = capture.capabilities();
        let reading = Reading::new("temperature", value.clone());
        let ctx = ExecutionContext::new(&state, &caps, &reading, previous.as_ref());
        let obs = Observation {
            sensor_id: "temperature",
            value: &value,
            previous: previous.as_ref(),
        };
        cond.evaluate(&ctx, &binding(), &obs)
    }

    #[test]
    fn threshold_comparisons() {
        let gt = condition(serde_json::json!({"type": "greater_than", "threshold": 27}));
        assert!(check(&gt, 28.0.into(), None, &[]).unwrap());
        assert!(!check(&gt, 27.0.into(), None, &[]).unwrap());

        let at_most = condition(serde_json::json!({"type": "at_most", "threshold": 27}));
        assert!(check(&at_most, 27.0.into(), None, &[]).unwrap());

        let between = condition(serde_json::json!({"type": "between", "low": 20, "high": 27}));
        assert!(check(&between, 20.0.into(), None, &[]).unwrap());
        assert!(check(&between, 27.0.into(), None, &[]).unwrap());
        assert!(!check(&between, 19.0.into(), None, &[]).unwrap());
    }

    #[test]
    fn numeric_condition_on_text_is_an_error() {
        let lt = condition(serde_json::json!({"type": "less_than", "threshold": 20}));
        let err = check(&lt, "abcde".into(), None, &[]).unwrap_err();
        assert_eq!(err, ConditionError::NotNumeric("abcde".into()));
    }

    #[test]
    fn changed_compares_with_previous() {
        let changed = condition(serde_json::json!({"type": "changed"}));
        assert!(check(&changed, 28.0.into(), None, &[]).unwrap());
        assert!(!check(&changed, 28.0.into(), Some(28.0.into()), &[]).unwrap());
        assert!(check(&changed, "on".into(), Some("off".into()), &[]).unwrap());
    }

    #[test]
    fn crossings_need_history() {
        let up = condition(serde_json::json!({"type": "crossed_above", "threshold": 27}));
        assert!(!check(&up, 30.0.into(), None, &[]).unwrap());
        assert!(check(&up, 30.0.into(), Some(25.0.into()), &[]).unwrap());
        assert!(!check(&up, 30.0.into(), Some(29.0.into()), &[]).unwrap());

        let down = condition(serde_json::json!({"type": "crossed_below", "threshold": 20}));
        assert!(check(&down, 19.0.into(), Some(21.0.into()), &[]).unwrap());
    }

    #[test]
    fn validator_condition_reads_other_sensor() {
        let heating_error = condition(serde_json::json!({
            "type": "all",
            "conditions": [
                {"type": "greater_than", "threshold": 27},
                {"type": "on_validator", "condition": {"type": "less_than", "threshold": 40}}
            ]
        }));
        let quiet = [("sound", SensorValue::Number(12.0))];
        let loud = [("sound", SensorValue::Number(55.0))];
        assert!(check(&heating_error, 30.0.into(), None, &quiet).unwrap());
        assert!(!check(&heating_error, 30.0.into(), None, &loud).unwrap());

        let err = check(&heating_error, 30.0.into(), None, &[]).unwrap_err();
        assert_eq!(err, ConditionError::MissingSensor("sound".into()));
    }

    #[test]
    fn any_and_not() {
        let outside = condition(serde_json::json!({
            "type": "not",
            "condition": {
                "type": "any",
                "conditions": [
                    {"type": "equals", "value": "on"},
                    {"type": "equals", "value": "standby"}
                ]
            }
        }));
        assert!(!check(&outside, "on".into(), None, &[]).unwrap());
        assert!(check(&outside, "off".into(), None, &[]).unwrap());
    }

    #[test]
    fn unknown_strategy_names_do_not_deserialize() {
        let cond: Result<Condition, _> =
            serde_json::from_value(serde_json::json!({"type": "heating_error_condition"}));
        assert!(cond.is_err());
        let act: Result<Action, _> =
            serde_json::from_value(serde_json::json!({"type": "temperature_too_hot"}));
        assert!(act.is_err());
    }

    #[test]
    fn validation_rejects_bad_parameters() {
        let b = binding();
        let inverted = condition(serde_json::json!({"type": "between", "low": 30, "high": 20}));
        assert!(inverted.validate(&b).is_err());

        let no_validator = Binding {
            validator_id: None,
            ..b
        };
        let on_validator = condition(serde_json::json!({
            "type": "on_validator",
            "condition": {"type": "always"}
        }));
        assert!(on_validator.validate(&no_validator).is_err());

        let bad_template = action(serde_json::json!({"type": "log", "message": "{nope}"}));
        assert!(bad_template.validate(&b).is_err());

        let no_actuator = Binding {
            actuator_id: None,
            ..b
        };
        let switch = action(serde_json::json!({"type": "switch_actuator", "command": "on"}));
        assert!(switch.validate(&no_actuator).is_err());
    }

    fn run(act: &Action, value: SensorValue) -> (Result<(), crate::ActionError>, Vec<Effect>) {
        let state = SensorStateStore::new();
        state.update("temperature", value.clone());
        let capture = Capture::new();
        let caps = capture.capabilities();
        let reading = Reading::new("temperature", value.clone());
        let ctx = ExecutionContext::new(&state, &caps, &reading, None);
        let obs = Observation {
            sensor_id: "temperature",
            value: &value,
            previous: None,
        };
        let result = act.execute(&ctx, &binding(), &obs);
        (result, capture.effects())
    }

    #[test]
    fn publish_alert_uses_sensor_alert_channel() {
        let act = action(serde_json::json!({"type": "publish_alert", "alert": "Hot"}));
        let (result, effects) = run(&act, 28.0.into());
        result.unwrap();
        assert_eq!(
            effects,
            vec![Effect::Publish {
                topic: "sensors/temperature/alerts".into(),
                payload: r#"{"alert":"Hot"}"#.into(),
            }]
        );
    }

    #[test]
    fn switch_actuator_publishes_control_message() {
        let act = action(serde_json::json!({"type": "switch_actuator", "command": "on"}));
        let (result, effects) = run(&act, 28.0.into());
        result.unwrap();
        assert_eq!(
            effects,
            vec![Effect::Publish {
                topic: "actuators/fan/control".into(),
                payload: r#"{"action":"on"}"#.into(),
            }]
        );
    }

    #[test]
    fn display_value_renders_lcd_text() {
        let act = action(serde_json::json!({
            "type": "display_value",
            "actuator_id": "lcd",
            "template": "{value} Celsius"
        }));
        let (result, effects) = run(&act, 40.0.into());
        result.unwrap();
        let Effect::Call(call) = &effects[0] else {
            panic!("expected a call, got {effects:?}")
        };
        assert_eq!(call.actuator_id, "lcd");
        assert_eq!(call.path, "/lcd/text");
        assert_eq!(
            call.query,
            vec![("lcdtext".to_string(), "40 Celsius".to_string())]
        );
    }

    #[test]
    fn record_fault_persists_and_announces() {
        let act = action(serde_json::json!({
            "type": "record_fault",
            "fault_type": "heating_error",
            "message": "{sensor_id} at {value} but fan is silent"
        }));
        let (result, effects) = run(&act, 31.0.into());
        result.unwrap();
        assert_eq!(effects.len(), 2);
        let Effect::Fault(fault) = &effects[0] else {
            panic!("expected a fault first, got {effects:?}")
        };
        assert_eq!(fault.fault_type, "heating_error");
        assert_eq!(fault.message, "temperature at 31 but fan is silent");
        assert_eq!(fault.trigger_id.as_deref(), Some("t1"));
        assert!(matches!(&effects[1], Effect::Publish { topic, .. } if topic == "other/fan/errors"));
    }

    #[test]
    fn sequence_stops_at_first_failure() {
        let act = action(serde_json::json!({
            "type": "sequence",
            "steps": [
                {"type": "publish_alert", "alert": "first"},
                {"type": "call_actuator", "path": "/on"},
                {"type": "publish_alert", "alert": "never"}
            ]
        }));
        let state = SensorStateStore::new();
        let value = SensorValue::Number(1.0);
        let capture = Capture::new().without_actuators();
        let caps = capture.capabilities();
        let reading = Reading::new("temperature", value.clone());
        let ctx = ExecutionContext::new(&state, &caps, &reading, None);
        let obs = Observation {
            sensor_id: "temperature",
            value: &value,
            previous: None,
        };
        let err = act.execute(&ctx, &binding(), &obs).unwrap_err();
        assert_eq!(err, crate::ActionError::UnknownActuator("fan".into()));
        assert_eq!(capture.effects().len(), 1);
    }
}
