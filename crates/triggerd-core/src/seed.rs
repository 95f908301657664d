//! The default climate-control trigger catalog.
//!
//! A temperature sensor drives a fan; the sound sensor next to the fan is
//! the validator that tells whether the fan is actually running. An LCD
//! shows the current temperature.

use serde_json::json;

use crate::config::Thresholds;
use crate::trigger::TriggerRecord;

pub const FAN: &str = "fan";
pub const LCD: &str = "lcd";
pub const TEMPERATURE: &str = "temperature";
pub const SOUND: &str = "sound";
pub const LIGHT: &str = "light";

pub fn default_triggers(t: &Thresholds) -> Vec<TriggerRecord> {
    vec![
        TriggerRecord::new(
            "temperature_too_hot",
            TEMPERATURE,
            json!({"type": "greater_than", "threshold": t.temp_high}),
            json!({"type": "sequence", "steps": [
                {"type": "publish_alert", "alert": "Temperature too hot: {value}"},
                {"type": "switch_actuator", "command": "on"}
            ]}),
        )
        .with_name("Temperature too hot")
        .with_actuator(FAN)
        .with_validator(SOUND),
        TriggerRecord::new(
            "temperature_too_cold",
            TEMPERATURE,
            json!({"type": "less_than", "threshold": t.temp_low}),
            json!({"type": "sequence", "steps": [
                {"type": "publish_alert", "alert": "Temperature too cold: {value}"},
                {"type": "switch_actuator", "command": "off"}
            ]}),
        )
        .with_name("Temperature too cold")
        .with_actuator(FAN)
        .with_validator(SOUND),
        TriggerRecord::new(
            "temperature_ok",
            TEMPERATURE,
            json!({"type": "all", "conditions": [
                {"type": "between", "low": t.temp_low, "high": t.temp_high},
                {"type": "changed"}
            ]}),
            json!({"type": "publish_alert", "alert": "Temperature ok: {value}"}),
        )
        .with_name("Temperature ok")
        .with_actuator(FAN)
        .with_validator(SOUND),
        // Hot and the fan should be on, but the validator hears nothing.
        TriggerRecord::new(
            "temperature_heating_error",
            TEMPERATURE,
            json!({"type": "all", "conditions": [
                {"type": "greater_than", "threshold": t.temp_high},
                {"type": "on_validator", "condition": {"type": "less_than", "threshold": t.sound}}
            ]}),
            json!({
                "type": "record_fault",
                "fault_type": "heating_error",
                "message": "{sensor_id} is {value} but {validator_id} reports the fan silent"
            }),
        )
        .with_name("Heating error")
        .with_actuator(FAN)
        .with_validator(SOUND),
        // Cold and the fan should be off, but the validator still hears it.
        TriggerRecord::new(
            "temperature_cooling_error",
            TEMPERATURE,
            json!({"type": "all", "conditions": [
                {"type": "less_than", "threshold": t.temp_low},
                {"type": "on_validator", "condition": {"type": "at_least", "threshold": t.sound}}
            ]}),
            json!({
                "type": "record_fault",
                "fault_type": "cooling_error",
                "message": "{sensor_id} is {value} but {validator_id} reports the fan running"
            }),
        )
        .with_name("Cooling error")
        .with_actuator(FAN)
        .with_validator(SOUND),
        TriggerRecord::new(
            "temperature_display",
            TEMPERATURE,
            json!({"type": "changed"}),
            json!({"type": "display_value", "actuator_id": LCD, "template": "{value} Celsius"}),
        )
        .with_name("Show temperature"),
        TriggerRecord::new(
            "light_too_dark",
            LIGHT,
            json!({"type": "crossed_below", "threshold": t.light}),
            json!({"type": "publish_alert", "alert": "Light dropped to {value}"}),
        )
        .with_name("Too dark"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Capture, Effect};
    use crate::engine::Engine;
    use crate::registry::RuleRegistry;
    use crate::state::SensorStateStore;
    use crate::value::Reading;
    use std::sync::Arc;

    fn engine(capture: &Capture) -> Engine {
        let registry = Arc::new(RuleRegistry::new());
        let report = registry.replace(&default_triggers(&Thresholds::default()));
        assert!(report.skipped.is_empty(), "{report:?}");
        Engine::new(
            Arc::new(SensorStateStore::new()),
            registry,
            capture.capabilities(),
        )
    }

    fn faults(effects: &[Effect]) -> Vec<String> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Fault(f) => Some(f.fault_type.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn every_default_trigger_compiles() {
        for record in default_triggers(&Thresholds::default()) {
            record.compile().unwrap();
        }
    }

    #[test]
    fn quiet_fan_while_hot_is_a_heating_error() {
        let capture = Capture::new();
        let engine = engine(&capture);
        engine.dispatch(&Reading::new(SOUND, 10.0));
        let report = engine.dispatch(&Reading::new(TEMPERATURE, 30.0));
        assert!(report.fired.contains(&"temperature_too_hot".to_string()));
        assert_eq!(faults(&capture.effects()), vec!["heating_error"]);
    }

    #[test]
    fn loud_fan_while_cold_is_a_cooling_error() {
        let capture = Capture::new();
        let engine = engine(&capture);
        engine.dispatch(&Reading::new(SOUND, 55.0));
        engine.dispatch(&Reading::new(TEMPERATURE, 15.0));
        assert_eq!(faults(&capture.effects()), vec!["cooling_error"]);
    }

    #[test]
    fn missing_validator_reading_is_not_a_fault() {
        let capture = Capture::new();
        let engine = engine(&capture);
        let report = engine.dispatch(&Reading::new(TEMPERATURE, 30.0));
        assert_eq!(report.condition_errors, 1);
        assert!(faults(&capture.effects()).is_empty());
    }

    #[test]
    fn comfortable_temperature_reports_ok_once() {
        let capture = Capture::new();
        let engine = engine(&capture);
        engine.dispatch(&Reading::new(TEMPERATURE, 22.0));
        engine.dispatch(&Reading::new(TEMPERATURE, 22.0));
        let oks = capture
            .effects()
            .into_iter()
            .filter(|e| matches!(e, Effect::Publish { payload, .. } if payload.contains("ok")))
            .count();
        assert_eq!(oks, 1);
    }
}
