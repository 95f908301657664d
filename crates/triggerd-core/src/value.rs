//! Sensor values and the inbound reading payload.
//!
//! A reading arrives as `{sensor_id, value, timestamp}` JSON. Numbers may be
//! sent either as JSON numbers or as numeric strings (`"28"`); any other
//! non-empty string is kept as text (`"on"`).

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TriggerdError};

// ---------------------------------------------------------------------------
// SensorValue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorValue {
    Number(f64),
    Text(String),
}

impl SensorValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Interpret a raw JSON value the way the ingress does.
    pub fn from_json(raw: &serde_json::Value) -> Option<Self> {
        match raw {
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number),
            serde_json::Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                match trimmed.parse::<f64>() {
                    Ok(n) if n.is_finite() => Some(Self::Number(n)),
                    _ => Some(Self::Text(trimmed.to_string())),
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for SensorValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for SensorValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// A validated telemetry reading. Transient: only its effect on the state
/// store survives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub sensor_id: String,
    pub value: SensorValue,
    pub timestamp: DateTime<Utc>,
}

fn sensor_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,32}$").expect("valid regex"))
}

pub fn is_valid_sensor_id(id: &str) -> bool {
    sensor_id_re().is_match(id)
}

#[derive(Debug, Deserialize)]
struct RawReading {
    #[serde(default)]
    sensor_id: Option<serde_json::Value>,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    timestamp: Option<serde_json::Value>,
}

impl Reading {
    pub fn new(sensor_id: impl Into<String>, value: impl Into<SensorValue>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            value: value.into(),
            timestamp: Utc::now(),
        }
    }

    /// Parse and validate a raw payload.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let raw: RawReading = serde_json::from_slice(payload)
            .map_err(|e| TriggerdError::Parse(format!("invalid JSON: {e}")))?;

        let sensor_id = match raw.sensor_id {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => return Err(TriggerdError::Parse("missing sensor_id".into())),
        };
        if !is_valid_sensor_id(&sensor_id) {
            return Err(TriggerdError::Parse(format!(
                "invalid sensor_id '{sensor_id}'"
            )));
        }

        let value = SensorValue::from_json(&raw.value).ok_or_else(|| {
            TriggerdError::Parse(format!("unusable value {} for '{sensor_id}'", raw.value))
        })?;

        let timestamp = match raw.timestamp {
            None | Some(serde_json::Value::Null) => Utc::now(),
            Some(ts) => parse_timestamp(&ts)
                .ok_or_else(|| TriggerdError::Parse(format!("invalid timestamp {ts}")))?,
        };

        Ok(Self {
            sensor_id,
            value,
            timestamp,
        })
    }
}

/// Epoch milliseconds (string or number) or RFC 3339.
fn parse_timestamp(raw: &serde_json::Value) -> Option<DateTime<Utc>> {
    let millis = match raw {
        serde_json::Value::Number(n) => n.as_i64()?,
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            s.parse::<i64>().ok()?
        }
        _ => return None,
    };
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> Result<Reading> {
        Reading::parse(&serde_json::to_vec(&json).unwrap())
    }

    #[test]
    fn numeric_string_becomes_number() {
        let r = parse(serde_json::json!({
            "sensor_id": "temperature",
            "value": "28",
            "timestamp": "1438015679772"
        }))
        .unwrap();
        assert_eq!(r.sensor_id, "temperature");
        assert_eq!(r.value, SensorValue::Number(28.0));
        assert_eq!(r.timestamp.timestamp_millis(), 1_438_015_679_772);
    }

    #[test]
    fn non_numeric_string_is_text() {
        let r = parse(serde_json::json!({"sensor_id": "fan", "value": "on"})).unwrap();
        assert_eq!(r.value, SensorValue::Text("on".into()));
    }

    #[test]
    fn rfc3339_timestamp_accepted() {
        let r = parse(serde_json::json!({
            "sensor_id": "light",
            "value": 1000,
            "timestamp": "2015-07-27T16:47:59Z"
        }))
        .unwrap();
        assert_eq!(r.value, SensorValue::Number(1000.0));
        assert_eq!(r.timestamp.to_rfc3339(), "2015-07-27T16:47:59+00:00");
    }

    #[test]
    fn rejects_malformed_json() {
        let err = Reading::parse(b"{not json").unwrap_err();
        assert!(matches!(err, TriggerdError::Parse(_)));
    }

    #[test]
    fn rejects_empty_or_invalid_sensor_id() {
        for id in ["", "=---", "a/b"] {
            let err = parse(serde_json::json!({"sensor_id": id, "value": "1"})).unwrap_err();
            assert!(matches!(err, TriggerdError::Parse(_)), "id {id:?}");
        }
    }

    #[test]
    fn rejects_empty_value() {
        let err = parse(serde_json::json!({"sensor_id": "1", "value": ""})).unwrap_err();
        assert!(err.to_string().contains("unusable value"));
    }

    #[test]
    fn rejects_bad_timestamps() {
        for ts in ["abcde", ""] {
            let err = parse(serde_json::json!({
                "sensor_id": "1",
                "value": "71.3",
                "timestamp": ts
            }))
            .unwrap_err();
            assert!(err.to_string().contains("invalid timestamp"), "ts {ts:?}");
        }
    }

    #[test]
    fn text_value_has_no_numeric_view() {
        assert_eq!(SensorValue::from("abcde").as_f64(), None);
        assert_eq!(SensorValue::from(19.5).as_f64(), Some(19.5));
    }

    #[test]
    fn non_finite_strings_stay_text() {
        for raw in ["NaN", "inf", "-infinity"] {
            let r = parse(serde_json::json!({"sensor_id": "t", "value": raw})).unwrap();
            assert_eq!(r.value, SensorValue::Text(raw.into()));
            assert_eq!(r.value.as_f64(), None, "{raw}");
        }
    }
}
