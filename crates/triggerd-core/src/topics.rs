//! Channel naming and inbound topic classification.

pub const REFRESH_TOPIC: &str = "triggers/refresh";
pub const SNAPSHOT_REQUEST_TOPIC: &str = "triggers/snapshot";
pub const SNAPSHOT_RESPONSE_TOPIC: &str = "triggers/snapshot/response";

pub fn data_topic(sensor_id: &str) -> String {
    format!("sensors/{sensor_id}/data")
}

pub fn alert_topic(sensor_id: &str) -> String {
    format!("sensors/{sensor_id}/alerts")
}

pub fn control_topic(actuator_id: &str) -> String {
    format!("actuators/{actuator_id}/control")
}

pub fn error_topic(device_id: &str) -> String {
    format!("other/{device_id}/errors")
}

/// What an inbound message on `topic` asks the engine to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Telemetry { sensor_id: String },
    Refresh,
    SnapshotRequest,
    Other,
}

pub fn classify(topic: &str) -> Inbound {
    match topic {
        REFRESH_TOPIC => return Inbound::Refresh,
        SNAPSHOT_REQUEST_TOPIC => return Inbound::SnapshotRequest,
        _ => {}
    }
    let parts: Vec<&str> = topic.split('/').collect();
    match parts.as_slice() {
        ["sensors", id, "data"] if crate::value::is_valid_sensor_id(id) => Inbound::Telemetry {
            sensor_id: (*id).to_string(),
        },
        _ => Inbound::Other,
    }
}

/// MQTT-style filter match: `+` matches one level, a trailing `#` matches
/// the rest.
pub fn matches_filter(filter: &str, topic: &str) -> bool {
    let mut f = filter.split('/');
    let mut t = topic.split('/');
    loop {
        match (f.next(), t.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(a), Some(b)) if a == b => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_sensor_data() {
        assert_eq!(
            classify("sensors/temperature/data"),
            Inbound::Telemetry {
                sensor_id: "temperature".into()
            }
        );
        assert_eq!(classify("sensors/=--/data"), Inbound::Other);
        assert_eq!(classify("sensors/temperature/alerts"), Inbound::Other);
    }

    #[test]
    fn classifies_control_topics() {
        assert_eq!(classify("triggers/refresh"), Inbound::Refresh);
        assert_eq!(classify("triggers/snapshot"), Inbound::SnapshotRequest);
        assert_eq!(classify("triggers/snapshot/response"), Inbound::Other);
    }

    #[test]
    fn filter_wildcards() {
        assert!(matches_filter("sensors/+/alerts", "sensors/temperature/alerts"));
        assert!(!matches_filter("sensors/+/alerts", "sensors/temperature/data"));
        assert!(matches_filter("#", "other/fan/errors"));
        assert!(matches_filter("actuators/#", "actuators/fan/control"));
        assert!(!matches_filter("sensors/+", "sensors/a/b"));
        assert!(matches_filter("triggers/refresh", "triggers/refresh"));
    }
}
