//! Per-sensor state: the current value and the value in effect before it.
//!
//! `update` stages the prior value; `commit` promotes it to `previous` once
//! every trigger for the reading has been evaluated.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;

use crate::value::SensorValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorState {
    pub current: Option<SensorValue>,
    pub previous: Option<SensorValue>,
    #[serde(skip)]
    staged: Option<Option<SensorValue>>,
}

#[derive(Debug, Default)]
pub struct SensorStateStore {
    sensors: Mutex<HashMap<String, SensorState>>,
}

impl SensorStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` as current and return the prior current value
    /// (`None` when the sensor has never reported).
    pub fn update(&self, sensor_id: &str, value: SensorValue) -> Option<SensorValue> {
        let mut sensors = self.lock();
        let entry = sensors.entry(sensor_id.to_string()).or_default();
        let prior = entry.current.replace(value);
        entry.staged = Some(prior.clone());
        prior
    }

    /// Promote the staged prior value to `previous`.
    pub fn commit(&self, sensor_id: &str) {
        let mut sensors = self.lock();
        if let Some(entry) = sensors.get_mut(sensor_id) {
            if let Some(prior) = entry.staged.take() {
                entry.previous = prior;
            }
        }
    }

    pub fn current(&self, sensor_id: &str) -> Option<SensorValue> {
        self.lock().get(sensor_id).and_then(|s| s.current.clone())
    }

    pub fn previous(&self, sensor_id: &str) -> Option<SensorValue> {
        self.lock().get(sensor_id).and_then(|s| s.previous.clone())
    }

    pub fn get(&self, sensor_id: &str) -> Option<SensorState> {
        self.lock().get(sensor_id).cloned()
    }

    pub fn sensor_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SensorState>> {
        // A poisoned map still holds consistent per-entry values.
        self.sensors.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_sensor_is_absent() {
        let store = SensorStateStore::new();
        assert_eq!(store.current("temperature"), None);
        assert_eq!(store.previous("temperature"), None);
    }

    #[test]
    fn update_returns_prior_current() {
        let store = SensorStateStore::new();
        assert_eq!(store.update("t", 20.0.into()), None);
        assert_eq!(store.update("t", 21.0.into()), Some(20.0.into()));
        assert_eq!(store.current("t"), Some(21.0.into()));
    }

    #[test]
    fn previous_moves_only_on_commit() {
        let store = SensorStateStore::new();
        store.update("t", 20.0.into());
        store.commit("t");
        assert_eq!(store.previous("t"), None);

        store.update("t", 21.0.into());
        assert_eq!(store.previous("t"), None, "not committed yet");
        store.commit("t");
        assert_eq!(store.previous("t"), Some(20.0.into()));
    }

    #[test]
    fn previous_tracks_reading_n_minus_one() {
        let store = SensorStateStore::new();
        let values = [18.0, 22.5, 22.5, 30.0];
        for (i, v) in values.iter().enumerate() {
            store.update("t", (*v).into());
            store.commit("t");
            let expected: Option<SensorValue> = if i == 0 {
                None
            } else {
                Some(values[i - 1].into())
            };
            assert_eq!(store.previous("t"), expected);
        }
    }

    #[test]
    fn sensors_are_independent() {
        let store = SensorStateStore::new();
        store.update("a", 1.0.into());
        store.update("b", "on".into());
        assert_eq!(store.current("a"), Some(1.0.into()));
        assert_eq!(store.current("b"), Some("on".into()));
        assert_eq!(store.sensor_ids(), vec!["a".to_string(), "b".to_string()]);
    }
}
