//! The active trigger set.
//!
//! Readers clone an `Arc` of the current snapshot and never hold the lock
//! while evaluating. Writers build a new vector and swap it in, so an
//! in-flight dispatch always sees one consistent set.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::error::{LoadError, Result, TriggerdError};
use crate::trigger::{Trigger, TriggerRecord};

pub type Snapshot = Arc<Vec<Arc<Trigger>>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skipped {
    pub id: String,
    pub reason: String,
}

/// Outcome of a bulk load.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: Vec<Skipped>,
}

#[derive(Default)]
pub struct RuleRegistry {
    current: RwLock<Snapshot>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `records` and swap them in as the whole active set. Records
    /// that fail to compile are skipped and logged one by one; the first
    /// occurrence of a duplicated id wins.
    pub fn replace(&self, records: &[TriggerRecord]) -> LoadReport {
        let mut report = LoadReport::default();
        let mut seen = HashSet::new();
        let mut triggers = Vec::with_capacity(records.len());

        for record in records {
            let compiled = if seen.contains(record.id.as_str()) {
                Err(LoadError::Duplicate)
            } else {
                record.compile()
            };
            match compiled {
                Ok(trigger) => {
                    seen.insert(record.id.as_str());
                    triggers.push(Arc::new(trigger));
                }
                Err(e) => {
                    tracing::warn!(trigger_id = %record.id, error = %e, "skipping trigger");
                    report.skipped.push(Skipped {
                        id: record.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.loaded = triggers.len();
        *self.write() = Arc::new(triggers);
        tracing::info!(
            loaded = report.loaded,
            skipped = report.skipped.len(),
            "trigger registry replaced"
        );
        report
    }

    /// Append one trigger without reloading the rest.
    pub fn add(&self, record: &TriggerRecord) -> Result<Arc<Trigger>> {
        let trigger = Arc::new(record.compile().map_err(|source| TriggerdError::Load {
            id: record.id.clone(),
            source,
        })?);

        let mut guard = self.write();
        if guard.iter().any(|t| t.id == trigger.id) {
            return Err(TriggerdError::DuplicateTrigger(trigger.id.clone()));
        }
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(trigger.clone());
        *guard = Arc::new(next);
        Ok(trigger)
    }

    /// Compile `record` and put it live, replacing a trigger with the same id
    /// in place or appending a new one.
    pub fn upsert(&self, record: &TriggerRecord) -> Result<Arc<Trigger>> {
        let trigger = Arc::new(record.compile().map_err(|source| TriggerdError::Load {
            id: record.id.clone(),
            source,
        })?);

        let mut guard = self.write();
        let mut next: Vec<Arc<Trigger>> = guard.iter().cloned().collect();
        match next.iter_mut().find(|t| t.id == trigger.id) {
            Some(slot) => *slot = trigger.clone(),
            None => next.push(trigger.clone()),
        }
        *guard = Arc::new(next);
        Ok(trigger)
    }

    /// Drop the trigger with `id`. Returns false if it was not live.
    pub fn remove(&self, id: &str) -> bool {
        let mut guard = self.write();
        if !guard.iter().any(|t| t.id == id) {
            return false;
        }
        let next: Vec<Arc<Trigger>> = guard.iter().filter(|t| t.id != id).cloned().collect();
        *guard = Arc::new(next);
        true
    }

    pub fn clear(&self) {
        *self.write() = Arc::default();
    }

    /// Active triggers for `sensor_id`, in load order.
    pub fn matching(&self, sensor_id: &str) -> Vec<Arc<Trigger>> {
        self.snapshot()
            .iter()
            .filter(|t| t.active && t.sensor_id == sensor_id)
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn records(&self) -> Vec<TriggerRecord> {
        self.snapshot().iter().map(|t| t.to_record()).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Snapshot> {
        match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
