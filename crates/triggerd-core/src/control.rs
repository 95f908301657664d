//! Refresh and snapshot handling, plus the write path for trigger edits.
//!
//! Every edit goes to the store first and reaches the registry only after
//! the store accepted it, so a refresh never loses a trigger the registry
//! already had. Edits are serialised so the registry applies them in the
//! same order the store did.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::context::Publisher;
use crate::error::{Result, TriggerdError};
use crate::registry::{LoadReport, RuleRegistry};
use crate::store::TriggerStore;
use crate::topics::{self, Inbound};
use crate::trigger::{Trigger, TriggerRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Refresh,
    Snapshot,
}

impl ControlSignal {
    pub fn from_topic(topic: &str) -> Option<Self> {
        match topics::classify(topic) {
            Inbound::Refresh => Some(Self::Refresh),
            Inbound::SnapshotRequest => Some(Self::Snapshot),
            _ => None,
        }
    }
}

pub struct ControlPlane {
    store: Arc<dyn TriggerStore>,
    registry: Arc<RuleRegistry>,
    publisher: Arc<dyn Publisher>,
    edits: Mutex<()>,
}

impl ControlPlane {
    pub fn new(
        store: Arc<dyn TriggerStore>,
        registry: Arc<RuleRegistry>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            store,
            registry,
            publisher,
            edits: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn TriggerStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// Reload the registry from the store. On a store error the registry
    /// keeps its current set.
    pub fn refresh(&self) -> Result<LoadReport> {
        let records = self.store.list_triggers()?;
        Ok(self.registry.replace(&records))
    }

    pub fn snapshot_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.registry.records())?)
    }

    pub fn publish_snapshot(&self) -> Result<()> {
        let json = self.snapshot_json()?;
        self.publisher
            .publish(topics::SNAPSHOT_RESPONSE_TOPIC, json)
    }

    pub fn handle(&self, signal: ControlSignal) -> Result<()> {
        match signal {
            ControlSignal::Refresh => {
                self.refresh()?;
            }
            ControlSignal::Snapshot => self.publish_snapshot()?,
        }
        Ok(())
    }

    /// Persist `record` and make it live. A new id is appended; an existing
    /// id keeps its position, matching how the store orders an overwrite.
    pub fn register(&self, record: &TriggerRecord) -> Result<Arc<Trigger>> {
        record.compile().map_err(|source| TriggerdError::Load {
            id: record.id.clone(),
            source,
        })?;
        let _edit = self.edit_lock();
        self.store.save_trigger(record)?;
        self.registry.upsert(record)
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        let _edit = self.edit_lock();
        if !self.store.remove_trigger(id)? {
            return Err(TriggerdError::TriggerNotFound(id.to_string()));
        }
        self.registry.remove(id);
        Ok(())
    }

    pub fn clear(&self) -> Result<usize> {
        let _edit = self.edit_lock();
        let removed = self.store.remove_all_triggers()?;
        self.registry.clear();
        Ok(removed)
    }

    fn edit_lock(&self) -> MutexGuard<'_, ()> {
        match self.edits.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
