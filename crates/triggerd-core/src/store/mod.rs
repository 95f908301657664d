//! Persistent trigger and fault storage.
//!
//! The engine only depends on [`TriggerStore`]; `db` is the on-disk redb
//! implementation used by the daemon, `memory` backs tests and replay.

pub mod db;
pub mod memory;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::FaultSink;
use crate::error::Result;
use crate::trigger::TriggerRecord;

pub use db::RedbStore;
pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// FaultRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub fault_type: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FaultRecord {
    pub fn new(fault_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            fault_type: fault_type.into(),
            message: message.into(),
            trigger_id: None,
            sensor_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_trigger(mut self, trigger_id: &str, sensor_id: &str) -> Self {
        self.trigger_id = Some(trigger_id.to_string());
        self.sensor_id = Some(sensor_id.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// TriggerStore
// ---------------------------------------------------------------------------

/// Blocking store contract. Async callers go through `spawn_blocking`.
pub trait TriggerStore: Send + Sync {
    /// Every stored trigger, in insertion order.
    fn list_triggers(&self) -> Result<Vec<TriggerRecord>>;

    /// Insert or overwrite the record with the same id. An overwrite keeps
    /// the original position.
    fn save_trigger(&self, record: &TriggerRecord) -> Result<()>;

    /// Returns false when no record had that id.
    fn remove_trigger(&self, id: &str) -> Result<bool>;

    /// Returns the number of records removed.
    fn remove_all_triggers(&self) -> Result<usize>;

    fn save_fault(&self, fault: &FaultRecord) -> Result<()>;

    /// Newest first.
    fn list_faults(&self) -> Result<Vec<FaultRecord>>;

    /// Cheap reachability probe used by the reconnect supervisor.
    fn ping(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// StoreFaultSink
// ---------------------------------------------------------------------------

/// Routes faults raised by actions into a [`TriggerStore`]. Inside a tokio
/// runtime the write is detached onto the blocking pool; failures are logged.
pub struct StoreFaultSink {
    store: Arc<dyn TriggerStore>,
}

impl StoreFaultSink {
    pub fn new(store: Arc<dyn TriggerStore>) -> Self {
        Self { store }
    }
}

impl FaultSink for StoreFaultSink {
    fn record(&self, fault: FaultRecord) -> Result<()> {
        if tokio::runtime::Handle::try_current().is_ok() {
            let store = self.store.clone();
            tokio::task::spawn_blocking(move || {
                if let Err(e) = store.save_fault(&fault) {
                    tracing::error!(fault_type = %fault.fault_type, error = %e, "fault not persisted");
                }
            });
            Ok(())
        } else {
            self.store.save_fault(&fault)
        }
    }
}
