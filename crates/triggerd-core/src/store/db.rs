//! On-disk trigger and fault storage using redb.
//!
//! # Table design
//!
//! ```text
//! TRIGGERS       seq: u64          -> JSON TriggerRecord
//! TRIGGER_INDEX  id: &str          -> seq
//! FAULTS         [ts_ms | uuid]    -> JSON FaultRecord
//! ```
//!
//! Triggers are keyed by an insertion sequence so `list_triggers` returns
//! them in the order they were first saved; the index maps ids back to
//! their slot so an overwrite keeps its position. Fault keys put the
//! big-endian timestamp in the high bytes, so key order is time order.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use uuid::Uuid;

use crate::error::{Result, TriggerdError};
use crate::trigger::TriggerRecord;

use super::{FaultRecord, TriggerStore};

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

const TRIGGERS: TableDefinition<u64, &[u8]> = TableDefinition::new("triggers");
const TRIGGER_INDEX: TableDefinition<&str, u64> = TableDefinition::new("trigger_index");
const FAULTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("faults");

fn fault_key(ts: DateTime<Utc>, id: Uuid) -> [u8; 24] {
    let mut key = [0u8; 24];
    let ms = ts.timestamp_millis().max(0) as u64;
    key[..8].copy_from_slice(&ms.to_be_bytes());
    key[8..].copy_from_slice(id.as_bytes());
    key
}

fn store_err(e: impl std::fmt::Display) -> TriggerdError {
    TriggerdError::Store(e.to_string())
}

// ---------------------------------------------------------------------------
// RedbStore
// ---------------------------------------------------------------------------

pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create the database at `path`, creating all tables.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::io::ensure_dir(parent)?;
        }
        let db = Database::create(path).map_err(store_err)?;
        let wt = db.begin_write().map_err(store_err)?;
        wt.open_table(TRIGGERS).map_err(store_err)?;
        wt.open_table(TRIGGER_INDEX).map_err(store_err)?;
        wt.open_table(FAULTS).map_err(store_err)?;
        wt.commit().map_err(store_err)?;
        Ok(Self { db })
    }
}

impl TriggerStore for RedbStore {
    fn list_triggers(&self) -> Result<Vec<TriggerRecord>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(TRIGGERS).map_err(store_err)?;
        let mut result = Vec::new();
        for entry in table.iter().map_err(store_err)? {
            let (_, v) = entry.map_err(store_err)?;
            result.push(serde_json::from_slice(v.value())?);
        }
        Ok(result)
    }

    fn save_trigger(&self, record: &TriggerRecord) -> Result<()> {
        let value = serde_json::to_vec(record)?;
        let wt = self.db.begin_write().map_err(store_err)?;
        {
            let mut index = wt.open_table(TRIGGER_INDEX).map_err(store_err)?;
            let mut triggers = wt.open_table(TRIGGERS).map_err(store_err)?;

            let existing = index
                .get(record.id.as_str())
                .map_err(store_err)?
                .map(|g| g.value());
            let seq = match existing {
                Some(seq) => seq,
                None => {
                    let next = triggers
                        .last()
                        .map_err(store_err)?
                        .map(|(k, _)| k.value() + 1)
                        .unwrap_or(0);
                    index
                        .insert(record.id.as_str(), next)
                        .map_err(store_err)?;
                    next
                }
            };
            triggers
                .insert(seq, value.as_slice())
                .map_err(store_err)?;
        }
        wt.commit().map_err(store_err)?;
        Ok(())
    }

    fn remove_trigger(&self, id: &str) -> Result<bool> {
        let wt = self.db.begin_write().map_err(store_err)?;
        let removed = {
            let mut index = wt.open_table(TRIGGER_INDEX).map_err(store_err)?;
            let mut triggers = wt.open_table(TRIGGERS).map_err(store_err)?;
            let seq = index.remove(id).map_err(store_err)?.map(|g| g.value());
            match seq {
                Some(seq) => {
                    triggers.remove(seq).map_err(store_err)?;
                    true
                }
                None => false,
            }
        };
        wt.commit().map_err(store_err)?;
        Ok(removed)
    }

    fn remove_all_triggers(&self) -> Result<usize> {
        let wt = self.db.begin_write().map_err(store_err)?;
        let count = {
            let mut index = wt.open_table(TRIGGER_INDEX).map_err(store_err)?;
            let mut triggers = wt.open_table(TRIGGERS).map_err(store_err)?;
            let count = triggers.len().map_err(store_err)? as usize;

            let mut seqs = Vec::new();
            for entry in triggers.iter().map_err(store_err)? {
                let (k, _) = entry.map_err(store_err)?;
                seqs.push(k.value());
            }
            for seq in seqs {
                triggers.remove(seq).map_err(store_err)?;
            }

            let mut ids = Vec::new();
            for entry in index.iter().map_err(store_err)? {
                let (k, _) = entry.map_err(store_err)?;
                ids.push(k.value().to_string());
            }
            for id in &ids {
                index.remove(id.as_str()).map_err(store_err)?;
            }
            count
        };
        wt.commit().map_err(store_err)?;
        Ok(count)
    }

    fn save_fault(&self, fault: &FaultRecord) -> Result<()> {
        let key = fault_key(fault.created_at, fault.id);
        let value = serde_json::to_vec(fault)?;
        let wt = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = wt.open_table(FAULTS).map_err(store_err)?;
            table
                .insert(key.as_slice(), value.as_slice())
                .map_err(store_err)?;
        }
        wt.commit().map_err(store_err)?;
        Ok(())
    }

    fn list_faults(&self) -> Result<Vec<FaultRecord>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(FAULTS).map_err(store_err)?;
        let mut result = Vec::new();
        for entry in table.iter().map_err(store_err)?.rev() {
            let (_, v) = entry.map_err(store_err)?;
            result.push(serde_json::from_slice(v.value())?);
        }
        Ok(result)
    }

    fn ping(&self) -> Result<()> {
        let rt = self.db.begin_read().map_err(store_err)?;
        rt.open_table(TRIGGERS).map_err(store_err)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
