use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, TriggerdError};
use crate::trigger::TriggerRecord;

use super::{FaultRecord, TriggerStore};

#[derive(Default)]
struct Inner {
    triggers: Vec<TriggerRecord>,
    faults: Vec<FaultRecord>,
}

/// Process-local store. `set_available(false)` makes every call fail with a
/// store error, which is how connectivity loss is simulated.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_triggers(records: Vec<TriggerRecord>) -> Self {
        let store = Self::new();
        store.lock().triggers = records;
        store
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TriggerdError::Store("store unreachable".into()));
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl TriggerStore for MemoryStore {
    fn list_triggers(&self) -> Result<Vec<TriggerRecord>> {
        self.check()?;
        Ok(self.lock().triggers.clone())
    }

    fn save_trigger(&self, record: &TriggerRecord) -> Result<()> {
        self.check()?;
        let mut inner = self.lock();
        match inner.triggers.iter_mut().find(|t| t.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => inner.triggers.push(record.clone()),
        }
        Ok(())
    }

    fn remove_trigger(&self, id: &str) -> Result<bool> {
        self.check()?;
        let mut inner = self.lock();
        let before = inner.triggers.len();
        inner.triggers.retain(|t| t.id != id);
        Ok(inner.triggers.len() != before)
    }

    fn remove_all_triggers(&self) -> Result<usize> {
        self.check()?;
        let mut inner = self.lock();
        let n = inner.triggers.len();
        inner.triggers.clear();
        Ok(n)
    }

    fn save_fault(&self, fault: &FaultRecord) -> Result<()> {
        self.check()?;
        self.lock().faults.push(fault.clone());
        Ok(())
    }

    fn list_faults(&self) -> Result<Vec<FaultRecord>> {
        self.check()?;
        let mut faults = self.lock().faults.clone();
        faults.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(faults)
    }

    fn ping(&self) -> Result<()> {
        self.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str) -> TriggerRecord {
        TriggerRecord::new(
            id,
            "temperature",
            json!({"type": "always"}),
            json!({"type": "log", "message": "x"}),
        )
    }

    #[test]
    fn save_overwrites_in_place() {
        let store = MemoryStore::new();
        store.save_trigger(&record("a")).unwrap();
        store.save_trigger(&record("b")).unwrap();
        store.save_trigger(&record("a").inactive()).unwrap();
        let all = store.list_triggers().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "a");
        assert!(!all[0].active);
    }

    #[test]
    fn unavailable_store_fails_every_call() {
        let store = MemoryStore::with_triggers(vec![record("a")]);
        store.set_available(false);
        assert!(matches!(store.list_triggers(), Err(TriggerdError::Store(_))));
        assert!(store.ping().is_err());
        store.set_available(true);
        assert_eq!(store.list_triggers().unwrap().len(), 1);
    }

    #[test]
    fn remove_reports_what_happened() {
        let store = MemoryStore::with_triggers(vec![record("a"), record("b")]);
        assert!(store.remove_trigger("a").unwrap());
        assert!(!store.remove_trigger("a").unwrap());
        assert_eq!(store.remove_all_triggers().unwrap(), 1);
    }
}
