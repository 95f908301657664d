//! Sharded worker pool in front of the [`Engine`].
//!
//! Each worker owns a bounded queue. A reading goes to the worker picked by
//! a hash of its sensor id, so readings for one sensor are handled by one
//! task in arrival order while different sensors proceed in parallel.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::Engine;
use crate::error::{Result, TriggerdError};
use crate::value::Reading;

// ---------------------------------------------------------------------------
// IngressGate
// ---------------------------------------------------------------------------

const OPEN: u8 = 0;
const PAUSED: u8 = 1;
const CLOSED: u8 = 2;

/// Admission control for new readings. Paused while a collaborator is
/// unreachable, closed for good on shutdown.
pub struct IngressGate {
    state: AtomicU8,
    reason: Mutex<Option<String>>,
}

impl Default for IngressGate {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(OPEN),
            reason: Mutex::new(None),
        }
    }
}

impl IngressGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if this call changed the gate from open to paused.
    pub fn pause(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let changed = self
            .state
            .compare_exchange(OPEN, PAUSED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if changed {
            tracing::warn!(reason = %reason, "ingress paused");
            *self.reason_lock() = Some(reason);
        }
        changed
    }

    /// Returns true if this call changed the gate from paused to open.
    pub fn resume(&self) -> bool {
        let changed = self
            .state
            .compare_exchange(PAUSED, OPEN, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if changed {
            *self.reason_lock() = None;
            tracing::info!("ingress resumed");
        }
        changed
    }

    pub fn close(&self) {
        self.state.store(CLOSED, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.state.load(Ordering::SeqCst) == PAUSED
    }

    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::SeqCst) == CLOSED
    }

    pub fn reason(&self) -> Option<String> {
        self.reason_lock().clone()
    }

    pub fn check(&self) -> Result<()> {
        match self.state.load(Ordering::SeqCst) {
            OPEN => Ok(()),
            PAUSED => Err(TriggerdError::IngressPaused(
                self.reason().unwrap_or_else(|| "collaborator unreachable".into()),
            )),
            _ => Err(TriggerdError::ShuttingDown),
        }
    }

    fn reason_lock(&self) -> MutexGuard<'_, Option<String>> {
        match self.reason.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher {
    engine: Arc<Engine>,
    gate: Arc<IngressGate>,
    senders: RwLock<Vec<mpsc::Sender<Reading>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Spawn `workers` tasks on the current runtime, each with a queue of
    /// `queue_capacity` readings.
    pub fn start(engine: Arc<Engine>, workers: usize, queue_capacity: usize) -> Self {
        let workers = workers.max(1);
        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for n in 0..workers {
            let (tx, mut rx) = mpsc::channel::<Reading>(queue_capacity.max(1));
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                while let Some(reading) = rx.recv().await {
                    let report = engine.dispatch(&reading);
                    tracing::debug!(
                        worker = n,
                        sensor_id = %report.sensor_id,
                        fired = report.fired.len(),
                        "reading dispatched"
                    );
                }
                tracing::debug!(worker = n, "dispatch worker stopped");
            }));
            senders.push(tx);
        }
        tracing::info!(workers, queue_capacity, "dispatcher started");
        Self {
            engine,
            gate: Arc::new(IngressGate::new()),
            senders: RwLock::new(senders),
            workers: Mutex::new(handles),
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn gate(&self) -> &Arc<IngressGate> {
        &self.gate
    }

    /// Queue a reading for its sensor's worker. Waits when that queue is full.
    pub async fn submit(&self, reading: Reading) -> Result<()> {
        self.gate.check()?;
        let sender = {
            let senders = match self.senders.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if senders.is_empty() {
                return Err(TriggerdError::ShuttingDown);
            }
            senders[shard(&reading.sensor_id, senders.len())].clone()
        };
        sender
            .send(reading)
            .await
            .map_err(|_| TriggerdError::ShuttingDown)
    }

    /// Parse and queue a raw telemetry payload.
    pub async fn submit_raw(&self, payload: &[u8]) -> Result<()> {
        let reading = Reading::parse(payload).inspect_err(|e| {
            tracing::warn!(error = %e, "discarding malformed reading");
        })?;
        self.submit(reading).await
    }

    /// Stop accepting readings, let queued ones finish, then return.
    pub async fn shutdown(&self) {
        self.gate.close();
        match self.senders.write() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        let handles = match self.workers.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "dispatch worker failed");
            }
        }
        tracing::info!("dispatcher drained");
    }
}

fn shard(sensor_id: &str, n: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    sensor_id.hash(&mut hasher);
    (hasher.finish() % n as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Capture;
    use crate::registry::RuleRegistry;
    use crate::state::SensorStateStore;
    use crate::trigger::TriggerRecord;
    use serde_json::json;

    fn engine(capture: &Capture) -> Arc<Engine> {
        let registry = Arc::new(RuleRegistry::new());
        registry.replace(&[TriggerRecord::new(
            "echo",
            "temperature",
            json!({"type": "always"}),
            json!({"type": "publish", "topic": "echo", "payload": "{previous}->{value}"}),
        )]);
        Arc::new(Engine::new(
            Arc::new(SensorStateStore::new()),
            registry,
            capture.capabilities(),
        ))
    }

    #[test]
    fn shard_is_stable() {
        assert_eq!(shard("temperature", 4), shard("temperature", 4));
        assert!(shard("light", 3) < 3);
    }

    #[tokio::test]
    async fn per_sensor_order_is_preserved() {
        let capture = Capture::new();
        let dispatcher = Dispatcher::start(engine(&capture), 4, 2);
        for i in 0..20 {
            dispatcher
                .submit(Reading::new("temperature", i as f64))
                .await
                .unwrap();
            dispatcher.submit(Reading::new("light", i as f64)).await.unwrap();
        }
        dispatcher.shutdown().await;

        let payloads: Vec<String> = capture
            .effects()
            .into_iter()
            .map(|e| match e {
                crate::capture::Effect::Publish { payload, .. } => payload,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(payloads.len(), 20);
        assert_eq!(payloads[0], "none->0");
        for (i, p) in payloads.iter().enumerate().skip(1) {
            assert_eq!(p, &format!("{}->{}", i - 1, i));
        }
    }

    #[tokio::test]
    async fn paused_gate_rejects_then_resumes() {
        let capture = Capture::new();
        let dispatcher = Dispatcher::start(engine(&capture), 1, 8);
        assert!(dispatcher.gate().pause("store down"));
        assert!(!dispatcher.gate().pause("again"));
        let err = dispatcher
            .submit(Reading::new("temperature", 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, TriggerdError::IngressPaused(r) if r == "store down"));

        assert!(dispatcher.gate().resume());
        dispatcher.submit(Reading::new("temperature", 1.0)).await.unwrap();
        dispatcher.shutdown().await;
        assert_eq!(capture.effects().len(), 1);
    }

    #[tokio::test]
    async fn submit_after_shutdown_fails() {
        let capture = Capture::new();
        let dispatcher = Dispatcher::start(engine(&capture), 2, 8);
        dispatcher.shutdown().await;
        let err = dispatcher
            .submit(Reading::new("temperature", 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, TriggerdError::ShuttingDown));
        assert!(dispatcher.gate().is_closed());
    }

    #[tokio::test]
    async fn malformed_raw_payload_is_rejected() {
        let capture = Capture::new();
        let dispatcher = Dispatcher::start(engine(&capture), 1, 8);
        let err = dispatcher.submit_raw(b"{}").await.unwrap_err();
        assert!(matches!(err, TriggerdError::Parse(_)));
        dispatcher.shutdown().await;
        assert!(capture.effects().is_empty());
    }
}
