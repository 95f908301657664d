use std::path::PathBuf;
use std::sync::Arc;

use triggerd_core::config::Config;
use triggerd_core::context::{ActuatorGateway, Capabilities};
use triggerd_core::control::ControlPlane;
use triggerd_core::dispatcher::Dispatcher;
use triggerd_core::engine::Engine;
use triggerd_core::registry::RuleRegistry;
use triggerd_core::state::SensorStateStore;
use triggerd_core::store::{StoreFaultSink, TriggerStore};

use crate::actuators::HttpActuators;
use crate::bus::TopicBus;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub config: Arc<Config>,
    pub store: Arc<dyn TriggerStore>,
    pub bus: TopicBus,
    pub engine: Arc<Engine>,
    pub dispatcher: Arc<Dispatcher>,
    pub control: Arc<ControlPlane>,
}

impl AppState {
    /// Wire the engine to `store`, the topic bus and the configured
    /// actuators, start the dispatcher and load the triggers. Must run
    /// inside a tokio runtime.
    pub fn new(
        root: PathBuf,
        config: Config,
        store: Arc<dyn TriggerStore>,
    ) -> triggerd_core::Result<Self> {
        let actuators: Arc<dyn ActuatorGateway> = Arc::new(HttpActuators::new(&config.actuators)?);
        Ok(Self::with_actuators(root, config, store, actuators))
    }

    pub fn with_actuators(
        root: PathBuf,
        config: Config,
        store: Arc<dyn TriggerStore>,
        actuators: Arc<dyn ActuatorGateway>,
    ) -> Self {
        let bus = TopicBus::new(1024);
        let registry = Arc::new(RuleRegistry::new());
        let caps = Capabilities::new(
            Arc::new(bus.clone()),
            actuators,
            Arc::new(StoreFaultSink::new(store.clone())),
        );
        let engine = Arc::new(Engine::new(
            Arc::new(SensorStateStore::new()),
            registry.clone(),
            caps,
        ));
        let dispatcher = Arc::new(Dispatcher::start(
            engine.clone(),
            config.dispatch.workers,
            config.dispatch.queue_capacity,
        ));
        let control = Arc::new(ControlPlane::new(
            store.clone(),
            registry,
            Arc::new(bus.clone()),
        ));

        if let Err(e) = control.refresh() {
            dispatcher.gate().pause(format!("initial trigger load failed: {e}"));
        }

        Self {
            root,
            config: Arc::new(config),
            store,
            bus,
            engine,
            dispatcher,
            control,
        }
    }
}
