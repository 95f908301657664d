use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use triggerd_core::store::TriggerStore;
use triggerd_server::AppState;

pub fn run(root: &Path, bind: Option<String>) -> Result<()> {
    let (mut config, store) = super::open_store(root)?;
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    let addr = config.bind_addr()?;

    let rt = tokio::runtime::Runtime::new()?;
    let root_buf = root.to_path_buf();

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("cannot bind {addr}"))?;
        let store: Arc<dyn TriggerStore> = Arc::new(store);
        let state = AppState::new(root_buf, config, store)?;
        tracing::info!(
            triggers = state.control.registry().len(),
            "trigger registry loaded"
        );

        println!("triggerd listening on http://{}", listener.local_addr()?);
        triggerd_server::serve_on(listener, state, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for ctrl-c");
            }
            tracing::info!("shutting down");
        })
        .await
    })
}
