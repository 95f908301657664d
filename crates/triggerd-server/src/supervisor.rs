//! Connectivity supervision.
//!
//! Probes the trigger store on a fixed interval. A failed probe pauses
//! ingress; the first successful probe after that reloads the triggers and
//! resumes it.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Healthy,
    Paused,
    Resumed,
}

/// Run one probe and adjust the ingress gate.
pub async fn probe_once(app: &AppState) -> Probe {
    let store = app.store.clone();
    let ping = tokio::task::spawn_blocking(move || store.ping())
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r.map_err(|e| e.to_string()));

    let gate = app.dispatcher.gate();
    if let Err(reason) = ping {
        gate.pause(format!("store unreachable: {reason}"));
        return Probe::Paused;
    }
    if !gate.is_paused() {
        return Probe::Healthy;
    }

    let control = app.control.clone();
    match tokio::task::spawn_blocking(move || control.refresh()).await {
        Ok(Ok(report)) => {
            tracing::info!(loaded = report.loaded, "store reachable again");
            gate.resume();
            Probe::Resumed
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "store answered ping but refresh failed");
            Probe::Paused
        }
        Err(e) => {
            tracing::error!(error = %e, "refresh task failed");
            Probe::Paused
        }
    }
}

pub fn spawn(app: AppState) -> JoinHandle<()> {
    let every = Duration::from_secs(app.config.dispatch.reconnect_secs.max(1));
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            if app.dispatcher.gate().is_closed() {
                break;
            }
            probe_once(&app).await;
        }
    })
}
