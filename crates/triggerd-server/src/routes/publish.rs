use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use triggerd_core::control::ControlSignal;
use triggerd_core::topics::{self, Inbound};
use triggerd_core::value::Reading;

use crate::error::{join_error, AppError};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PublishBody {
    pub topic: String,
    /// A JSON string is taken verbatim; any other JSON value is re-encoded.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// POST /api/publish — generic transport ingress.
///
/// The message is first broadcast on the bus, then routed by topic:
/// telemetry is queued for dispatch, control topics run the control plane,
/// anything else is only broadcast.
pub async fn publish(
    State(app): State<AppState>,
    Json(body): Json<PublishBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let payload = match body.payload {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };
    app.bus.send(&body.topic, payload.clone());

    match topics::classify(&body.topic) {
        Inbound::Telemetry { sensor_id } => {
            let reading = Reading::parse(payload.as_bytes())?;
            if reading.sensor_id != sensor_id {
                return Err(AppError::bad_request(format!(
                    "payload sensor_id '{}' does not match topic '{}'",
                    reading.sensor_id, body.topic
                )));
            }
            app.dispatcher.submit(reading).await?;
            Ok((StatusCode::ACCEPTED, Json(serde_json::json!({ "routed": "telemetry" }))))
        }
        Inbound::Refresh => {
            let report = refresh(&app).await?;
            Ok((StatusCode::OK, Json(serde_json::json!({ "routed": "refresh", "report": report }))))
        }
        Inbound::SnapshotRequest => {
            let control = app.control.clone();
            tokio::task::spawn_blocking(move || control.handle(ControlSignal::Snapshot))
                .await
                .map_err(join_error)??;
            Ok((StatusCode::OK, Json(serde_json::json!({ "routed": "snapshot" }))))
        }
        Inbound::Other => Ok((StatusCode::ACCEPTED, Json(serde_json::json!({ "routed": "bus" })))),
    }
}

/// Reload triggers from the store. A store failure pauses ingress until the
/// supervisor sees the store again.
pub async fn refresh(
    app: &AppState,
) -> Result<triggerd_core::registry::LoadReport, AppError> {
    let control = app.control.clone();
    let result = tokio::task::spawn_blocking(move || control.refresh())
        .await
        .map_err(join_error)?;
    match result {
        Ok(report) => Ok(report),
        Err(e @ triggerd_core::TriggerdError::Store(_)) => {
            app.dispatcher.gate().pause(e.to_string());
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
