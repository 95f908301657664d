use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use triggerd_core::trigger::TriggerRecord;

use crate::error::{join_error, AppError};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/triggers — the active registry snapshot, in evaluation order.
pub async fn list_triggers(State(app): State<AppState>) -> Json<Vec<TriggerRecord>> {
    Json(app.engine.registry().records())
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/triggers — persist a trigger and make it live.
pub async fn create_trigger(
    State(app): State<AppState>,
    Json(record): Json<TriggerRecord>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let control = app.control.clone();
    let trigger = tokio::task::spawn_blocking(move || control.register(&record))
        .await
        .map_err(join_error)??;
    tracing::info!(trigger_id = %trigger.id, sensor_id = %trigger.sensor_id, "trigger registered");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::to_value(trigger.to_record())?),
    ))
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// DELETE /api/triggers — remove every stored trigger.
pub async fn delete_all(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let control = app.control.clone();
    let removed = tokio::task::spawn_blocking(move || control.clear())
        .await
        .map_err(join_error)??;
    Ok(Json(serde_json::json!({ "removed": removed })))
}

/// DELETE /api/triggers/{id}
pub async fn delete_trigger(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let control = app.control.clone();
    let id_clone = id.clone();
    tokio::task::spawn_blocking(move || control.remove(&id_clone))
        .await
        .map_err(join_error)??;
    Ok(Json(serde_json::json!({ "removed": id })))
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

/// POST /api/triggers/refresh — reload the registry from the store.
pub async fn refresh_triggers(
    State(app): State<AppState>,
) -> Result<Json<triggerd_core::registry::LoadReport>, AppError> {
    let report = super::publish::refresh(&app).await?;
    Ok(Json(report))
}
