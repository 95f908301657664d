use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /api/health
pub async fn health(State(app): State<AppState>) -> Json<serde_json::Value> {
    let gate = app.dispatcher.gate();
    let status = if gate.is_closed() {
        "shutting_down"
    } else if gate.is_paused() {
        "paused"
    } else {
        "ok"
    };
    Json(serde_json::json!({
        "status": status,
        "reason": gate.reason(),
        "triggers": app.engine.registry().len(),
        "sensors": app.engine.state().sensor_ids().len(),
    }))
}
