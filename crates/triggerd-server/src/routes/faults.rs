use axum::extract::State;
use axum::Json;
use triggerd_core::store::FaultRecord;

use crate::error::{join_error, AppError};
use crate::state::AppState;

/// GET /api/faults — recorded faults, newest first.
pub async fn list_faults(State(app): State<AppState>) -> Result<Json<Vec<FaultRecord>>, AppError> {
    let store = app.store.clone();
    let faults = tokio::task::spawn_blocking(move || store.list_faults())
        .await
        .map_err(join_error)??;
    Ok(Json(faults))
}
