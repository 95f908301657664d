use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use triggerd_core::value::Reading;
use triggerd_core::TriggerdError;

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/sensors/{sensor_id}/data — queue one reading for dispatch.
pub async fn post_data(
    State(app): State<AppState>,
    Path(sensor_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let reading = Reading::parse(&body)?;
    if reading.sensor_id != sensor_id {
        return Err(AppError::bad_request(format!(
            "payload sensor_id '{}' does not match path '{sensor_id}'",
            reading.sensor_id
        )));
    }
    app.bus.send(
        &triggerd_core::topics::data_topic(&sensor_id),
        String::from_utf8_lossy(&body).into_owned(),
    );
    app.dispatcher.submit(reading).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "accepted": true, "sensor_id": sensor_id })),
    ))
}

/// GET /api/sensors/{sensor_id} — current and previous value.
pub async fn get_sensor(
    State(app): State<AppState>,
    Path(sensor_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let state = app
        .engine
        .state()
        .get(&sensor_id)
        .ok_or_else(|| TriggerdError::SensorNotFound(sensor_id.clone()))?;
    Ok(Json(serde_json::json!({
        "sensor_id": sensor_id,
        "current": state.current,
        "previous": state.previous,
    })))
}

/// GET /api/sensors — ids of every sensor seen so far.
pub async fn list_sensors(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!(app.engine.state().sensor_ids()))
}
