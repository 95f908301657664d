use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use triggerd_core::TriggerdError;

// ---------------------------------------------------------------------------
// AppError — unified error type for HTTP responses
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(TriggerdError::Parse(msg.into()).into())
    }

    fn status(&self) -> StatusCode {
        let Some(e) = self.0.downcast_ref::<TriggerdError>() else {
            return StatusCode::INTERNAL_SERVER_ERROR;
        };
        match e {
            TriggerdError::Parse(_)
            | TriggerdError::Load { .. }
            | TriggerdError::Config(_)
            | TriggerdError::NotInitialized
            | TriggerdError::Json(_) => StatusCode::BAD_REQUEST,
            TriggerdError::SensorNotFound(_) | TriggerdError::TriggerNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            TriggerdError::DuplicateTrigger(_) => StatusCode::CONFLICT,
            TriggerdError::IngressPaused(_)
            | TriggerdError::ShuttingDown
            | TriggerdError::Store(_)
            | TriggerdError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
            TriggerdError::UnknownActuator(_)
            | TriggerdError::Io(_)
            | TriggerdError::Yaml(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %format!("{:#}", self.0), "request failed");
        }
        let body = serde_json::json!({ "error": format!("{:#}", self.0) });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Map a `spawn_blocking` join failure.
pub fn join_error(e: tokio::task::JoinError) -> AppError {
    AppError(anyhow::anyhow!("task join error: {e}"))
}
