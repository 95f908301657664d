pub mod actuators;
pub mod bus;
pub mod error;
pub mod routes;
pub mod state;
pub mod supervisor;

use std::future::Future;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Transport ingress
        .route("/api/publish", post(routes::publish::publish))
        // Sensors
        .route("/api/sensors", get(routes::sensors::list_sensors))
        .route("/api/sensors/{sensor_id}", get(routes::sensors::get_sensor))
        .route(
            "/api/sensors/{sensor_id}/data",
            post(routes::sensors::post_data),
        )
        // Triggers
        .route(
            "/api/triggers",
            get(routes::triggers::list_triggers)
                .post(routes::triggers::create_trigger)
                .delete(routes::triggers::delete_all),
        )
        .route(
            "/api/triggers/refresh",
            post(routes::triggers::refresh_triggers),
        )
        .route(
            "/api/triggers/{id}",
            delete(routes::triggers::delete_trigger),
        )
        // Faults
        .route("/api/faults", get(routes::faults::list_faults))
        // Health
        .route("/api/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Serve on a pre-bound listener until `shutdown` resolves, then stop
/// ingress and wait for queued readings to finish dispatching.
pub async fn serve_on<F>(
    listener: tokio::net::TcpListener,
    app_state: AppState,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    let supervisor = supervisor::spawn(app_state.clone());
    let dispatcher = app_state.dispatcher.clone();
    let app = build_router(app_state);

    tracing::info!("triggerd listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("shutting down; draining dispatcher");
    dispatcher.shutdown().await;
    supervisor.abort();
    Ok(())
}
