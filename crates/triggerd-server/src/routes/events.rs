use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use triggerd_core::topics::matches_filter;

use crate::state::AppState;

#[derive(Deserialize)]
pub struct EventsQuery {
    /// MQTT-style topic filter; `#` (everything) when absent.
    #[serde(default = "default_filter")]
    pub topic: String,
}

fn default_filter() -> String {
    "#".to_string()
}

/// GET /api/events?topic=<filter> — SSE stream of bus messages whose topic
/// matches the filter. Each event is named after its topic.
pub async fn sse_events(
    State(app): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> impl axum::response::IntoResponse {
    let rx = app.bus.subscribe();
    let filter = query.topic;
    let stream = BroadcastStream::new(rx).filter_map(move |msg| {
        let msg = msg.ok()?;
        if !matches_filter(&filter, &msg.topic) {
            return None;
        }
        Some(Ok::<Event, Infallible>(
            Event::default().event(msg.topic).data(msg.payload),
        ))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
