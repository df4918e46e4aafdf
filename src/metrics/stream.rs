//! Read-only views over the in-process collector.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use super::collector::MetricsSnapshot;
use crate::AppState;

const PUSH_INTERVAL: Duration = Duration::from_millis(500);

// ─── GET /api/stats ──────────────────────────────────────────────

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

// ─── GET /api/stats/stream ───────────────────────────────────────
/// Every series the collector holds, re-sent as one SSE `data:` frame per
/// `PUSH_INTERVAL` for as long as the client stays connected.
pub async fn stats_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let frames = IntervalStream::new(tokio::time::interval(PUSH_INTERVAL)).map(move |_| {
        let snapshot = state.metrics.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap_or_default();
        Ok(Event::default().data(json))
    });

    Sse::new(frames).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
