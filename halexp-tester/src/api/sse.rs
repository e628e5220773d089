//! Server-Sent Events for dispatch progress

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /api/events - SSE stream of dispatch events
///
/// Streams RunStarted, RowUpdated (in completion order), RunCompleted and
/// BusyChanged events.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    halexp_common::sse::create_event_sse_stream(state.dispatcher.event_bus(), "halexp-tester")
}
