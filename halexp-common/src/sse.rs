//! Server-Sent Events (SSE) utilities
//!
//! Bridges the EventBus onto an axum SSE response.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use crate::events::EventBus;

/// Create an SSE stream forwarding every DispatchEvent on the bus
///
/// Sends an initial `ConnectionStatus` event, then one SSE event per bus
/// event named after its variant. Lagged receivers log a warning and resume.
///
/// # Example
/// ```rust,ignore
/// pub async fn event_stream(
///     State(state): State<AppState>,
/// ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
///     halexp_common::sse::create_event_sse_stream(&state.event_bus, "halexp-tester")
/// }
/// ```
pub fn create_event_sse_stream(
    bus: &EventBus,
    service_name: &'static str,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(
        "New SSE client connected to {} events ({} subscribers)",
        service_name,
        bus.subscriber_count() + 1
    );

    let events = BroadcastStream::new(bus.subscribe()).filter_map(|result| async move {
        match result {
            Ok(event) => {
                debug!(event = event.event_type(), "SSE: forwarding event");
                Event::default()
                    .event(event.event_type())
                    .json_data(&event)
                    .ok()
                    .map(Ok)
            }
            Err(e) => {
                warn!("SSE client lagged: {:?}", e);
                None
            }
        }
    });

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            yield event;
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
