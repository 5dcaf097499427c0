//! Server-Sent Events (SSE) stream of bridge events.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use housebridge_app::ports::{EventPublisher, Transport};

use crate::state::AppState;

/// `GET /api/events/stream` — SSE stream of live bridge events.
///
/// Each event is sent as a JSON `data:` frame named after its kind
/// (`sensor_updated`, `device_updated`, `control_resolved`). Slow clients
/// skip the events they lagged behind on.
pub async fn stream<T, P>(
    State(state): State<AppState<T, P>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>
where
    T: Transport + Clone + 'static,
    P: EventPublisher + Clone + 'static,
{
    let event_rx = state.event_bus.subscribe();
    let event_stream = BroadcastStream::new(event_rx).filter_map(|result| match result {
        Ok(event) => match Event::default().json_data(&event) {
            Ok(frame) => Some(Ok(frame.event(event_name(&event.kind)))),
            Err(err) => {
                tracing::warn!(%err, "failed to serialize event for SSE stream");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(skipped = n, "SSE subscriber lagged, some events were dropped");
            None
        }
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}

fn event_name(kind: &housebridge_domain::event::EventKind) -> &'static str {
    use housebridge_domain::event::EventKind;
    match kind {
        EventKind::SensorUpdated { .. } => "sensor_updated",
        EventKind::DeviceUpdated { .. } => "device_updated",
        EventKind::ControlResolved { .. } => "control_resolved",
    }
}
