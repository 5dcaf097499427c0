//! Shared application state for axum handlers.

use std::sync::Arc;

use housebridge_app::event_bus::InProcessEventBus;
use housebridge_app::ports::{EventPublisher, Transport};
use housebridge_app::services::bridge_service::HardwareBridge;

/// Application state shared across all axum handlers.
///
/// Generic over the transport and event publisher to avoid dynamic
/// dispatch. `Clone` is implemented manually so the underlying types do not
/// need to be `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<T, P> {
    /// The hardware bridge service.
    pub bridge: Arc<HardwareBridge<T, P>>,
    /// Event bus the SSE stream subscribes to.
    pub event_bus: Arc<InProcessEventBus>,
}

impl<T, P> Clone for AppState<T, P> {
    fn clone(&self) -> Self {
        Self {
            bridge: Arc::clone(&self.bridge),
            event_bus: Arc::clone(&self.event_bus),
        }
    }
}

impl<T, P> AppState<T, P>
where
    T: Transport + Clone + 'static,
    P: EventPublisher + Clone + 'static,
{
    /// Create the state from a bridge already shared with background tasks.
    pub fn new(bridge: Arc<HardwareBridge<T, P>>, event_bus: Arc<InProcessEventBus>) -> Self {
        Self { bridge, event_bus }
    }
}
