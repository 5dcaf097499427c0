//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod devices;
#[allow(clippy::missing_errors_doc)]
pub mod sensors;
pub mod sse;

use axum::Router;
use axum::routing::{get, post};

use housebridge_app::ports::{EventPublisher, Transport};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<T, P>() -> Router<AppState<T, P>>
where
    T: Transport + Clone + 'static,
    P: EventPublisher + Clone + 'static,
{
    Router::new()
        // Sensors
        .route("/houses/{house}/sensors", get(sensors::list::<T, P>))
        .route("/houses/{house}/sensors/{id}", get(sensors::get::<T, P>))
        .route(
            "/houses/{house}/sensors/{id}/temp-humi",
            get(sensors::temp_humi::<T, P>),
        )
        .route(
            "/houses/{house}/sensors/{id}/light",
            get(sensors::light::<T, P>),
        )
        // Devices
        .route("/houses/{house}/devices", get(devices::list::<T, P>))
        .route("/houses/{house}/devices/{id}", get(devices::get::<T, P>))
        .route(
            "/houses/{house}/devices/{id}/control",
            post(devices::control::<T, P>),
        )
        .route(
            "/houses/{house}/devices/{id}/register",
            post(devices::register::<T, P>),
        )
        // Live events
        .route("/events/stream", get(sse::stream::<T, P>))
}
