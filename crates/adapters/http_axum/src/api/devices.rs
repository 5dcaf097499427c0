//! JSON handlers for device status, control and provisioning.

use std::time::Duration;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use housebridge_app::ports::{EventPublisher, Transport};
use housebridge_app::registry::DeviceTopics;
use housebridge_domain::device::{ControlAction, DeviceStatus};
use housebridge_domain::id::{DeviceId, HouseId};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for a control command.
#[derive(Debug, Deserialize)]
pub struct ControlRequest {
    /// Device type: `door`, `fan`, `rgb` or `alarm`.
    pub kind: String,
    /// `open`, `close`, `unlock`, `on`, `off` or `color`.
    pub action: String,
    /// Unlock code, required by `unlock`.
    pub code: Option<String>,
    /// `r,g,b`, required by `color`.
    pub color: Option<String>,
    /// Overrides the configured ack deadline.
    pub timeout_ms: Option<u64>,
}

/// Request body for provisioning a device.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub kind: String,
    pub status_topic: String,
    pub control_topic: Option<String>,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<DeviceStatus>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get and control endpoints.
pub enum StatusResponse {
    Ok(Json<DeviceStatus>),
}

impl IntoResponse for StatusResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the register endpoint.
pub enum RegisterResponse {
    Created,
}

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created => StatusCode::CREATED.into_response(),
        }
    }
}

/// `GET /api/houses/{house}/devices`
pub async fn list<T, P>(
    State(state): State<AppState<T, P>>,
    Path(house): Path<String>,
) -> Result<ListResponse, ApiError>
where
    T: Transport + Clone + 'static,
    P: EventPublisher + Clone + 'static,
{
    let house = HouseId::new(house)?;
    Ok(ListResponse::Ok(Json(state.bridge.list_devices(&house))))
}

/// `GET /api/houses/{house}/devices/{id}`
pub async fn get<T, P>(
    State(state): State<AppState<T, P>>,
    Path((house, id)): Path<(String, u32)>,
) -> Result<StatusResponse, ApiError>
where
    T: Transport + Clone + 'static,
    P: EventPublisher + Clone + 'static,
{
    let house = HouseId::new(house)?;
    let status = state.bridge.get_status(&house, DeviceId::new(id))?;
    Ok(StatusResponse::Ok(Json(status)))
}

/// `POST /api/houses/{house}/devices/{id}/control`
///
/// Blocks until the device acknowledges or the deadline passes.
pub async fn control<T, P>(
    State(state): State<AppState<T, P>>,
    Path((house, id)): Path<(String, u32)>,
    Json(req): Json<ControlRequest>,
) -> Result<StatusResponse, ApiError>
where
    T: Transport + Clone + 'static,
    P: EventPublisher + Clone + 'static,
{
    let house = HouseId::new(house)?;
    let action =
        ControlAction::from_parts(&req.action, req.code.as_deref(), req.color.as_deref())?;
    let timeout = req.timeout_ms.map(Duration::from_millis);
    let status = state
        .bridge
        .control(house, DeviceId::new(id), &req.kind, &action, timeout)
        .await?;
    Ok(StatusResponse::Ok(Json(status)))
}

/// `POST /api/houses/{house}/devices/{id}/register`
pub async fn register<T, P>(
    State(state): State<AppState<T, P>>,
    Path((house, id)): Path<(String, u32)>,
    Json(req): Json<RegisterRequest>,
) -> Result<RegisterResponse, ApiError>
where
    T: Transport + Clone + 'static,
    P: EventPublisher + Clone + 'static,
{
    let house = HouseId::new(house)?;
    let topics = DeviceTopics {
        status: req.status_topic,
        control: req.control_topic,
    };
    state
        .bridge
        .register_device(house, DeviceId::new(id), &req.kind, &topics)
        .await?;
    Ok(RegisterResponse::Created)
}
