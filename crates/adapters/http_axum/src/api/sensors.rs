//! JSON handlers for sensor readings.

use axum::Json;
use axum::extract::{Path, State};

use housebridge_app::ports::{EventPublisher, Transport};
use housebridge_domain::id::{HouseId, SensorId};
use housebridge_domain::sensor::{Sample, SensorReading, TempHumi};

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /api/houses/{house}/sensors`
pub async fn list<T, P>(
    State(state): State<AppState<T, P>>,
    Path(house): Path<String>,
) -> Result<Json<Vec<SensorReading>>, ApiError>
where
    T: Transport + Clone + 'static,
    P: EventPublisher + Clone + 'static,
{
    let house = HouseId::new(house)?;
    Ok(Json(state.bridge.list_sensors(&house)))
}

/// `GET /api/houses/{house}/sensors/{id}`
pub async fn get<T, P>(
    State(state): State<AppState<T, P>>,
    Path((house, id)): Path<(String, u32)>,
) -> Result<Json<SensorReading>, ApiError>
where
    T: Transport + Clone + 'static,
    P: EventPublisher + Clone + 'static,
{
    let house = HouseId::new(house)?;
    let reading = state.bridge.get_sensor(&house, SensorId::new(id))?;
    Ok(Json(reading))
}

/// `GET /api/houses/{house}/sensors/{id}/temp-humi`
pub async fn temp_humi<T, P>(
    State(state): State<AppState<T, P>>,
    Path((house, id)): Path<(String, u32)>,
) -> Result<Json<TempHumi>, ApiError>
where
    T: Transport + Clone + 'static,
    P: EventPublisher + Clone + 'static,
{
    let house = HouseId::new(house)?;
    let pair = state.bridge.get_temp_humi(&house, SensorId::new(id))?;
    Ok(Json(pair))
}

/// `GET /api/houses/{house}/sensors/{id}/light`
pub async fn light<T, P>(
    State(state): State<AppState<T, P>>,
    Path((house, id)): Path<(String, u32)>,
) -> Result<Json<Sample>, ApiError>
where
    T: Transport + Clone + 'static,
    P: EventPublisher + Clone + 'static,
{
    let house = HouseId::new(house)?;
    let light = state.bridge.get_light(&house, SensorId::new(id))?;
    Ok(Json(light))
}
