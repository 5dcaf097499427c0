//! State cache — latest known reading of every sensor and status of every
//! device.
//!
//! Merges are atomic per key: each one runs under the shard lock of its
//! entry, so readers see either the state before or after a merge, never a
//! half-applied one. Entries are created on first observation and never
//! removed.

use dashmap::DashMap;

use housebridge_domain::device::{DeviceKind, DeviceStatus, StatusPatch};
use housebridge_domain::id::{DeviceKey, HouseId, SensorKey};
use housebridge_domain::sensor::{SensorAttribute, SensorReading};
use housebridge_domain::time::Timestamp;

/// Concurrent map of the latest sensor readings and device statuses.
#[derive(Default)]
pub struct StateCache {
    sensors: DashMap<SensorKey, SensorReading>,
    devices: DashMap<DeviceKey, DeviceStatus>,
}

impl StateCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite one sensor attribute and return the merged reading.
    pub fn merge_sensor(
        &self,
        key: &SensorKey,
        attribute: SensorAttribute,
        value: f64,
        at: Timestamp,
    ) -> SensorReading {
        let mut entry = self
            .sensors
            .entry(key.clone())
            .or_insert_with(|| SensorReading::empty(key));
        entry.merge(attribute, value, at);
        entry.clone()
    }

    /// Overwrite several attributes of one sensor in a single step.
    pub fn merge_sensor_samples(
        &self,
        key: &SensorKey,
        samples: impl IntoIterator<Item = (SensorAttribute, f64)>,
        at: Timestamp,
    ) -> SensorReading {
        let mut entry = self
            .sensors
            .entry(key.clone())
            .or_insert_with(|| SensorReading::empty(key));
        for (attribute, value) in samples {
            entry.merge(attribute, value, at);
        }
        entry.clone()
    }

    /// Apply a partial status update and return the merged status.
    pub fn merge_device(
        &self,
        key: &DeviceKey,
        kind: DeviceKind,
        patch: &StatusPatch,
        at: Timestamp,
    ) -> DeviceStatus {
        let mut entry = self
            .devices
            .entry(key.clone())
            .or_insert_with(|| DeviceStatus::blank(key, kind, at));
        entry.apply(kind, patch, at);
        entry.clone()
    }

    #[must_use]
    pub fn get_sensor(&self, key: &SensorKey) -> Option<SensorReading> {
        self.sensors.get(key).map(|entry| entry.clone())
    }

    #[must_use]
    pub fn get_device(&self, key: &DeviceKey) -> Option<DeviceStatus> {
        self.devices.get(key).map(|entry| entry.clone())
    }

    /// All sensors of a house, ordered by id.
    #[must_use]
    pub fn sensors_in(&self, house: &HouseId) -> Vec<SensorReading> {
        let mut readings: Vec<_> = self
            .sensors
            .iter()
            .filter(|entry| &entry.key().house == house)
            .map(|entry| entry.value().clone())
            .collect();
        readings.sort_by_key(|reading| reading.sensor_id);
        readings
    }

    /// All devices of a house, ordered by id.
    #[must_use]
    pub fn devices_in(&self, house: &HouseId) -> Vec<DeviceStatus> {
        let mut statuses: Vec<_> = self
            .devices
            .iter()
            .filter(|entry| &entry.key().house == house)
            .map(|entry| entry.value().clone())
            .collect();
        statuses.sort_by_key(|status| status.device_id);
        statuses
    }
}
