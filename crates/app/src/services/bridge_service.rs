//! Hardware bridge service — the public API the rest of the platform calls.

use std::sync::Arc;
use std::time::Duration;

use housebridge_domain::device::{ControlAction, DeviceKind, DeviceStatus};
use housebridge_domain::error::{BridgeError, NotFoundError, TransportError, ValidationError};
use housebridge_domain::id::{DeviceId, DeviceKey, HouseId, SensorId, SensorKey};
use housebridge_domain::sensor::{Sample, SensorAttribute, SensorReading, TempHumi};
use housebridge_domain::topic::{TopicMapping, TopicPattern};

use crate::cache::StateCache;
use crate::coordinator::{ControlCoordinator, CoordinatorConfig};
use crate::dispatcher::Dispatcher;
use crate::ports::{EventPublisher, Transport};
use crate::registry::{DeviceTopics, TopicRegistry};

/// Service object owning the registry, cache, coordinator and dispatcher.
///
/// The transport is injected; the same handle is shared with the
/// coordinator, so `T` is expected to be a cheap clone such as an `Arc`.
pub struct HardwareBridge<T, P> {
    transport: T,
    registry: Arc<TopicRegistry>,
    cache: Arc<StateCache>,
    coordinator: Arc<ControlCoordinator<T, P>>,
    dispatcher: Arc<Dispatcher<T, P>>,
}

impl<T, P> HardwareBridge<T, P>
where
    T: Transport + Clone,
    P: EventPublisher + Clone,
{
    pub fn new(
        transport: T,
        publisher: P,
        registry: TopicRegistry,
        config: CoordinatorConfig,
    ) -> Self {
        let registry = Arc::new(registry);
        let cache = Arc::new(StateCache::new());
        let coordinator = Arc::new(ControlCoordinator::new(
            transport.clone(),
            publisher.clone(),
            Arc::clone(&registry),
            Arc::clone(&cache),
            config,
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&cache),
            Arc::clone(&coordinator),
            publisher,
        ));
        Self {
            transport,
            registry,
            cache,
            coordinator,
            dispatcher,
        }
    }

    /// Inbound handler to hand to the transport's receive loop.
    #[must_use]
    pub fn dispatcher(&self) -> Arc<Dispatcher<T, P>> {
        Arc::clone(&self.dispatcher)
    }

    /// Filters the transport must subscribe to.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.registry.subscriptions()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Full reading of one sensor.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] if the sensor has never reported.
    pub fn get_sensor(&self, house: &HouseId, sensor: SensorId) -> Result<SensorReading, BridgeError> {
        let key = SensorKey::new(house.clone(), sensor);
        self.cache
            .get_sensor(&key)
            .ok_or_else(|| not_found("Sensor", &key))
    }

    /// Temperature and humidity of one sensor.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] unless at least one of the two has
    /// been observed.
    #[tracing::instrument(skip(self))]
    pub fn get_temp_humi(&self, house: &HouseId, sensor: SensorId) -> Result<TempHumi, BridgeError> {
        let key = SensorKey::new(house.clone(), sensor);
        self.cache
            .get_sensor(&key)
            .as_ref()
            .and_then(TempHumi::from_reading)
            .ok_or_else(|| not_found("Temperature/humidity", &key))
    }

    /// Light level of one sensor.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] if no light value has been observed.
    #[tracing::instrument(skip(self))]
    pub fn get_light(&self, house: &HouseId, sensor: SensorId) -> Result<Sample, BridgeError> {
        let key = SensorKey::new(house.clone(), sensor);
        self.cache
            .get_sensor(&key)
            .and_then(|reading| reading.get(SensorAttribute::Light).copied())
            .ok_or_else(|| not_found("Light", &key))
    }

    /// Last-known status of one device.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] if the device has never reported
    /// and was never controlled.
    #[tracing::instrument(skip(self))]
    pub fn get_status(&self, house: &HouseId, device: DeviceId) -> Result<DeviceStatus, BridgeError> {
        let key = DeviceKey::new(house.clone(), device);
        self.cache
            .get_device(&key)
            .ok_or_else(|| not_found("Device", &key))
    }

    #[must_use]
    pub fn list_sensors(&self, house: &HouseId) -> Vec<SensorReading> {
        self.cache.sensors_in(house)
    }

    #[must_use]
    pub fn list_devices(&self, house: &HouseId) -> Vec<DeviceStatus> {
        self.cache.devices_in(house)
    }

    /// Drive a device and wait for it to acknowledge.
    ///
    /// `kind` is the device type name as callers know it (`door`, `fan`,
    /// `rgb`, `alarm`). `timeout` overrides the configured ack deadline.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Validation`] for a zero timeout and
    /// [`BridgeError::Control`] for everything the coordinator reports,
    /// including an unknown `kind`.
    pub async fn control(
        &self,
        house: HouseId,
        device: DeviceId,
        kind: &str,
        action: &ControlAction,
        timeout: Option<Duration>,
    ) -> Result<DeviceStatus, BridgeError> {
        let kind: DeviceKind = kind.parse()?;
        if timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ValidationError::ZeroTimeout.into());
        }
        let key = DeviceKey::new(house, device);
        let status = self.coordinator.control(&key, kind, action, timeout).await?;
        Ok(status)
    }

    /// Add a topic mapping at runtime and subscribe to it.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Registry`] if the pattern is already taken.
    pub async fn register_mapping(&self, mapping: TopicMapping) -> Result<(), BridgeError> {
        let filter = mapping.pattern().to_filter();
        self.registry.register(mapping)?;
        self.subscribe(&filter).await;
        Ok(())
    }

    /// Provision a device with its own status and command topics.
    ///
    /// The transport is subscribed to the status topic rendered as a filter,
    /// so `attic/{id}/fan` subscribes to `attic/+/fan`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Control`] for an unknown `kind` and
    /// [`BridgeError::Registry`] if the status topic is invalid or already
    /// mapped.
    #[tracing::instrument(skip(self, topics))]
    pub async fn register_device(
        &self,
        house: HouseId,
        device: DeviceId,
        kind: &str,
        topics: &DeviceTopics,
    ) -> Result<(), BridgeError> {
        let kind: DeviceKind = kind.parse()?;
        let filter = TopicPattern::parse(&topics.status)?.to_filter();
        let key = DeviceKey::new(house, device);
        self.registry.register_device(&key, kind, topics)?;
        self.subscribe(&filter).await;
        Ok(())
    }

    /// Subscribe the transport to every registered filter.
    ///
    /// # Errors
    ///
    /// Returns the first transport error.
    pub async fn subscribe_all(&self) -> Result<(), TransportError> {
        for filter in self.registry.subscriptions() {
            self.transport.subscribe(&filter).await?;
        }
        Ok(())
    }

    /// The mapping is committed at this point; the adapter subscribes again
    /// on reconnect, so a failure here is only logged.
    async fn subscribe(&self, filter: &str) {
        if let Err(error) = self.transport.subscribe(filter).await {
            tracing::warn!(%filter, %error, "subscription failed, retrying on reconnect");
        }
    }
}

fn not_found(entity: &'static str, key: &impl std::fmt::Display) -> BridgeError {
    NotFoundError {
        entity,
        id: key.to_string(),
    }
    .into()
}
