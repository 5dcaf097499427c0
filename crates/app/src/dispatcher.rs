//! Dispatcher — the single inbound entry point.
//!
//! For every message: classify the topic, parse the payload, merge it into
//! the cache, resolve a pending control for device statuses, and publish an
//! event. Failures are logged and the message dropped; nothing here returns
//! an error to the transport.

use std::sync::Arc;

use housebridge_domain::device::{DeviceKind, parse_status};
use housebridge_domain::error::PayloadError;
use housebridge_domain::event::{Event, EventKind, StatusSource};
use housebridge_domain::id::{DeviceId, DeviceKey, HouseId, SensorId, SensorKey};
use housebridge_domain::sensor::{SensorAttribute, SensorBundle, parse_sample};
use housebridge_domain::time::now;
use housebridge_domain::topic::ClassifiedEntity;

use crate::cache::StateCache;
use crate::coordinator::ControlCoordinator;
use crate::ports::{EventPublisher, InboundHandler, Transport};
use crate::registry::TopicRegistry;

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No mapping matched the topic.
    Unclassified,
    /// The topic matched but the payload did not parse.
    Malformed,
    SensorMerged,
    BundleMerged,
    DeviceMerged {
        /// Whether a waiting control request was resolved by this status.
        resolved: bool,
    },
}

pub struct Dispatcher<T, P> {
    registry: Arc<TopicRegistry>,
    cache: Arc<StateCache>,
    coordinator: Arc<ControlCoordinator<T, P>>,
    publisher: P,
}

impl<T: Transport, P: EventPublisher> Dispatcher<T, P> {
    pub fn new(
        registry: Arc<TopicRegistry>,
        cache: Arc<StateCache>,
        coordinator: Arc<ControlCoordinator<T, P>>,
        publisher: P,
    ) -> Self {
        Self {
            registry,
            cache,
            coordinator,
            publisher,
        }
    }

    /// Process one message and report what was done with it.
    pub async fn dispatch(&self, topic: &str, payload: &[u8]) -> DispatchOutcome {
        let Some(classification) = self.registry.classify(topic) else {
            tracing::debug!(%topic, "no mapping for topic, dropping");
            return DispatchOutcome::Unclassified;
        };
        let Ok(text) = std::str::from_utf8(payload) else {
            tracing::warn!(%topic, error = %PayloadError::NotUtf8, "dropping message");
            return DispatchOutcome::Malformed;
        };

        let house = classification.house;
        let result = match classification.entity {
            ClassifiedEntity::Sensor { id, attribute } => {
                self.on_sensor(house, id, attribute, text).await
            }
            ClassifiedEntity::SensorBundle { id } => self.on_bundle(house, id, text).await,
            ClassifiedEntity::Device { id, kind } => self.on_device(house, id, kind, text).await,
        };
        result.unwrap_or_else(|error| {
            tracing::warn!(%topic, %error, "dropping malformed message");
            DispatchOutcome::Malformed
        })
    }

    async fn on_sensor(
        &self,
        house: HouseId,
        id: SensorId,
        attribute: SensorAttribute,
        text: &str,
    ) -> Result<DispatchOutcome, PayloadError> {
        let value = parse_sample(text)?;
        let key = SensorKey::new(house, id);
        let reading = self.cache.merge_sensor(&key, attribute, value, now());
        tracing::trace!(sensor = %key, %attribute, value, "sensor merged");
        self.publisher
            .publish(Event::new(EventKind::SensorUpdated { reading }))
            .await;
        Ok(DispatchOutcome::SensorMerged)
    }

    async fn on_bundle(
        &self,
        house: HouseId,
        id: SensorId,
        text: &str,
    ) -> Result<DispatchOutcome, PayloadError> {
        let bundle = SensorBundle::parse(text)?;
        let key = SensorKey::new(house, id);
        let reading = self.cache.merge_sensor_samples(&key, bundle.samples(), now());
        tracing::trace!(sensor = %key, "sensor bundle merged");
        self.publisher
            .publish(Event::new(EventKind::SensorUpdated { reading }))
            .await;
        Ok(DispatchOutcome::BundleMerged)
    }

    async fn on_device(
        &self,
        house: HouseId,
        id: DeviceId,
        kind: DeviceKind,
        text: &str,
    ) -> Result<DispatchOutcome, PayloadError> {
        let patch = parse_status(kind, text)?;
        let key = DeviceKey::new(house, id);
        let status = self.cache.merge_device(&key, kind, &patch, now());
        let resolved = self.coordinator.resolve(&key, status.clone());
        tracing::debug!(device = %key, %kind, resolved, "device status merged");
        self.publisher
            .publish(Event::new(EventKind::DeviceUpdated {
                status,
                source: StatusSource::Observed,
            }))
            .await;
        Ok(DispatchOutcome::DeviceMerged { resolved })
    }
}

impl<T: Transport, P: EventPublisher> InboundHandler for Dispatcher<T, P> {
    async fn on_message(&self, topic: &str, payload: &[u8]) {
        self.dispatch(topic, payload).await;
    }
}
