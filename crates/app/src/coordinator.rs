//! Control coordinator — per-device serialization of control commands.
//!
//! Every device key owns a slot, a fair [`tokio::sync::Mutex`]. A control
//! request holds the slot from the idempotence check until it resolves, so
//! two callers can never have commands in flight for the same device.
//! Waiters queue in FIFO order; devices are independent of each other.
//!
//! Resolution is a race between a oneshot ack, sent by the dispatcher when a
//! status message for the key arrives, and the caller's deadline.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, oneshot};
use tokio::time::Instant;

use housebridge_domain::device::{ControlAction, DeviceKind, DeviceStatus};
use housebridge_domain::error::ControlError;
use housebridge_domain::event::{ControlOutcome, Event, EventKind, StatusSource};
use housebridge_domain::id::DeviceKey;
use housebridge_domain::time::now;

use crate::cache::StateCache;
use crate::ports::{EventPublisher, Transport};
use crate::registry::TopicRegistry;

/// Default time a caller waits for a device to acknowledge.
pub const DEFAULT_CONTROL_TIMEOUT: Duration = Duration::from_secs(5);

/// What a control request does when the device slot is taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentionPolicy {
    /// Wait for the slot in arrival order.
    #[default]
    Queue,
    /// Fail with [`ControlError::Busy`] straight away.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub contention: ContentionPolicy,
    /// Upper bound on queueing for the slot; `None` waits as long as it takes.
    pub acquire_timeout: Option<Duration>,
    /// Ack deadline used when the caller does not give one.
    pub control_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            contention: ContentionPolicy::default(),
            acquire_timeout: None,
            control_timeout: DEFAULT_CONTROL_TIMEOUT,
        }
    }
}

type PendingMap = DashMap<DeviceKey, oneshot::Sender<DeviceStatus>>;

/// Removes the pending entry when the request ends, however it ends.
struct PendingGuard<'a> {
    pending: &'a PendingMap,
    key: &'a DeviceKey,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(self.key);
    }
}

pub struct ControlCoordinator<T, P> {
    transport: T,
    publisher: P,
    registry: Arc<TopicRegistry>,
    cache: Arc<StateCache>,
    config: CoordinatorConfig,
    slots: DashMap<DeviceKey, Arc<Mutex<()>>>,
    pending: PendingMap,
}

impl<T: Transport, P: EventPublisher> ControlCoordinator<T, P> {
    pub fn new(
        transport: T,
        publisher: P,
        registry: Arc<TopicRegistry>,
        cache: Arc<StateCache>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            transport,
            publisher,
            registry,
            cache,
            config,
            slots: DashMap::new(),
            pending: DashMap::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Send `action` to a device and wait until it reports back.
    ///
    /// Returns the device status that acknowledged the command, or the
    /// cached status unchanged when it already satisfies the action.
    ///
    /// # Errors
    ///
    /// - [`ControlError::UnsupportedAction`] if `kind` cannot do `action`.
    /// - [`ControlError::NotConnected`] if the transport is down.
    /// - [`ControlError::Busy`] if the slot is taken and the contention
    ///   policy does not wait for it.
    /// - [`ControlError::Publish`] if the transport refused the command.
    /// - [`ControlError::Timeout`] if the command could not be sent, or no
    ///   status arrived, before the deadline. The deadline starts once the
    ///   slot is held. The optimistic status stays in the cache.
    #[tracing::instrument(
        skip_all,
        fields(device = %key, kind = %kind, action = action.name())
    )]
    pub async fn control(
        &self,
        key: &DeviceKey,
        kind: DeviceKind,
        action: &ControlAction,
        timeout: Option<Duration>,
    ) -> Result<DeviceStatus, ControlError> {
        let payload = action.encode(kind)?;
        let timeout = timeout.unwrap_or(self.config.control_timeout);
        if !self.transport.is_connected() {
            return Err(ControlError::NotConnected);
        }

        let _slot = self.acquire(key).await?;
        let deadline = Instant::now() + timeout;

        if let Some(current) = self
            .cache
            .get_device(key)
            .filter(|status| status.kind == kind && status.satisfies(action))
        {
            tracing::debug!("device already in requested state");
            return Ok(current);
        }

        let optimistic = self
            .cache
            .merge_device(key, kind, &action.expected_patch(kind), now());
        self.publisher
            .publish(Event::new(EventKind::DeviceUpdated {
                status: optimistic,
                source: StatusSource::Optimistic,
            }))
            .await;

        let (tx, rx) = oneshot::channel();
        self.pending.insert(key.clone(), tx);
        let _pending = PendingGuard {
            pending: &self.pending,
            key,
        };

        let topic = self.registry.command_topic(key, kind);
        let timed_out = || ControlError::Timeout {
            key: key.clone(),
            timeout,
        };
        // One deadline bounds both the publish and the wait for the ack.
        let result =
            match tokio::time::timeout_at(deadline, self.transport.publish(&topic, &payload)).await
            {
                Ok(Ok(())) => {
                    tracing::debug!(%topic, "control command published");
                    match tokio::time::timeout_at(deadline, rx).await {
                        Ok(Ok(status)) => Ok(status),
                        Ok(Err(_)) | Err(_) => Err(timed_out()),
                    }
                }
                Ok(Err(error)) => Err(ControlError::from(error)),
                Err(_) => Err(timed_out()),
            };
        let outcome = match &result {
            Ok(_) => ControlOutcome::Acked,
            Err(ControlError::Timeout { .. }) => {
                tracing::warn!(?timeout, "device did not acknowledge");
                ControlOutcome::TimedOut
            }
            Err(error) => {
                tracing::warn!(%error, "control command not sent");
                ControlOutcome::Failed
            }
        };
        self.publisher
            .publish(Event::new(EventKind::ControlResolved {
                key: key.clone(),
                outcome,
            }))
            .await;
        result
    }

    async fn acquire(&self, key: &DeviceKey) -> Result<OwnedMutexGuard<()>, ControlError> {
        let slot = Arc::clone(&self.slots.entry(key.clone()).or_default());
        match (self.config.contention, self.config.acquire_timeout) {
            (ContentionPolicy::Reject, _) => slot
                .try_lock_owned()
                .map_err(|_| ControlError::Busy(key.clone())),
            (ContentionPolicy::Queue, None) => Ok(slot.lock_owned().await),
            (ContentionPolicy::Queue, Some(limit)) => {
                tokio::time::timeout(limit, slot.lock_owned())
                    .await
                    .map_err(|_| ControlError::Busy(key.clone()))
            }
        }
    }

    /// Hand a freshly merged status to the request waiting on `key`.
    ///
    /// Returns `true` if a waiter was resolved.
    pub fn resolve(&self, key: &DeviceKey, status: DeviceStatus) -> bool {
        self.pending
            .remove(key)
            .is_some_and(|(_, tx)| tx.send(status).is_ok())
    }

    /// Whether a published command for `key` is awaiting its ack.
    #[must_use]
    pub fn is_pending(&self, key: &DeviceKey) -> bool {
        self.pending.contains_key(key)
    }
}
