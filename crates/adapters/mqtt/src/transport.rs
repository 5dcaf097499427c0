//! `rumqttc`-backed [`Transport`] and the receive loop.
//!
//! [`MqttTransport::new`] splits the connection into two halves: the
//! transport, shared with the bridge for publishing, and the
//! [`MqttEventLoop`], which must be driven by exactly one task. `rumqttc`
//! reconnects on the next poll after a failure but does not restore
//! subscriptions, so the loop re-subscribes every known filter on each
//! `ConnAck`. Those subscribe requests travel through the same bounded
//! channel the loop drains, so they are sent from a separate task.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, Packet, QoS};
use tokio::task::JoinHandle;

use housebridge_app::ports::{InboundHandler, Transport};
use housebridge_domain::error::TransportError;

use crate::config::MqttConfig;
use crate::error::MqttError;

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

#[derive(Default)]
struct Shared {
    connected: AtomicBool,
    filters: Mutex<BTreeSet<String>>,
}

impl Shared {
    fn filters(&self) -> Vec<String> {
        self.filters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

/// Publishing half of the broker connection.
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
    shared: Arc<Shared>,
}

/// Receiving half of the broker connection.
pub struct MqttEventLoop {
    eventloop: EventLoop,
    client: AsyncClient,
    shared: Arc<Shared>,
    resubscribe: Option<JoinHandle<()>>,
}

impl MqttTransport {
    /// Create the client. Nothing touches the network until the returned
    /// event loop is run.
    #[must_use]
    pub fn new(config: &MqttConfig) -> (Self, MqttEventLoop) {
        let (client, eventloop) = AsyncClient::new(config.options(), config.channel_capacity);
        let shared = Arc::new(Shared::default());
        let transport = Self {
            client: client.clone(),
            shared: Arc::clone(&shared),
        };
        let eventloop = MqttEventLoop {
            eventloop,
            client,
            shared,
            resubscribe: None,
        };
        (transport, eventloop)
    }

    async fn try_publish(&self, topic: &str, payload: &str) -> Result<(), MqttError> {
        if !self.is_connected() {
            return Err(MqttError::NotConnected);
        }
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload.as_bytes().to_vec())
            .await
            .map_err(MqttError::Client)
    }

    async fn try_subscribe(&self, filter: &str) -> Result<(), MqttError> {
        let added = self
            .shared
            .filters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(filter.to_string());
        // Offline subscriptions are sent by the event loop on the next ConnAck.
        if added && self.is_connected() {
            self.client
                .subscribe(filter, QoS::AtLeastOnce)
                .await
                .map_err(MqttError::Client)?;
        }
        Ok(())
    }
}

impl Transport for MqttTransport {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        self.try_publish(topic, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, filter: &str) -> Result<(), TransportError> {
        self.try_subscribe(filter).await?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }
}

impl MqttEventLoop {
    /// Poll the connection forever, feeding publishes to `handler`.
    ///
    /// Messages are handled one at a time, in arrival order. Connection
    /// errors mark the transport disconnected and back off before the next
    /// poll reconnects.
    pub async fn run<H: InboundHandler>(mut self, handler: H) {
        tracing::info!("MQTT event loop started");
        loop {
            let event = self.eventloop.poll().await;
            self.handle(event, &handler).await;
        }
    }

    async fn handle<H: InboundHandler>(
        &mut self,
        event: Result<Event, ConnectionError>,
        handler: &H,
    ) {
        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                self.shared.connected.store(true, Ordering::SeqCst);
                let filters = self.shared.filters();
                tracing::info!(filters = filters.len(), "MQTT connected, subscribing");
                if let Some(previous) = self.resubscribe.take() {
                    previous.abort();
                }
                let client = self.client.clone();
                self.resubscribe = Some(tokio::spawn(async move {
                    for filter in filters {
                        if let Err(error) = client.subscribe(&filter, QoS::AtLeastOnce).await {
                            tracing::error!(%filter, %error, "failed to subscribe");
                        }
                    }
                }));
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                handler.on_message(&publish.topic, &publish.payload).await;
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::warn!("MQTT broker sent disconnect");
                self.shared.connected.store(false, Ordering::SeqCst);
            }
            Ok(_) => {}
            Err(error) => {
                if self.shared.connected.swap(false, Ordering::SeqCst) {
                    tracing::error!(%error, "MQTT connection lost");
                } else {
                    tracing::debug!(%error, "MQTT connection attempt failed");
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}
