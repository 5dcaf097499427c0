//! Transport port — the narrow slice of a pub/sub client the bridge needs.

use std::future::Future;

use housebridge_domain::error::TransportError;

/// Outbound side of a pub/sub broker connection.
///
/// Receiving is the adapter's business: it feeds every inbound message to an
/// [`InboundHandler`](super::InboundHandler).
pub trait Transport: Send + Sync {
    /// Publish `payload` on `topic`.
    fn publish(
        &self,
        topic: &str,
        payload: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Subscribe to a topic filter. Adapters are expected to remember it and
    /// re-subscribe after a reconnect.
    fn subscribe(&self, filter: &str) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Whether the broker connection is currently up.
    fn is_connected(&self) -> bool;
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    fn publish(
        &self,
        topic: &str,
        payload: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).publish(topic, payload)
    }

    fn subscribe(&self, filter: &str) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).subscribe(filter)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
