//! Inbound port — what a transport adapter calls for every received message.

use std::future::Future;

/// Receives raw broker messages, one at a time, in arrival order.
///
/// Implementations must absorb their own failures: a bad message is logged
/// and dropped, never propagated back into the transport's receive loop.
pub trait InboundHandler: Send + Sync {
    /// Handle one message.
    fn on_message(&self, topic: &str, payload: &[u8]) -> impl Future<Output = ()> + Send;
}

impl<T: InboundHandler> InboundHandler for std::sync::Arc<T> {
    fn on_message(&self, topic: &str, payload: &[u8]) -> impl Future<Output = ()> + Send {
        (**self).on_message(topic, payload)
    }
}
