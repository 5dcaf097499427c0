//! Event bus port — publish/subscribe for bridge events.

use std::future::Future;

use housebridge_domain::event::Event;

/// Publishes bridge events to interested subscribers.
///
/// Publishing is fire-and-forget: it has no error channel, so a slow or
/// absent subscriber can never fail the bridge.
pub trait EventPublisher: Send + Sync {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: Event) -> impl Future<Output = ()> + Send;
}

impl<T: EventPublisher> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: Event) -> impl Future<Output = ()> + Send {
        (**self).publish(event)
    }
}
