//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the bridge core and the outside world.
//! They are defined here (in `app`) so that both the core and the adapter
//! layer can depend on them without creating circular dependencies.

pub mod event_bus;
pub mod inbound;
pub mod transport;

pub use event_bus::EventPublisher;
pub use inbound::InboundHandler;
pub use transport::Transport;
