//! # housebridge-adapter-mqtt
//!
//! MQTT adapter — connects the hardware bridge to a broker.
//!
//! ## Responsibilities
//! - Implement the `Transport` port on top of a `rumqttc` client
//! - Drive the `rumqttc` event loop and hand every inbound publish to an
//!   `InboundHandler` (the bridge dispatcher), one message at a time
//! - Track connection state and re-subscribe every filter after each
//!   (re)connect
//!
//! ## Dependency rule
//! Same as other adapters: depends on `housebridge-app` and
//! `housebridge-domain`.

pub mod config;
pub mod error;
pub mod transport;

pub use config::MqttConfig;
pub use error::MqttError;
pub use transport::{MqttEventLoop, MqttTransport};
