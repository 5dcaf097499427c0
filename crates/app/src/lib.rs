//! # housebridge-app
//!
//! Application layer — the hardware bridge core and its **port definitions**.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `Transport` — publish/subscribe against the broker
//!   - `EventPublisher` — fan out state-change events
//! - Define the **driving/inbound port** `InboundHandler`, implemented by the
//!   dispatcher and called by transport adapters for every received message
//! - Provide the core components:
//!   - `TopicRegistry` — topic ⇄ `(house, kind, id, attribute)` mapping
//!   - `StateCache` — last-known sensor readings and device statuses
//!   - `ControlCoordinator` — per-device serialized control with deadlines
//!   - `Dispatcher` — classify, merge, resolve
//!   - `HardwareBridge` — the service object owning all of the above
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `housebridge-domain` only (plus `tokio::sync` / `tokio::time`).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod cache;
pub mod coordinator;
pub mod dispatcher;
pub mod event_bus;
pub mod ports;
pub mod registry;
pub mod services;
