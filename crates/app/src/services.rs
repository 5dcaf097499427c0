//! Application services — use-case implementations.
//!
//! The service struct accepts port trait implementations via generic
//! parameters (constructor injection), keeping this layer decoupled from
//! concrete adapters.

pub mod bridge_service;
