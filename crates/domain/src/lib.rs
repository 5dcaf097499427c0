//! # housebridge-domain
//!
//! Pure domain model for the housebridge hardware bridge.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **sensor readings** (temperature, humidity, light samples)
//! - Define **device statuses** (door, fan, rgb, alarm) and the control
//!   actions that can be requested for them
//! - Define the **wire vocabulary**: parsing status payloads and encoding
//!   command payloads
//! - Define **topic patterns** used by the registry to classify topics
//! - Define **events** emitted when cached state changes
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod event;
pub mod sensor;
pub mod topic;
