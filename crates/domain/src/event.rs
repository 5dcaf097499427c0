//! Event — an immutable record of a change in the bridge's cached state.
//!
//! Events are produced when a sensor or device message is merged, when a
//! control request writes its optimistic status, and when a pending control
//! resolves. They feed live dashboards; nothing in the bridge depends on
//! them being delivered.

use serde::{Deserialize, Serialize};

use crate::device::DeviceStatus;
use crate::id::{DeviceKey, EventId};
use crate::sensor::SensorReading;
use crate::time::{Timestamp, now};

/// Why a device status changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusSource {
    /// Reported by the device itself.
    Observed,
    /// Written on command issuance, before the device acknowledged.
    Optimistic,
}

/// Final outcome of a control request that wrote an optimistic status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlOutcome {
    Acked,
    TimedOut,
    /// The transport refused the command.
    Failed,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    SensorUpdated {
        reading: SensorReading,
    },
    DeviceUpdated {
        status: DeviceStatus,
        source: StatusSource,
    },
    ControlResolved {
        key: DeviceKey,
        outcome: ControlOutcome,
    },
}

/// A timestamped [`EventKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub at: Timestamp,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    /// Stamp a new event with a fresh id and the current time.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            id: EventId::new(),
            at: now(),
            kind,
        }
    }
}
