//! Common error types used across the workspace.
//!
//! Each concern has its own typed error; [`BridgeError`] gathers them for
//! the service facade and the HTTP boundary.

use std::time::Duration;

use crate::device::DeviceKind;
use crate::id::DeviceKey;

/// Boxed error coming from an adapter, kept opaque at the port boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error returned by the bridge facade.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// An input did not satisfy a domain invariant.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The requested key has never been observed.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A control request failed.
    #[error("control error")]
    Control(#[from] ControlError),

    /// The topic registry rejected a registration.
    #[error("registry error")]
    Registry(#[from] RegistryError),

    /// The transport failed outside of a control request.
    #[error("transport error")]
    Transport(#[from] TransportError),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A house id must not be empty.
    #[error("house id must not be empty")]
    EmptyHouseId,

    /// A house id must fit into a single topic segment.
    #[error("house id {0:?} contains a reserved topic character")]
    ReservedCharacter(String),

    /// An unlock code must be exactly four ASCII digits.
    #[error("unlock code must be exactly four digits")]
    InvalidUnlockCode,

    /// A colour must be written as `r,g,b` with components in `0..=255`.
    #[error("invalid colour {0:?}, expected r,g,b")]
    InvalidColor(String),

    /// A control timeout must be strictly positive.
    #[error("control timeout must be greater than zero")]
    ZeroTimeout,

    /// A control action name is not in the vocabulary.
    #[error("unknown control action {0:?}")]
    UnknownAction(String),

    /// A control action needs an argument that was not given.
    #[error("action {action} requires {field}")]
    MissingArgument {
        action: &'static str,
        field: &'static str,
    },
}

/// A lookup for something that has never been observed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Kind of thing that was looked up (e.g. `"Sensor"`).
    pub entity: &'static str,
    /// Printable key of the missing thing.
    pub id: String,
}

/// Failures returned to the caller of a control request.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// The device type is not one the bridge can drive.
    #[error("unsupported device type {0:?}")]
    UnsupportedType(String),

    /// The device type cannot perform the requested action.
    #[error("action {action} is not supported by {kind} devices")]
    UnsupportedAction {
        /// Device type the action was sent to.
        kind: DeviceKind,
        /// Name of the rejected action.
        action: &'static str,
    },

    /// The transport is not connected to the broker.
    #[error("transport not connected")]
    NotConnected,

    /// Another control operation holds the device slot.
    #[error("another control operation is in progress for {0}")]
    Busy(DeviceKey),

    /// The command was published but no status arrived before the deadline.
    #[error("{key} did not acknowledge within {timeout:?}")]
    Timeout {
        /// Device that was controlled.
        key: DeviceKey,
        /// Deadline that expired.
        timeout: Duration,
    },

    /// The transport refused to publish the command.
    #[error("failed to publish control command")]
    Publish(#[source] BoxError),
}

impl From<TransportError> for ControlError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotConnected => Self::NotConnected,
            TransportError::Rejected(source) => Self::Publish(source),
        }
    }
}

/// Topic registry failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The pattern is already registered.
    #[error("topic pattern {0:?} is already registered")]
    DuplicatePattern(String),

    /// The pattern cannot be parsed or cannot resolve every key part.
    #[error("invalid topic pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// Offending pattern text.
        pattern: String,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// A malformed inbound payload. Never surfaced to a control caller.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// The payload is not valid UTF-8.
    #[error("payload is not valid UTF-8")]
    NotUtf8,

    /// A sensor payload is not a finite number.
    #[error("sensor payload {0:?} is not a finite number")]
    NotANumber(String),

    /// A status payload is outside the device kind's vocabulary.
    #[error("unexpected {kind} status {payload:?}")]
    UnknownStatus {
        /// Device type whose vocabulary was used.
        kind: DeviceKind,
        /// Received payload.
        payload: String,
    },

    /// A sensor bundle is not a JSON object of numbers.
    #[error("invalid sensor bundle")]
    InvalidBundle(#[source] serde_json::Error),
}

/// Errors produced by a transport adapter.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The adapter has no live broker connection.
    #[error("transport not connected")]
    NotConnected,

    /// The underlying client rejected the operation.
    #[error("transport rejected the operation")]
    Rejected(#[source] BoxError),
}
