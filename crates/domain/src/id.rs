//! Typed identifiers.
//!
//! Houses are named by the CRUD layer (free-form strings), sensors and
//! devices by the numeric ids the hardware publishes under. Event ids are
//! random UUIDs generated by the bridge.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Characters that would break a house id out of its topic segment.
const RESERVED: [char; 3] = ['/', '+', '#'];

/// Identifier of a house. Must fit into a single topic segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HouseId(String);

impl HouseId {
    /// Validate and wrap a house id.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyHouseId`] for an empty string and
    /// [`ValidationError::ReservedCharacter`] when it contains `/`, `+` or `#`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::EmptyHouseId);
        }
        if value.contains(RESERVED) {
            return Err(ValidationError::ReservedCharacter(value));
        }
        Ok(Self(value))
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HouseId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HouseId> for String {
    fn from(id: HouseId) -> Self {
        id.0
    }
}

impl FromStr for HouseId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for HouseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! define_numeric_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Wrap a raw hardware id.
            #[must_use]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Access the raw hardware id.
            #[must_use]
            pub const fn get(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

define_numeric_id!(
    /// Hardware id of a sensor within a house.
    SensorId
);

define_numeric_id!(
    /// Hardware id of a controllable device within a house.
    DeviceId
);

/// Unique identifier for an [`Event`](crate::event::Event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(uuid::Uuid);

impl Default for EventId {
    fn default() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl EventId {
    /// Generate a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

macro_rules! define_key {
    ($(#[doc = $doc:expr])* $name:ident, $field:ident: $id:ty) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name {
            /// House the entity lives in.
            pub house: HouseId,
            /// Hardware id within the house.
            pub $field: $id,
        }

        impl $name {
            /// Build a key from its parts.
            #[must_use]
            pub fn new(house: HouseId, $field: $id) -> Self {
                Self { house, $field }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}/{}", self.house, self.$field)
            }
        }
    };
}

define_key!(
    /// Entity key of a sensor: `(house, sensor_id)`.
    SensorKey, sensor: SensorId
);

define_key!(
    /// Entity key of a device: `(house, device_id)`.
    DeviceKey, device: DeviceId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_plain_house_id() {
        let id = HouseId::new("house1").unwrap();
        assert_eq!(id.as_str(), "house1");
    }

    #[test]
    fn should_reject_empty_house_id() {
        assert_eq!(HouseId::new(""), Err(ValidationError::EmptyHouseId));
    }

    #[test]
    fn should_reject_house_id_with_topic_separator() {
        assert!(matches!(
            HouseId::new("a/b"),
            Err(ValidationError::ReservedCharacter(_))
        ));
        assert!(HouseId::new("a+").is_err());
        assert!(HouseId::new("#").is_err());
    }

    #[test]
    fn should_reject_invalid_house_id_when_deserializing() {
        let result: Result<HouseId, _> = serde_json::from_str("\"a/b\"");
        assert!(result.is_err());
    }

    #[test]
    fn should_serialize_numeric_ids_transparently() {
        let json = serde_json::to_string(&DeviceId::new(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn should_parse_numeric_id_from_topic_segment() {
        assert_eq!("14".parse::<DeviceId>().unwrap(), DeviceId::new(14));
        assert!("abc".parse::<SensorId>().is_err());
        assert!("-1".parse::<SensorId>().is_err());
    }

    #[test]
    fn should_display_key_as_house_slash_id() {
        let key = DeviceKey::new(HouseId::new("h1").unwrap(), DeviceId::new(7));
        assert_eq!(key.to_string(), "h1/7");
    }

    #[test]
    fn should_generate_unique_event_ids() {
        assert_ne!(EventId::new(), EventId::new());
    }
}
