//! Topic patterns — the pluggable wire schema.
//!
//! A pattern is a `/`-separated list of segments. Each segment is either a
//! literal or one of the placeholders `{house}`, `{kind}` and `{id}`:
//!
//! ```text
//! house/{house}/sensor/{kind}/{id}      sensor, attribute from the topic
//! house/{house}/status/{kind}/{id}      device, kind from the topic
//! house/h1/status/door/7                exact topic, everything fixed
//! ```
//!
//! A [`TopicMapping`] pairs a pattern with a [`MappingTarget`] and fixed
//! values for any key part the pattern does not carry.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::device::DeviceKind;
use crate::error::RegistryError;
use crate::id::{DeviceId, HouseId, SensorId};
use crate::sensor::SensorAttribute;

const HOUSE: &str = "{house}";
const KIND: &str = "{kind}";
const ID: &str = "{id}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    House,
    Kind,
    Id,
}

/// A parsed topic pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPattern {
    raw: String,
    segments: Vec<Segment>,
}

/// Raw placeholder captures of a matched topic.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Captures<'t> {
    pub house: Option<&'t str>,
    pub kind: Option<&'t str>,
    pub id: Option<&'t str>,
}

impl TopicPattern {
    /// Parse a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidPattern`] for empty patterns, empty
    /// segments, MQTT wildcards, unknown or repeated placeholders.
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let invalid = |reason| RegistryError::InvalidPattern {
            pattern: raw.to_string(),
            reason,
        };
        if raw.is_empty() {
            return Err(invalid("pattern is empty"));
        }
        let mut segments = Vec::new();
        for part in raw.split('/') {
            let segment = match part {
                "" => return Err(invalid("empty segment")),
                HOUSE => Segment::House,
                KIND => Segment::Kind,
                ID => Segment::Id,
                "+" | "#" => return Err(invalid("wildcards are not patterns")),
                literal if literal.contains(['{', '}', '+', '#']) => {
                    return Err(invalid("unknown placeholder"));
                }
                literal => Segment::Literal(literal.to_string()),
            };
            if !matches!(segment, Segment::Literal(_)) && segments.contains(&segment) {
                return Err(invalid("placeholder used twice"));
            }
            segments.push(segment);
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of literal segments; more literals means a more specific
    /// pattern.
    #[must_use]
    pub fn specificity(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Whether the pattern has no placeholders at all.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.specificity() == self.segments.len()
    }

    fn has(&self, segment: &Segment) -> bool {
        self.segments.contains(segment)
    }

    /// Match a concrete topic, returning the placeholder captures.
    ///
    /// Placeholders only match non-empty segments; interpreting the
    /// captured text is left to the mapping.
    #[must_use]
    pub fn captures<'t>(&self, topic: &'t str) -> Option<Captures<'t>> {
        let mut captures = Captures::default();
        let mut parts = topic.split('/');
        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
                _ if part.is_empty() => return None,
                Segment::House => captures.house = Some(part),
                Segment::Kind => captures.kind = Some(part),
                Segment::Id => captures.id = Some(part),
            }
        }
        if parts.next().is_some() {
            return None;
        }
        Some(captures)
    }

    /// Render the pattern as an MQTT subscription filter (`+` for every
    /// placeholder).
    #[must_use]
    pub fn to_filter(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(literal) => literal.as_str(),
                _ => "+",
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Substitute placeholders to produce a concrete topic.
    #[must_use]
    pub fn render(&self, house: &HouseId, kind: &str, id: impl fmt::Display) -> String {
        let id = id.to_string();
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(literal) => literal.as_str(),
                Segment::House => house.as_str(),
                Segment::Kind => kind,
                Segment::Id => id.as_str(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// What a matched topic carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MappingTarget {
    /// A single sensor attribute; `None` reads it from the `{kind}` segment.
    Sensor { attribute: Option<SensorAttribute> },
    /// A device status; `None` reads the kind from the `{kind}` segment.
    Device { kind: Option<DeviceKind> },
    /// A JSON aggregate of sensor attributes.
    SensorBundle,
}

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMapping {
    pattern: TopicPattern,
    target: MappingTarget,
    house: Option<HouseId>,
    id: Option<u32>,
}

impl TopicMapping {
    /// Build a mapping, checking that every part of the key can be
    /// resolved either from a placeholder or from a fixed value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidPattern`] when the pattern does not
    /// parse or leaves a key part unresolvable.
    pub fn new(
        pattern: &str,
        target: MappingTarget,
        house: Option<HouseId>,
        id: Option<u32>,
    ) -> Result<Self, RegistryError> {
        let pattern = TopicPattern::parse(pattern)?;
        let invalid = |reason| RegistryError::InvalidPattern {
            pattern: pattern.as_str().to_string(),
            reason,
        };
        if house.is_none() && !pattern.has(&Segment::House) {
            return Err(invalid("no {house} placeholder and no fixed house"));
        }
        if id.is_none() && !pattern.has(&Segment::Id) {
            return Err(invalid("no {id} placeholder and no fixed id"));
        }
        let kind_from_topic = match target {
            MappingTarget::Sensor { attribute } => attribute.is_none(),
            MappingTarget::Device { kind } => kind.is_none(),
            MappingTarget::SensorBundle => false,
        };
        if kind_from_topic && !pattern.has(&Segment::Kind) {
            return Err(invalid("no {kind} placeholder and no fixed kind"));
        }
        Ok(Self {
            pattern,
            target,
            house,
            id,
        })
    }

    /// Exact mapping for one device's status topic.
    ///
    /// # Errors
    ///
    /// Same as [`TopicMapping::new`].
    pub fn device(
        topic: &str,
        house: HouseId,
        device: DeviceId,
        kind: DeviceKind,
    ) -> Result<Self, RegistryError> {
        Self::new(
            topic,
            MappingTarget::Device { kind: Some(kind) },
            Some(house),
            Some(device.get()),
        )
    }

    #[must_use]
    pub fn pattern(&self) -> &TopicPattern {
        &self.pattern
    }

    #[must_use]
    pub fn target(&self) -> MappingTarget {
        self.target
    }

    /// Classify `topic` against this mapping.
    ///
    /// A fixed house or id wins over a captured one. Returns `None` when the
    /// topic does not match or a captured segment does not parse.
    #[must_use]
    pub fn classify(&self, topic: &str) -> Option<Classification> {
        let captures = self.pattern.captures(topic)?;
        let house = match &self.house {
            Some(house) => house.clone(),
            None => HouseId::new(captures.house?).ok()?,
        };
        let id = match self.id {
            Some(id) => id,
            None => captures.id?.parse().ok()?,
        };
        let entity = match self.target {
            MappingTarget::Sensor { attribute } => ClassifiedEntity::Sensor {
                id: SensorId::new(id),
                attribute: match attribute {
                    Some(attribute) => attribute,
                    None => captures.kind?.parse().ok()?,
                },
            },
            MappingTarget::Device { kind } => ClassifiedEntity::Device {
                id: DeviceId::new(id),
                kind: match kind {
                    Some(kind) => kind,
                    None => captures.kind?.parse().ok()?,
                },
            },
            MappingTarget::SensorBundle => ClassifiedEntity::SensorBundle {
                id: SensorId::new(id),
            },
        };
        Some(Classification { house, entity })
    }
}

/// The logical meaning of a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub house: HouseId,
    pub entity: ClassifiedEntity,
}

/// Entity part of a [`Classification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifiedEntity {
    Sensor {
        id: SensorId,
        attribute: SensorAttribute,
    },
    Device {
        id: DeviceId,
        kind: DeviceKind,
    },
    SensorBundle {
        id: SensorId,
    },
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entity {
            ClassifiedEntity::Sensor { id, attribute } => {
                write!(f, "{}/sensor/{attribute}/{id}", self.house)
            }
            ClassifiedEntity::Device { id, kind } => write!(f, "{}/device/{kind}/{id}", self.house),
            ClassifiedEntity::SensorBundle { id } => write!(f, "{}/sensors/{id}", self.house),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn house(id: &str) -> HouseId {
        HouseId::new(id).unwrap()
    }

    fn sensor_mapping() -> TopicMapping {
        TopicMapping::new(
            "house/{house}/sensor/{kind}/{id}",
            MappingTarget::Sensor { attribute: None },
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn should_classify_sensor_topic_with_placeholders() {
        let classification = sensor_mapping()
            .classify("house/h1/sensor/temperature/3")
            .unwrap();
        assert_eq!(classification.house, house("h1"));
        assert_eq!(
            classification.entity,
            ClassifiedEntity::Sensor {
                id: SensorId::new(3),
                attribute: SensorAttribute::Temperature
            }
        );
    }

    #[test]
    fn should_not_classify_topic_with_extra_or_missing_segments() {
        let mapping = sensor_mapping();
        assert!(mapping.classify("house/h1/sensor/temperature").is_none());
        assert!(mapping.classify("house/h1/sensor/temperature/3/x").is_none());
        assert!(mapping.classify("house//sensor/temperature/3").is_none());
    }

    #[test]
    fn should_not_classify_unparsable_captures() {
        let mapping = sensor_mapping();
        assert!(mapping.classify("house/h1/sensor/pressure/3").is_none());
        assert!(mapping.classify("house/h1/sensor/light/abc").is_none());
    }

    #[test]
    fn should_use_fixed_house_and_id_for_legacy_topics() {
        let mapping = TopicMapping::new(
            "yolouno/sensor/temperature",
            MappingTarget::Sensor {
                attribute: Some(SensorAttribute::Temperature),
            },
            Some(house("default")),
            Some(1),
        )
        .unwrap();
        let classification = mapping.classify("yolouno/sensor/temperature").unwrap();
        assert_eq!(classification.house, house("default"));
        assert_eq!(
            classification.entity,
            ClassifiedEntity::Sensor {
                id: SensorId::new(1),
                attribute: SensorAttribute::Temperature
            }
        );
    }

    #[test]
    fn should_reject_mapping_that_cannot_resolve_house() {
        let result = TopicMapping::new(
            "status/{kind}/{id}",
            MappingTarget::Device { kind: None },
            None,
            None,
        );
        assert!(matches!(result, Err(RegistryError::InvalidPattern { .. })));
    }

    #[test]
    fn should_reject_mapping_that_cannot_resolve_kind() {
        let result = TopicMapping::new(
            "house/{house}/status/{id}",
            MappingTarget::Device { kind: None },
            None,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn should_reject_malformed_patterns() {
        assert!(TopicPattern::parse("").is_err());
        assert!(TopicPattern::parse("a//b").is_err());
        assert!(TopicPattern::parse("a/+/b").is_err());
        assert!(TopicPattern::parse("a/{room}/b").is_err());
        assert!(TopicPattern::parse("{id}/x/{id}").is_err());
    }

    #[test]
    fn should_render_subscription_filter() {
        let pattern = TopicPattern::parse("house/{house}/status/{kind}/{id}").unwrap();
        assert_eq!(pattern.to_filter(), "house/+/status/+/+");
        assert_eq!(pattern.specificity(), 2);
        assert!(!pattern.is_exact());
    }

    #[test]
    fn should_render_concrete_topic() {
        let pattern = TopicPattern::parse("house/{house}/control/{kind}/{id}").unwrap();
        assert_eq!(
            pattern.render(&house("h1"), "door", DeviceId::new(7)),
            "house/h1/control/door/7"
        );
    }

    #[test]
    fn should_build_exact_device_mapping() {
        let mapping = TopicMapping::device(
            "garage/door/state",
            house("h2"),
            DeviceId::new(9),
            DeviceKind::Door,
        )
        .unwrap();
        assert!(mapping.pattern().is_exact());
        let classification = mapping.classify("garage/door/state").unwrap();
        assert_eq!(
            classification.entity,
            ClassifiedEntity::Device {
                id: DeviceId::new(9),
                kind: DeviceKind::Door
            }
        );
        assert_eq!(classification.to_string(), "h2/device/door/9");
    }
}
