//! Topic schema registry — bidirectional topic ⇄ entity mapping.
//!
//! Inbound, [`TopicRegistry::classify`] maps a concrete topic to a
//! [`Classification`]. Outbound, [`TopicRegistry::command_topic`] renders the
//! topic a control command is published on. Mappings are add-only.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use housebridge_domain::device::DeviceKind;
use housebridge_domain::error::RegistryError;
use housebridge_domain::id::DeviceKey;
use housebridge_domain::topic::{Classification, MappingTarget, TopicMapping, TopicPattern};

/// Default per-attribute sensor topics.
pub const DEFAULT_SENSOR_PATTERN: &str = "house/{house}/sensor/{kind}/{id}";
/// Default device status topics.
pub const DEFAULT_STATUS_PATTERN: &str = "house/{house}/status/{kind}/{id}";
/// Default aggregate JSON sensor topics.
pub const DEFAULT_BUNDLE_PATTERN: &str = "house/{house}/sensors/{id}";
/// Default device command topics.
pub const DEFAULT_CONTROL_TEMPLATE: &str = "house/{house}/control/{kind}/{id}";

/// Topics a newly provisioned device talks on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTopics {
    /// Exact topic the device publishes its status on.
    pub status: String,
    /// Topic commands are published on; `None` keeps the default template.
    pub control: Option<String>,
}

struct Inner {
    /// In registration order; ties in specificity go to the earliest entry.
    mappings: Vec<TopicMapping>,
    /// Pattern text → index into `mappings`, for uniqueness and exact lookup.
    by_pattern: HashMap<String, usize>,
    control_template: TopicPattern,
    control_overrides: HashMap<DeviceKey, TopicPattern>,
}

impl Inner {
    fn insert(&mut self, mapping: TopicMapping) -> Result<(), RegistryError> {
        let raw = mapping.pattern().as_str().to_string();
        if self.by_pattern.contains_key(&raw) {
            return Err(RegistryError::DuplicatePattern(raw));
        }
        self.by_pattern.insert(raw, self.mappings.len());
        self.mappings.push(mapping);
        Ok(())
    }
}

/// Thread-safe registry of [`TopicMapping`]s.
///
/// Classification takes a read lock; registration is the only writer.
pub struct TopicRegistry {
    inner: RwLock<Inner>,
}

impl TopicRegistry {
    /// An empty registry publishing commands through `control_template`.
    #[must_use]
    pub fn new(control_template: TopicPattern) -> Self {
        Self {
            inner: RwLock::new(Inner {
                mappings: Vec::new(),
                by_pattern: HashMap::new(),
                control_template,
                control_overrides: HashMap::new(),
            }),
        }
    }

    /// A registry preloaded with the default `house/{house}/…` schema and
    /// the default command template.
    ///
    /// # Errors
    ///
    /// Only if the built-in schema fails to parse.
    pub fn with_defaults() -> Result<Self, RegistryError> {
        Self::with_default_schema(TopicPattern::parse(DEFAULT_CONTROL_TEMPLATE)?)
    }

    /// A registry preloaded with the default schema, publishing commands
    /// through a custom template.
    ///
    /// # Errors
    ///
    /// Only if the built-in schema fails to parse.
    pub fn with_default_schema(control_template: TopicPattern) -> Result<Self, RegistryError> {
        let registry = Self::new(control_template);
        for mapping in default_mappings()? {
            registry.register(mapping)?;
        }
        Ok(registry)
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a mapping.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePattern`] if the pattern text is
    /// already registered; the existing mapping is left untouched.
    pub fn register(&self, mapping: TopicMapping) -> Result<(), RegistryError> {
        let pattern = mapping.pattern().to_string();
        self.write().insert(mapping)?;
        tracing::debug!(%pattern, "topic mapping registered");
        Ok(())
    }

    /// Register a provisioned device: a status mapping with fixed house, id
    /// and kind plus, when given, a command topic override. Both or neither
    /// are applied. Placeholders in the status topic only widen what it
    /// matches.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePattern`] if the status topic is
    /// already mapped, or [`RegistryError::InvalidPattern`] if either topic
    /// does not parse.
    pub fn register_device(
        &self,
        key: &DeviceKey,
        kind: DeviceKind,
        topics: &DeviceTopics,
    ) -> Result<(), RegistryError> {
        let mapping = TopicMapping::device(&topics.status, key.house.clone(), key.device, kind)?;
        let control = topics
            .control
            .as_deref()
            .map(TopicPattern::parse)
            .transpose()?;

        let mut inner = self.write();
        inner.insert(mapping)?;
        if let Some(control) = control {
            inner.control_overrides.insert(key.clone(), control);
        }
        drop(inner);

        tracing::info!(device = %key, %kind, status_topic = %topics.status, "device registered");
        Ok(())
    }

    /// Classify a concrete topic.
    ///
    /// Exact patterns are looked up directly; otherwise the matching mapping
    /// with the most literal segments wins, earliest registration first.
    #[must_use]
    pub fn classify(&self, topic: &str) -> Option<Classification> {
        let inner = self.read();
        if let Some(classification) = inner
            .by_pattern
            .get(topic)
            .and_then(|idx| inner.mappings[*idx].classify(topic))
        {
            return Some(classification);
        }

        let mut best: Option<(usize, Classification)> = None;
        for mapping in &inner.mappings {
            let specificity = mapping.pattern().specificity();
            if best.as_ref().is_some_and(|(s, _)| *s >= specificity) {
                continue;
            }
            if let Some(classification) = mapping.classify(topic) {
                best = Some((specificity, classification));
            }
        }
        best.map(|(_, classification)| classification)
    }

    /// Topic a command for `key` is published on.
    #[must_use]
    pub fn command_topic(&self, key: &DeviceKey, kind: DeviceKind) -> String {
        let inner = self.read();
        let template = inner
            .control_overrides
            .get(key)
            .unwrap_or(&inner.control_template);
        template.render(&key.house, &kind.to_string(), key.device)
    }

    /// Every registered pattern as a subscription filter, deduplicated.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.read()
            .mappings
            .iter()
            .map(|mapping| mapping.pattern().to_filter())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of registered mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().mappings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn default_mappings() -> Result<Vec<TopicMapping>, RegistryError> {
    [
        (
            DEFAULT_SENSOR_PATTERN,
            MappingTarget::Sensor { attribute: None },
        ),
        (DEFAULT_STATUS_PATTERN, MappingTarget::Device { kind: None }),
        (DEFAULT_BUNDLE_PATTERN, MappingTarget::SensorBundle),
    ]
    .into_iter()
    .map(|(pattern, target)| TopicMapping::new(pattern, target, None, None))
    .collect()
}
