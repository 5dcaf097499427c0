//! Devices — controllable actuators (doors, fans, rgb lamps, alarms).
//!
//! This module owns the textual wire vocabulary of every device kind:
//! parsing status payloads into [`StatusPatch`]es and encoding
//! [`ControlAction`]s into command payloads. Both directions match
//! exhaustively on [`DeviceKind`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, PayloadError, ValidationError};
use crate::id::{DeviceId, DeviceKey, HouseId};
use crate::time::Timestamp;

/// Kind of controllable device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Door,
    Fan,
    Rgb,
    Alarm,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Door => f.write_str("door"),
            Self::Fan => f.write_str("fan"),
            Self::Rgb => f.write_str("rgb"),
            Self::Alarm => f.write_str("alarm"),
        }
    }
}

impl FromStr for DeviceKind {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "door" => Ok(Self::Door),
            "fan" => Ok(Self::Fan),
            "rgb" => Ok(Self::Rgb),
            "alarm" => Ok(Self::Alarm),
            other => Err(ControlError::UnsupportedType(other.to_string())),
        }
    }
}

/// An rgb colour, written `r,g,b` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// All channels off.
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// Colour used when an rgb lamp is simply turned on.
    pub const DEFAULT_ON: Self = Self::new(0, 255, 0);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Whether any channel is lit.
    #[must_use]
    pub fn is_lit(self) -> bool {
        self != Self::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidColor(s.to_string());
        let mut parts = s.split(',').map(|part| part.trim().parse::<u8>());
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(r)), Some(Ok(g)), Some(Ok(b)), None) => Ok(Self::new(r, g, b)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// A four-digit door unlock code.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnlockCode(String);

impl UnlockCode {
    /// Validate a code.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidUnlockCode`] unless `code` is
    /// exactly four ASCII digits.
    pub fn new(code: impl Into<String>) -> Result<Self, ValidationError> {
        let code = code.into();
        if code.len() == 4 && code.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(code))
        } else {
            Err(ValidationError::InvalidUnlockCode)
        }
    }
}

// Never print the code itself.
impl fmt::Debug for UnlockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UnlockCode(****)")
    }
}

impl TryFrom<String> for UnlockCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UnlockCode> for String {
    fn from(code: UnlockCode) -> Self {
        code.0
    }
}

/// Last-known status of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub house_id: HouseId,
    pub device_id: DeviceId,
    pub kind: DeviceKind,
    /// Door: open. Fan/alarm: running. Rgb: lit.
    pub on: bool,
    /// Only meaningful for doors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    /// Only meaningful for rgb lamps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    pub observed_at: Timestamp,
}

impl DeviceStatus {
    /// Entity key of this status.
    #[must_use]
    pub fn key(&self) -> DeviceKey {
        DeviceKey::new(self.house_id.clone(), self.device_id)
    }

    /// A status for a device that has not reported anything yet, used as
    /// the base the first patch is applied to. Never stored on its own.
    #[must_use]
    pub fn blank(key: &DeviceKey, kind: DeviceKind, at: Timestamp) -> Self {
        Self {
            house_id: key.house.clone(),
            device_id: key.device,
            kind,
            on: false,
            locked: (kind == DeviceKind::Door).then_some(false),
            color: None,
            observed_at: at,
        }
    }

    /// Apply a partial update. Fields absent from the patch keep their
    /// prior values; fields that do not apply to `kind` are cleared.
    pub fn apply(&mut self, kind: DeviceKind, patch: &StatusPatch, at: Timestamp) {
        self.kind = kind;
        if let Some(on) = patch.on {
            self.on = on;
        }
        if let Some(locked) = patch.locked {
            self.locked = Some(locked);
        }
        if let Some(color) = patch.color {
            self.color = Some(color);
        }
        if kind != DeviceKind::Door {
            self.locked = None;
        }
        if kind != DeviceKind::Rgb {
            self.color = None;
        }
        self.observed_at = at;
    }

    /// Whether this status already is what `action` asks for.
    #[must_use]
    pub fn satisfies(&self, action: &ControlAction) -> bool {
        match action {
            ControlAction::Open => self.on,
            ControlAction::Close => !self.on,
            ControlAction::Unlock(_) => self.locked == Some(false),
            ControlAction::TurnOn => match self.kind {
                DeviceKind::Rgb => self.on && self.color.is_some_and(Color::is_lit),
                _ => self.on,
            },
            ControlAction::TurnOff => !self.on,
            ControlAction::SetColor(color) => self.color == Some(*color),
        }
    }
}

/// The fields of a [`DeviceStatus`] carried by one status message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusPatch {
    pub on: Option<bool>,
    pub locked: Option<bool>,
    pub color: Option<Color>,
}

/// Parse a status payload using the vocabulary of `kind`.
///
/// Keywords are matched case-insensitively after trimming whitespace.
///
/// | Kind | Payload | Patch |
/// |------|---------|-------|
/// | door | `OPEN` | on, unlocked |
/// | door | `CLOSE` | off, unlocked |
/// | door | `LOCKED` | off, locked |
/// | fan, alarm | `ON` / `OFF` | on / off |
/// | rgb | `r,g,b` | colour, on unless `0,0,0` |
///
/// # Errors
///
/// Returns [`PayloadError::UnknownStatus`] for anything else.
pub fn parse_status(kind: DeviceKind, payload: &str) -> Result<StatusPatch, PayloadError> {
    let text = payload.trim();
    let keyword = text.to_ascii_uppercase();
    let patch = match (kind, keyword.as_str()) {
        (DeviceKind::Door, "OPEN") => Some(StatusPatch {
            on: Some(true),
            locked: Some(false),
            color: None,
        }),
        (DeviceKind::Door, "CLOSE" | "CLOSED") => Some(StatusPatch {
            on: Some(false),
            locked: Some(false),
            color: None,
        }),
        (DeviceKind::Door, "LOCKED") => Some(StatusPatch {
            on: Some(false),
            locked: Some(true),
            color: None,
        }),
        (DeviceKind::Fan | DeviceKind::Alarm, "ON") => Some(StatusPatch {
            on: Some(true),
            ..StatusPatch::default()
        }),
        (DeviceKind::Fan | DeviceKind::Alarm, "OFF") => Some(StatusPatch {
            on: Some(false),
            ..StatusPatch::default()
        }),
        (DeviceKind::Rgb, _) => text.parse::<Color>().ok().map(|color| StatusPatch {
            on: Some(color.is_lit()),
            locked: None,
            color: Some(color),
        }),
        _ => None,
    };
    patch.ok_or_else(|| PayloadError::UnknownStatus {
        kind,
        payload: text.to_string(),
    })
}

/// A state change requested by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum ControlAction {
    /// Open a door.
    Open,
    /// Close a door.
    Close,
    /// Unlock a door with its code.
    Unlock(UnlockCode),
    /// Switch a fan, alarm or rgb lamp on.
    TurnOn,
    /// Switch a fan, alarm or rgb lamp off.
    TurnOff,
    /// Set an rgb lamp to a colour.
    SetColor(Color),
}

impl ControlAction {
    /// Short name used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Unlock(_) => "unlock",
            Self::TurnOn => "turn_on",
            Self::TurnOff => "turn_off",
            Self::SetColor(_) => "set_color",
        }
    }

    /// Build an action from its request form: a name plus the optional
    /// `code` and `color` arguments. `on`/`off` and `color` are accepted as
    /// short names.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for an unknown name, a missing argument,
    /// or an argument that does not parse.
    pub fn from_parts(
        action: &str,
        code: Option<&str>,
        color: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let action = action.trim().to_ascii_lowercase();
        match action.as_str() {
            "open" => Ok(Self::Open),
            "close" => Ok(Self::Close),
            "unlock" => {
                let code = code.ok_or(ValidationError::MissingArgument {
                    action: "unlock",
                    field: "code",
                })?;
                Ok(Self::Unlock(UnlockCode::new(code)?))
            }
            "on" | "turn_on" => Ok(Self::TurnOn),
            "off" | "turn_off" => Ok(Self::TurnOff),
            "color" | "set_color" => {
                let color = color.ok_or(ValidationError::MissingArgument {
                    action: "set_color",
                    field: "color",
                })?;
                Ok(Self::SetColor(color.parse()?))
            }
            _ => Err(ValidationError::UnknownAction(action)),
        }
    }

    /// Encode the command payload sent to a `kind` device.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::UnsupportedAction`] when `kind` cannot
    /// perform this action.
    pub fn encode(&self, kind: DeviceKind) -> Result<String, ControlError> {
        let payload = match (kind, self) {
            (DeviceKind::Door, Self::Open) => "OPEN".to_string(),
            (DeviceKind::Door, Self::Close) => "CLOSE".to_string(),
            (DeviceKind::Door, Self::Unlock(code)) => code.0.clone(),
            (DeviceKind::Fan | DeviceKind::Alarm, Self::TurnOn) => "ON".to_string(),
            (DeviceKind::Fan | DeviceKind::Alarm, Self::TurnOff) => "OFF".to_string(),
            (DeviceKind::Rgb, Self::TurnOn) => Color::DEFAULT_ON.to_string(),
            (DeviceKind::Rgb, Self::TurnOff) => Color::BLACK.to_string(),
            (DeviceKind::Rgb, Self::SetColor(color)) => color.to_string(),
            _ => {
                return Err(ControlError::UnsupportedAction {
                    kind,
                    action: self.name(),
                });
            }
        };
        Ok(payload)
    }

    /// The status fields this action is expected to produce once the
    /// device has carried it out.
    #[must_use]
    pub fn expected_patch(&self, kind: DeviceKind) -> StatusPatch {
        match (kind, self) {
            (_, Self::Open) => StatusPatch {
                on: Some(true),
                locked: Some(false),
                color: None,
            },
            (_, Self::Close) => StatusPatch {
                on: Some(false),
                ..StatusPatch::default()
            },
            (_, Self::Unlock(_)) => StatusPatch {
                locked: Some(false),
                ..StatusPatch::default()
            },
            (DeviceKind::Rgb, Self::TurnOn) => StatusPatch {
                on: Some(true),
                locked: None,
                color: Some(Color::DEFAULT_ON),
            },
            (DeviceKind::Rgb, Self::TurnOff) => StatusPatch {
                on: Some(false),
                locked: None,
                color: Some(Color::BLACK),
            },
            (_, Self::TurnOn) => StatusPatch {
                on: Some(true),
                ..StatusPatch::default()
            },
            (_, Self::TurnOff) => StatusPatch {
                on: Some(false),
                ..StatusPatch::default()
            },
            (_, Self::SetColor(color)) => StatusPatch {
                on: Some(color.is_lit()),
                locked: None,
                color: Some(*color),
            },
        }
    }
}
