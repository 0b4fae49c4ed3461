use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ==========================================
// SCRIPT
// ==========================================

/// Opaque keystroke-injection script text. Never trimmed or rewritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script(String);

impl Script {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for Script {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for Script {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the device does with a submitted script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ScriptAction {
    Run,
    Save,
}

impl From<ScriptAction> for u8 {
    fn from(action: ScriptAction) -> Self {
        match action {
            ScriptAction::Run => 0,
            ScriptAction::Save => 1,
        }
    }
}

impl TryFrom<u8> for ScriptAction {
    type Error = UnknownCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Run),
            1 => Ok(Self::Save),
            _ => Err(UnknownCode::new("script action", code)),
        }
    }
}

// ==========================================
// DEVICE CONFIGURATION
// ==========================================

/// Whether the device replays its stored script when plugged in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ArmingState {
    #[default]
    Unarmed,
    /// Run once at the next boot, then fall back to `Unarmed`.
    SingleRun,
    Persistent,
}

impl ArmingState {
    pub const ALL: [ArmingState; 3] = [Self::Unarmed, Self::SingleRun, Self::Persistent];

    pub fn label(self) -> &'static str {
        match self {
            Self::Unarmed => "Unarmed",
            Self::SingleRun => "Single run",
            Self::Persistent => "Persistent",
        }
    }
}

impl From<ArmingState> for u8 {
    fn from(state: ArmingState) -> Self {
        match state {
            ArmingState::Unarmed => 0,
            ArmingState::SingleRun => 1,
            ArmingState::Persistent => 2,
        }
    }
}

impl TryFrom<u8> for ArmingState {
    type Error = UnknownCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Unarmed),
            1 => Ok(Self::SingleRun),
            2 => Ok(Self::Persistent),
            _ => Err(UnknownCode::new("arming state", code)),
        }
    }
}

/// USB device class the device emulates towards its host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum UsbDeviceType {
    SerialJtag,
    #[default]
    Hid,
    Msd,
    HidMsd,
}

impl UsbDeviceType {
    pub const ALL: [UsbDeviceType; 4] = [Self::SerialJtag, Self::Hid, Self::Msd, Self::HidMsd];

    pub fn label(self) -> &'static str {
        match self {
            Self::SerialJtag => "Serial JTAG",
            Self::Hid => "HID keyboard",
            Self::Msd => "Mass storage",
            Self::HidMsd => "HID + mass storage",
        }
    }
}

impl From<UsbDeviceType> for u8 {
    fn from(kind: UsbDeviceType) -> Self {
        match kind {
            UsbDeviceType::SerialJtag => 0,
            UsbDeviceType::Hid => 1,
            UsbDeviceType::Msd => 2,
            UsbDeviceType::HidMsd => 3,
        }
    }
}

impl TryFrom<u8> for UsbDeviceType {
    type Error = UnknownCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::SerialJtag),
            1 => Ok(Self::Hid),
            2 => Ok(Self::Msd),
            3 => Ok(Self::HidMsd),
            _ => Err(UnknownCode::new("USB device type", code)),
        }
    }
}

/// Parses either the wire code (`"2"`) or a variant name (`"persistent"`).
fn parse_coded<T>(input: &str, names: &[(&str, T)], what: &'static str) -> Result<T, ParseCodeError>
where
    T: TryFrom<u8, Error = UnknownCode> + Copy,
{
    let trimmed = input.trim();
    if let Ok(code) = trimmed.parse::<u8>() {
        return T::try_from(code).map_err(ParseCodeError::Unknown);
    }

    let wanted = trimmed.to_ascii_lowercase().replace(['-', '_', ' '], "");
    names
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|(_, value)| *value)
        .ok_or_else(|| ParseCodeError::Unrecognized {
            what,
            input: input.to_string(),
        })
}

impl FromStr for ArmingState {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_coded(
            s,
            &[
                ("unarmed", Self::Unarmed),
                ("singlerun", Self::SingleRun),
                ("single", Self::SingleRun),
                ("persistent", Self::Persistent),
            ],
            "arming state",
        )
    }
}

impl FromStr for UsbDeviceType {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_coded(
            s,
            &[
                ("serialjtag", Self::SerialJtag),
                ("jtag", Self::SerialJtag),
                ("hid", Self::Hid),
                ("msd", Self::Msd),
                ("hidmsd", Self::HidMsd),
            ],
            "USB device type",
        )
    }
}

impl fmt::Display for ArmingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), u8::from(*self))
    }
}

impl fmt::Display for UsbDeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), u8::from(*self))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub arming_state: ArmingState,
    pub usb_device_type: UsbDeviceType,
}

// ==========================================
// WIRE BODIES (Panel <-> Device)
// ==========================================

/// Body of `GET /script`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPayload {
    pub script: Script,
}

/// Body of `POST /script`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRequest {
    pub script: Script,
    pub action: ScriptAction,
}

// ==========================================
// LOCAL PREFERENCES
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    Dark,
}

impl ThemePreference {
    pub fn from_dark(dark: bool) -> Self {
        if dark { Self::Dark } else { Self::Light }
    }

    pub fn is_dark(self) -> bool {
        matches!(self, Self::Dark)
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl FromStr for ThemePreference {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(ParseCodeError::Unrecognized {
                what: "theme",
                input: other.to_string(),
            }),
        }
    }
}

// ==========================================
// ERRORS
// ==========================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {what} code {code}")]
pub struct UnknownCode {
    pub what: &'static str,
    pub code: u8,
}

impl UnknownCode {
    fn new(what: &'static str, code: u8) -> Self {
        Self { what, code }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCodeError {
    #[error(transparent)]
    Unknown(#[from] UnknownCode),
    #[error("unrecognized {what} '{input}'")]
    Unrecognized { what: &'static str, input: String },
}
