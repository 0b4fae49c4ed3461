//! Device client for the ducky control panel.
//!
//! [`gateway`] talks HTTP to the device's `script` and `config` resources,
//! [`controller`] keeps panel state in step with it, and [`theme`] persists
//! the local light/dark preference.

pub mod controller;
pub mod error;
pub mod gateway;
pub mod theme;

pub use controller::{Diagnostic, Operation, Outcome, PanelSink, SyncController};
pub use error::{GatewayError, GatewayErrorKind};
pub use gateway::{DeviceGateway, HttpGateway};
pub use theme::{JsonFileThemeStore, MemoryThemeStore, ThemeStore, ThemeStoreError};

pub use shared::{ArmingState, DeviceConfig, Script, ScriptAction, ThemePreference, UsbDeviceType};
