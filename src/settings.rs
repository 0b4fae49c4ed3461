// ═══════════════════════════════════════════════════════════════════════════════
//  Settings  (~/.config/ducky-panel/config.json)
// ═══════════════════════════════════════════════════════════════════════════════

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// The firmware's access point answers on this mDNS name.
pub const DEFAULT_DEVICE_URL: &str = "http://esp-ducky.local/";

pub fn config_dir() -> PathBuf {
    // When running via sudo, keep settings in the real user's home
    let home = std::env::var("SUDO_USER")
        .ok()
        .map(|u| format!("/home/{u}"))
        .or_else(|| std::env::var("HOME").ok())
        .unwrap_or_else(|| "/tmp".into());
    PathBuf::from(home).join(".config").join("ducky-panel")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

pub fn default_log_path() -> PathBuf {
    config_dir().join("ducky-panel.log")
}

/// The `theme` key of the same file belongs to the theme store.
#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
pub struct PanelSettings {
    #[serde(default)]
    pub device_url: Option<String>,
}

impl PanelSettings {
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => Ok(Self::default()),
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("malformed settings file {}", path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    /// Command line (or `DUCKY_PANEL_DEVICE`) wins over the file.
    pub fn device_url(&self, from_cli: Option<&str>) -> String {
        from_cli
            .map(str::to_string)
            .or_else(|| self.device_url.clone())
            .unwrap_or_else(|| DEFAULT_DEVICE_URL.to_string())
    }
}
