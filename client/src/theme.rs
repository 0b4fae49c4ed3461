use serde_json::{Map, Value};
use shared::ThemePreference;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

const THEME_KEY: &str = "theme";

#[derive(Debug, Error)]
pub enum ThemeStoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed preferences in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Synchronous key-value storage for the theme preference.
pub trait ThemeStore {
    /// `None` means no preference has been stored yet.
    fn load(&self) -> Result<Option<ThemePreference>, ThemeStoreError>;

    fn store(&self, preference: ThemePreference) -> Result<(), ThemeStoreError>;
}

/// Keeps the preference under the `theme` key of a JSON settings file and
/// leaves every other key of that file untouched.
#[derive(Debug, Clone)]
pub struct JsonFileThemeStore {
    path: PathBuf,
}

impl JsonFileThemeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Map<String, Value>, ThemeStoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(ThemeStoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&content).map_err(|source| ThemeStoreError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    fn io_error(&self, source: io::Error) -> ThemeStoreError {
        ThemeStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ThemeStore for JsonFileThemeStore {
    fn load(&self) -> Result<Option<ThemePreference>, ThemeStoreError> {
        let document = self.read_document()?;
        // Unknown values are treated like an absent preference.
        Ok(document
            .get(THEME_KEY)
            .and_then(Value::as_str)
            .and_then(|value| value.parse().ok()))
    }

    fn store(&self, preference: ThemePreference) -> Result<(), ThemeStoreError> {
        let mut document = self.read_document()?;
        document.insert(THEME_KEY.to_string(), Value::from(preference.as_str()));

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|err| self.io_error(err))?;
        }
        let json = serde_json::to_string_pretty(&document).map_err(|source| ThemeStoreError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(|err| self.io_error(err))
    }
}

/// In-memory store that also counts writes.
#[derive(Debug, Default)]
pub struct MemoryThemeStore {
    value: Mutex<Option<ThemePreference>>,
    writes: Mutex<usize>,
}

impl MemoryThemeStore {
    pub fn new(initial: Option<ThemePreference>) -> Self {
        Self {
            value: Mutex::new(initial),
            writes: Mutex::new(0),
        }
    }

    pub fn current(&self) -> Option<ThemePreference> {
        self.value.lock().map(|guard| *guard).unwrap_or(None)
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|guard| *guard).unwrap_or(0)
    }
}

impl ThemeStore for MemoryThemeStore {
    fn load(&self) -> Result<Option<ThemePreference>, ThemeStoreError> {
        Ok(self.current())
    }

    fn store(&self, preference: ThemePreference) -> Result<(), ThemeStoreError> {
        if let Ok(mut value) = self.value.lock() {
            *value = Some(preference);
        }
        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(())
    }
}
