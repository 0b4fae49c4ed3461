use log::{error, info, warn};
use shared::{ArmingState, DeviceConfig, Script, ScriptAction, ThemePreference, UsbDeviceType};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::error::GatewayError;
use crate::gateway::DeviceGateway;
use crate::theme::ThemeStore;

// ==========================================
// PRESENTATION INTERFACE
// ==========================================

/// Receives every value the controller publishes for display.
///
/// Implementations are called from spawned tasks, so they must not assume
/// they run on the UI thread.
pub trait PanelSink: Send + Sync + 'static {
    fn script_text(&self, text: &str);
    fn arming_state(&self, state: ArmingState);
    fn usb_device_type(&self, kind: UsbDeviceType);
    fn dark_theme(&self, dark: bool);
    fn diagnostic(&self, diagnostic: Diagnostic);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    LoadScript,
    RunScript,
    SaveScript,
    LoadConfig,
    SaveConfig,
    StoreTheme,
}

impl Operation {
    fn for_action(action: ScriptAction) -> Self {
        match action {
            ScriptAction::Run => Self::RunScript,
            ScriptAction::Save => Self::SaveScript,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LoadScript => "Load script",
            Self::RunScript => "Run script",
            Self::SaveScript => "Save script",
            Self::LoadConfig => "Load config",
            Self::SaveConfig => "Save config",
            Self::StoreTheme => "Store theme",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub operation: Operation,
    pub outcome: Outcome,
}

impl Diagnostic {
    pub fn completed(operation: Operation, detail: impl Into<String>) -> Self {
        Self {
            operation,
            outcome: Outcome::Completed(detail.into()),
        }
    }

    pub fn failed(operation: Operation, detail: impl Into<String>) -> Self {
        Self {
            operation,
            outcome: Outcome::Failed(detail.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Completed(detail) => write!(f, "✓ {}: {detail}", self.operation),
            Outcome::Failed(detail) => write!(f, "✗ {}: {detail}", self.operation),
        }
    }
}

// ==========================================
// CONTROLLER
// ==========================================

/// Binds panel intents to gateway calls and publishes the results.
///
/// Every network intent spawns one independent task and hands back its
/// handle. Nothing is queued, coalesced, retried, or cancelled; when two
/// requests overlap, whichever finishes last publishes last.
pub struct SyncController<G, S, T> {
    gateway: Arc<G>,
    sink: Arc<S>,
    themes: T,
}

impl<G, S, T> SyncController<G, S, T>
where
    G: DeviceGateway,
    S: PanelSink,
    T: ThemeStore,
{
    pub fn new(gateway: Arc<G>, sink: Arc<S>, themes: T) -> Self {
        Self { gateway, sink, themes }
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    pub fn themes(&self) -> &T {
        &self.themes
    }

    /// Applies the stored theme, then fetches script and config concurrently.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> [JoinHandle<()>; 2] {
        self.apply_stored_theme();
        [self.spawn_load_script(), self.spawn_load_config()]
    }

    pub fn on_run(&self, text: impl Into<String>) -> JoinHandle<()> {
        self.spawn_submit_script(Script::new(text), ScriptAction::Run)
    }

    pub fn on_save_script(&self, text: impl Into<String>) -> JoinHandle<()> {
        self.spawn_submit_script(Script::new(text), ScriptAction::Save)
    }

    /// Replaces the edited text with the device copy, dropping unsaved edits.
    pub fn on_load_script(&self) -> JoinHandle<()> {
        self.spawn_load_script()
    }

    pub fn on_save_config(&self, arming_state: ArmingState, usb_device_type: UsbDeviceType) -> JoinHandle<()> {
        let config = DeviceConfig {
            arming_state,
            usb_device_type,
        };
        let gateway = Arc::clone(&self.gateway);
        let sink = Arc::clone(&self.sink);

        tokio::spawn(async move {
            let result = gateway.submit_config(config).await;
            report(sink.as_ref(), Operation::SaveConfig, result, |_| {
                format!(
                    "armingState={} usbDeviceType={}",
                    u8::from(config.arming_state),
                    u8::from(config.usb_device_type)
                )
            });
        })
    }

    /// Flips light and dark, persists the result and republishes it.
    ///
    /// The new value is published even if it could not be persisted.
    pub fn on_theme_toggle(&self, currently_dark: bool) -> ThemePreference {
        let next = ThemePreference::from_dark(currently_dark).toggled();

        if let Err(err) = self.themes.store(next) {
            warn!("Failed to persist theme preference: {err}");
            self.sink
                .diagnostic(Diagnostic::failed(Operation::StoreTheme, err.to_string()));
        }

        self.sink.dark_theme(next.is_dark());
        next
    }

    fn apply_stored_theme(&self) {
        match self.themes.load() {
            Ok(Some(preference)) => {
                info!("Applying stored theme preference: {}", preference.as_str());
                self.sink.dark_theme(preference.is_dark());
            }
            Ok(None) => info!("No theme preference stored, keeping presentation default"),
            Err(err) => {
                warn!("Failed to read theme preference: {err}");
                self.sink
                    .diagnostic(Diagnostic::failed(Operation::StoreTheme, err.to_string()));
            }
        }
    }

    fn spawn_load_script(&self) -> JoinHandle<()> {
        let gateway = Arc::clone(&self.gateway);
        let sink = Arc::clone(&self.sink);

        tokio::spawn(async move {
            let result = gateway.load_script().await;
            if let Ok(script) = &result {
                sink.script_text(script.as_str());
            }
            report(sink.as_ref(), Operation::LoadScript, result, |script| {
                format!("{} lines", script.as_str().lines().count())
            });
        })
    }

    fn spawn_load_config(&self) -> JoinHandle<()> {
        let gateway = Arc::clone(&self.gateway);
        let sink = Arc::clone(&self.sink);

        tokio::spawn(async move {
            let result = gateway.load_config().await;
            if let Ok(config) = &result {
                sink.arming_state(config.arming_state);
                sink.usb_device_type(config.usb_device_type);
            }
            report(sink.as_ref(), Operation::LoadConfig, result, |config| {
                format!("{} / {}", config.arming_state, config.usb_device_type)
            });
        })
    }

    fn spawn_submit_script(&self, script: Script, action: ScriptAction) -> JoinHandle<()> {
        let gateway = Arc::clone(&self.gateway);
        let sink = Arc::clone(&self.sink);
        let operation = Operation::for_action(action);

        tokio::spawn(async move {
            let length = script.as_str().len();
            let result = gateway.submit_script(script, action).await;
            report(sink.as_ref(), operation, result, |_| format!("{length} bytes sent"));
        })
    }
}

fn report<S, V>(sink: &S, operation: Operation, result: Result<V, GatewayError>, describe: impl FnOnce(&V) -> String)
where
    S: PanelSink + ?Sized,
{
    let diagnostic = match &result {
        Ok(value) => {
            let detail = describe(value);
            info!("{operation} completed: {detail}");
            Diagnostic::completed(operation, detail)
        }
        Err(err) => {
            error!("{operation} failed: {err}");
            Diagnostic::failed(operation, err.to_string())
        }
    };
    sink.diagnostic(diagnostic);
}
