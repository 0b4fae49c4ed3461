// ═══════════════════════════════════════════════════════════════════════════════
//  Application State
// ═══════════════════════════════════════════════════════════════════════════════

use std::time::Duration;

use anyhow::Result;
use client::{
    ArmingState, DeviceGateway, Diagnostic, Operation, PanelSink, SyncController, ThemeStore,
    UsbDeviceType,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::debug;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::editor::ScriptEditor;
use crate::ui;

const TICK: Duration = Duration::from_millis(50);

/// Values published by the controller, applied by the UI loop.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelUpdate {
    ScriptText(String),
    ArmingState(ArmingState),
    UsbDeviceType(UsbDeviceType),
    DarkTheme(bool),
    Diagnostic(Diagnostic),
}

/// Forwards published values into the UI loop's channel.
#[derive(Clone)]
pub struct ChannelSink(UnboundedSender<PanelUpdate>);

impl ChannelSink {
    pub fn channel() -> (Self, UnboundedReceiver<PanelUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    fn send(&self, update: PanelUpdate) {
        // The receiver is gone only once the UI has quit
        let _ = self.0.send(update);
    }
}

impl PanelSink for ChannelSink {
    fn script_text(&self, text: &str) {
        self.send(PanelUpdate::ScriptText(text.to_string()));
    }

    fn arming_state(&self, state: ArmingState) {
        self.send(PanelUpdate::ArmingState(state));
    }

    fn usb_device_type(&self, kind: UsbDeviceType) {
        self.send(PanelUpdate::UsbDeviceType(kind));
    }

    fn dark_theme(&self, dark: bool) {
        self.send(PanelUpdate::DarkTheme(dark));
    }

    fn diagnostic(&self, diagnostic: Diagnostic) {
        self.send(PanelUpdate::Diagnostic(diagnostic));
    }
}

/// What the operator asked for; the controller decides what it means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Run,
    SaveScript,
    LoadScript,
    SaveConfig,
    ToggleTheme,
    Quit,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Focus {
    Script,
    Config,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConfigField {
    Arming,
    Usb,
}

pub struct App {
    pub device_url: String,
    pub editor: ScriptEditor,
    pub arming_state: ArmingState,
    pub usb_device_type: UsbDeviceType,
    pub dark: bool,
    pub focus: Focus,
    pub config_sel: ConfigField,
    pub config_dirty: bool,
    pub status: String,
    pub err: bool,
    pub quit: bool,
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: T, forward: bool) -> T {
    let idx = all.iter().position(|v| *v == current).unwrap_or(0);
    let next = if forward {
        (idx + 1) % all.len()
    } else if idx == 0 {
        all.len() - 1
    } else {
        idx - 1
    };
    all[next]
}

impl App {
    pub fn new(device_url: String) -> Self {
        Self {
            status: format!("Connecting to {device_url} ..."),
            device_url,
            editor: ScriptEditor::default(),
            arming_state: ArmingState::default(),
            usb_device_type: UsbDeviceType::default(),
            // Presentation default until a stored preference says otherwise
            dark: true,
            focus: Focus::Script,
            config_sel: ConfigField::Arming,
            config_dirty: false,
            err: false,
            quit: false,
        }
    }

    pub fn apply(&mut self, update: PanelUpdate) {
        match update {
            PanelUpdate::ScriptText(text) => self.editor.set_text(&text),
            PanelUpdate::ArmingState(state) => {
                self.arming_state = state;
                self.config_dirty = false;
            }
            PanelUpdate::UsbDeviceType(kind) => {
                self.usb_device_type = kind;
                self.config_dirty = false;
            }
            PanelUpdate::DarkTheme(dark) => self.dark = dark,
            PanelUpdate::Diagnostic(diagnostic) => {
                // Unsaved markers clear only once the device has accepted the save
                if !diagnostic.is_failure() {
                    match diagnostic.operation {
                        Operation::SaveScript => self.editor.mark_clean(),
                        Operation::SaveConfig => self.config_dirty = false,
                        _ => {}
                    }
                }
                self.err = diagnostic.is_failure();
                self.status = format!("  {diagnostic}");
            }
        }
    }

    fn set_pending(&mut self, message: &str) {
        self.status = format!("  … {message}");
        self.err = false;
    }

    // ─── Key Handling ───────────────────────────────────────────────────────

    pub fn on_key(&mut self, k: KeyEvent) -> Option<Intent> {
        if k.modifiers.contains(KeyModifiers::CONTROL) {
            return match k.code {
                KeyCode::Char('c') | KeyCode::Char('q') => Some(Intent::Quit),
                KeyCode::Char('r') => Some(Intent::Run),
                KeyCode::Char('s') => Some(Intent::SaveScript),
                KeyCode::Char('l') => Some(Intent::LoadScript),
                KeyCode::Char('g') => Some(Intent::SaveConfig),
                KeyCode::Char('t') => Some(Intent::ToggleTheme),
                _ => None,
            };
        }

        match k.code {
            KeyCode::Esc => return Some(Intent::Quit),
            KeyCode::F(5) => return Some(Intent::Run),
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Script => Focus::Config,
                    Focus::Config => Focus::Script,
                };
                return None;
            }
            _ => {}
        }

        match self.focus {
            Focus::Script => self.on_key_script(k),
            Focus::Config => self.on_key_config(k),
        }
        None
    }

    fn on_key_script(&mut self, k: KeyEvent) {
        let editor = &mut self.editor;
        match k.code {
            KeyCode::Char(c) => editor.insert_char(c),
            KeyCode::Enter => editor.insert_newline(),
            KeyCode::Backspace => editor.backspace(),
            KeyCode::Delete => editor.delete(),
            KeyCode::Left => editor.move_left(),
            KeyCode::Right => editor.move_right(),
            KeyCode::Up => editor.move_up(),
            KeyCode::Down => editor.move_down(),
            KeyCode::Home => editor.home(),
            KeyCode::End => editor.end(),
            _ => {}
        }
    }

    fn on_key_config(&mut self, k: KeyEvent) {
        match k.code {
            KeyCode::Up | KeyCode::Down | KeyCode::Char('k') | KeyCode::Char('j') => {
                self.config_sel = match self.config_sel {
                    ConfigField::Arming => ConfigField::Usb,
                    ConfigField::Usb => ConfigField::Arming,
                };
            }
            KeyCode::Left | KeyCode::Char('h') => self.cycle_config(false),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => self.cycle_config(true),
            _ => {}
        }
    }

    fn cycle_config(&mut self, forward: bool) {
        match self.config_sel {
            ConfigField::Arming => {
                self.arming_state = cycle(&ArmingState::ALL, self.arming_state, forward);
            }
            ConfigField::Usb => {
                self.usb_device_type = cycle(&UsbDeviceType::ALL, self.usb_device_type, forward);
            }
        }
        self.config_dirty = true;
        self.status = "  Config changed, Ctrl+G to save to device".into();
        self.err = false;
    }

    // ─── Intents ────────────────────────────────────────────────────────────

    /// Hands an intent to the controller. Network calls are not awaited.
    pub fn dispatch<G, S, T>(&mut self, intent: Intent, controller: &SyncController<G, S, T>)
    where
        G: DeviceGateway,
        S: PanelSink,
        T: ThemeStore,
    {
        debug!("Dispatching {intent:?}");
        match intent {
            Intent::Run => {
                controller.on_run(self.editor.text());
                self.set_pending("Running script on device");
            }
            Intent::SaveScript => {
                controller.on_save_script(self.editor.text());
                self.set_pending("Saving script to device");
            }
            Intent::LoadScript => {
                controller.on_load_script();
                self.set_pending("Loading script from device");
            }
            Intent::SaveConfig => {
                controller.on_save_config(self.arming_state, self.usb_device_type);
                self.set_pending("Saving device config");
            }
            Intent::ToggleTheme => {
                // Applied at once so a second toggle in the same frame sees it
                self.dark = controller.on_theme_toggle(self.dark).is_dark();
            }
            Intent::Quit => self.quit = true,
        }
    }

    // ─── Main Loop ──────────────────────────────────────────────────────────

    /// Never blocks the runtime: key polling is non-blocking and the wait
    /// between frames is an async sleep, so spawned requests keep running.
    pub async fn run<G, S, T>(
        mut self,
        mut term: ratatui::DefaultTerminal,
        controller: SyncController<G, S, T>,
        mut updates: UnboundedReceiver<PanelUpdate>,
    ) -> Result<()>
    where
        G: DeviceGateway,
        S: PanelSink,
        T: ThemeStore,
    {
        controller.start();

        loop {
            while let Ok(update) = updates.try_recv() {
                self.apply(update);
            }

            term.draw(|f| ui::draw(f, &mut self))?;

            while event::poll(Duration::ZERO)? {
                if let Event::Key(k) = event::read()? {
                    if k.kind != KeyEventKind::Press {
                        continue;
                    }
                    if let Some(intent) = self.on_key(k) {
                        self.dispatch(intent, &controller);
                    }
                }
            }

            if self.quit {
                break;
            }

            tokio::time::sleep(TICK).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use client::{HttpGateway, MemoryThemeStore, ThemePreference};
    use std::sync::Arc;

    type PanelController = SyncController<HttpGateway, ChannelSink, MemoryThemeStore>;

    // Nothing listens on the discard port, so spawned requests fail fast
    fn controller(theme: Option<ThemePreference>) -> (PanelController, UnboundedReceiver<PanelUpdate>) {
        let gateway = HttpGateway::new("http://127.0.0.1:9/").unwrap();
        let (sink, rx) = ChannelSink::channel();
        (
            SyncController::new(Arc::new(gateway), Arc::new(sink), MemoryThemeStore::new(theme)),
            rx,
        )
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_control_keys_map_to_intents() {
        let mut app = App::new("http://esp-ducky.local/".into());
        assert_eq!(app.on_key(ctrl('r')), Some(Intent::Run));
        assert_eq!(app.on_key(ctrl('s')), Some(Intent::SaveScript));
        assert_eq!(app.on_key(ctrl('l')), Some(Intent::LoadScript));
        assert_eq!(app.on_key(ctrl('g')), Some(Intent::SaveConfig));
        assert_eq!(app.on_key(ctrl('t')), Some(Intent::ToggleTheme));
        assert_eq!(app.on_key(key(KeyCode::Esc)), Some(Intent::Quit));
        assert_eq!(app.editor.text(), "");
    }

    #[test]
    fn test_typing_edits_script_only_when_focused() {
        let mut app = App::new(String::new());
        assert_eq!(app.on_key(key(KeyCode::Char('x'))), None);
        assert_eq!(app.editor.text(), "x");

        app.on_key(key(KeyCode::Tab));
        assert_eq!(app.focus, Focus::Config);
        app.on_key(key(KeyCode::Char('x')));
        assert_eq!(app.editor.text(), "x");
    }

    #[test]
    fn test_config_cycling_wraps() {
        let mut app = App::new(String::new());
        app.on_key(key(KeyCode::Tab));

        app.on_key(key(KeyCode::Left));
        assert_eq!(app.arming_state, ArmingState::Persistent);
        app.on_key(key(KeyCode::Right));
        assert_eq!(app.arming_state, ArmingState::Unarmed);

        app.on_key(key(KeyCode::Down));
        app.on_key(key(KeyCode::Right));
        assert_eq!(app.usb_device_type, UsbDeviceType::Msd);
        assert!(app.config_dirty);
    }

    #[test]
    fn test_loaded_script_replaces_unsaved_edits() {
        let mut app = App::new(String::new());
        app.on_key(key(KeyCode::Char('a')));
        assert!(app.editor.is_dirty());

        app.apply(PanelUpdate::ScriptText("DELAY 500\nSTRING hi".into()));

        assert_eq!(app.editor.text(), "DELAY 500\nSTRING hi");
        assert!(!app.editor.is_dirty());
    }

    #[test]
    fn test_updates_reach_config_theme_and_status() {
        let mut app = App::new(String::new());
        app.apply(PanelUpdate::ArmingState(ArmingState::SingleRun));
        app.apply(PanelUpdate::UsbDeviceType(UsbDeviceType::SerialJtag));
        app.apply(PanelUpdate::DarkTheme(false));
        app.apply(PanelUpdate::Diagnostic(Diagnostic::failed(
            Operation::RunScript,
            "request failed: POST /script returned 500 Internal Server Error",
        )));

        assert_eq!(app.arming_state, ArmingState::SingleRun);
        assert_eq!(app.usb_device_type, UsbDeviceType::SerialJtag);
        assert!(!app.dark);
        assert!(app.err);
        assert!(app.status.contains("Run script"));
    }

    #[test]
    fn test_channel_sink_forwards_updates() {
        let (sink, mut rx) = ChannelSink::channel();
        sink.script_text("STRING hi");
        sink.dark_theme(true);

        assert_eq!(rx.try_recv().unwrap(), PanelUpdate::ScriptText("STRING hi".into()));
        assert_eq!(rx.try_recv().unwrap(), PanelUpdate::DarkTheme(true));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_two_toggles_in_one_frame_restore_the_theme() {
        let (controller, mut rx) = controller(Some(ThemePreference::Dark));
        let mut app = App::new(String::new());
        assert!(app.dark);

        app.dispatch(Intent::ToggleTheme, &controller);
        assert!(!app.dark);
        app.dispatch(Intent::ToggleTheme, &controller);
        assert!(app.dark);

        while let Ok(update) = rx.try_recv() {
            app.apply(update);
        }
        assert!(app.dark);
        assert_eq!(controller.themes().current(), Some(ThemePreference::Dark));
        assert_eq!(controller.themes().write_count(), 2);
    }

    #[tokio::test]
    async fn test_unsaved_markers_stay_until_save_completes() {
        let (controller, _rx) = controller(None);
        let mut app = App::new(String::new());
        app.on_key(key(KeyCode::Char('a')));
        app.on_key(key(KeyCode::Tab));
        app.on_key(key(KeyCode::Right));

        app.dispatch(Intent::SaveScript, &controller);
        app.dispatch(Intent::SaveConfig, &controller);
        assert!(app.editor.is_dirty());
        assert!(app.config_dirty);

        app.apply(PanelUpdate::Diagnostic(Diagnostic::failed(
            Operation::SaveScript,
            "request failed: POST /script returned 500 Internal Server Error",
        )));
        assert!(app.editor.is_dirty());

        app.apply(PanelUpdate::Diagnostic(Diagnostic::completed(Operation::SaveScript, "1 bytes sent")));
        app.apply(PanelUpdate::Diagnostic(Diagnostic::completed(
            Operation::SaveConfig,
            "armingState=1 usbDeviceType=1",
        )));
        assert!(!app.editor.is_dirty());
        assert!(!app.config_dirty);
    }
}
