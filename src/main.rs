//! # Ducky Panel: control panel for an ESP32 keystroke-injection device
//!
//! Edits the device's stored script, runs it on demand and sets the arming
//! state and USB device type, all over the device's HTTP interface.
//!
//! ## Usage
//!   ducky-panel                          # Launch TUI
//!   ducky-panel run payload.txt          # Run a script once
//!   ducky-panel save - < payload.txt     # Store a script from stdin
//!   ducky-panel config set --arming 2    # Arm persistently

mod app;
mod editor;
mod headless;
mod logging;
mod settings;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{
    ArmingState, HttpGateway, JsonFileThemeStore, ScriptAction, SyncController, UsbDeviceType,
};
use log::info;

use app::{App, ChannelSink};
use settings::PanelSettings;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Base URL of the device
    #[arg(short, long, env = "DUCKY_PANEL_DEVICE", global = true)]
    device: Option<String>,

    /// Settings file (device URL and theme)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Where the TUI writes its log
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive panel (default)
    Tui,
    /// Send a script and run it once; `-` reads stdin
    Run { file: PathBuf },
    /// Store a script on the device; `-` reads stdin
    Save { file: PathBuf },
    /// Print the stored script
    Load {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show or change the device configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    /// Unspecified fields keep the device's current value
    Set {
        /// unarmed|single-run|persistent or 0-2
        #[arg(long)]
        arming: Option<ArmingState>,
        /// serial-jtag|hid|msd|hid-msd or 0-3
        #[arg(long)]
        usb: Option<UsbDeviceType>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(settings::config_path);
    let settings = PanelSettings::load(&config_path)?;
    let device_url = settings.device_url(cli.device.as_deref());

    let command = cli.command.unwrap_or(Commands::Tui);
    if !matches!(command, Commands::Tui) {
        logging::init_to_stderr();
    }

    match command {
        Commands::Tui => {
            let log_path = cli.log_file.unwrap_or_else(settings::default_log_path);
            logging::init_to_file(&log_path)?;
            run_tui(device_url, config_path).await
        }
        Commands::Run { file } => {
            let gateway = connect(&device_url)?;
            headless::submit(&gateway, headless::read_script(&file)?, ScriptAction::Run).await
        }
        Commands::Save { file } => {
            let gateway = connect(&device_url)?;
            headless::submit(&gateway, headless::read_script(&file)?, ScriptAction::Save).await
        }
        Commands::Load { output } => headless::load(&connect(&device_url)?, output.as_deref()).await,
        Commands::Config { action } => {
            let gateway = connect(&device_url)?;
            match action {
                ConfigAction::Show => headless::show_config(&gateway).await,
                ConfigAction::Set { arming, usb } => headless::set_config(&gateway, arming, usb).await,
            }
        }
    }
}

fn connect(device_url: &str) -> Result<HttpGateway> {
    HttpGateway::new(device_url).with_context(|| format!("cannot use device at {device_url}"))
}

async fn run_tui(device_url: String, config_path: PathBuf) -> Result<()> {
    info!("Starting panel for {device_url}");
    let gateway = Arc::new(connect(&device_url)?);
    let (sink, updates) = ChannelSink::channel();
    let controller = SyncController::new(gateway, Arc::new(sink), JsonFileThemeStore::new(config_path));

    let terminal = ratatui::init();
    let result = App::new(device_url).run(terminal, controller, updates).await;
    ratatui::restore();
    result
}
