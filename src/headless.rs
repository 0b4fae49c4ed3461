// ═══════════════════════════════════════════════════════════════════════════════
//  Headless commands: one request per invocation
// ═══════════════════════════════════════════════════════════════════════════════

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use client::{ArmingState, DeviceConfig, DeviceGateway, Script, ScriptAction, UsbDeviceType};

/// Reads a script from `path`, or from stdin when `path` is `-`.
pub fn read_script(path: &Path) -> Result<Script> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read script from stdin")?;
        text
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };
    Ok(Script::new(text))
}

pub async fn submit<G: DeviceGateway>(gateway: &G, script: Script, action: ScriptAction) -> Result<()> {
    let bytes = script.as_str().len();
    gateway.submit_script(script, action).await?;
    eprintln!(
        "ducky-panel: {} {bytes} bytes",
        match action {
            ScriptAction::Run => "ran",
            ScriptAction::Save => "saved",
        }
    );
    Ok(())
}

/// Writes the device's script to `output`, or stdout when absent.
pub async fn load<G: DeviceGateway>(gateway: &G, output: Option<&Path>) -> Result<()> {
    let script = gateway.load_script().await?;
    match output {
        Some(path) => fs::write(path, script.as_str())
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(script.as_str().as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

pub async fn show_config<G: DeviceGateway>(gateway: &G) -> Result<()> {
    let config = gateway.load_config().await?;
    println!("{}", render_config(&config));
    Ok(())
}

/// Fields left out keep the value the device reports.
pub async fn set_config<G: DeviceGateway>(
    gateway: &G,
    arming: Option<ArmingState>,
    usb: Option<UsbDeviceType>,
) -> Result<()> {
    let config = match (arming, usb) {
        (Some(arming_state), Some(usb_device_type)) => DeviceConfig {
            arming_state,
            usb_device_type,
        },
        _ => {
            let current = gateway.load_config().await?;
            DeviceConfig {
                arming_state: arming.unwrap_or(current.arming_state),
                usb_device_type: usb.unwrap_or(current.usb_device_type),
            }
        }
    };

    gateway.submit_config(config).await?;
    println!("{}", render_config(&config));
    Ok(())
}

fn render_config(config: &DeviceConfig) -> String {
    format!(
        "arming state:    {}\nusb device type: {}",
        config.arming_state, config.usb_device_type
    )
}
