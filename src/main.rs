use async_trait::async_trait;
use clap::Parser;
use hub_accessory_bridge::accessory::{BindingKey, CharValue, CharacteristicType, ServiceKey, ServiceType};
use hub_accessory_bridge::config::{BridgeConfig, load_dotenv};
use hub_accessory_bridge::device::{AttributeEvent, Device, DeviceCommand};
use hub_accessory_bridge::dispatcher::CommandTransport;
use hub_accessory_bridge::error::{CommandError, Result};
use hub_accessory_bridge::router::CharacteristicUpdate;
use hub_accessory_bridge::Bridge;
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

#[derive(Parser)]
#[command(name = "hub-accessory-bridge")]
#[command(about = "Expose hub devices as accessories, driven by JSON lines on stdin")]
struct Args {
    /// JSON file holding the hub's device list
    #[arg(long, env = "BRIDGE_DEVICES")]
    devices: PathBuf,

    /// Bridge configuration (JSON). Defaults to the user config directory.
    #[arg(long, env = "BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the command debounce period
    #[arg(long)]
    debounce_ms: Option<u64>,
}

/// One line of input: an attribute change from the hub or a client write.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputLine {
    Write(WriteRequest),
    Event(AttributeEvent),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteRequest {
    device_id: String,
    service: ServiceType,
    #[serde(default)]
    subtype: Option<String>,
    characteristic: CharacteristicType,
    value: CharValue,
}

impl WriteRequest {
    fn binding(&self) -> BindingKey {
        BindingKey {
            service: ServiceKey {
                kind: self.service,
                subtype: self.subtype.clone(),
            },
            characteristic: self.characteristic,
        }
    }
}

/// Stand-in for the hub's command API: logs every command it is handed.
struct LoggingTransport;

#[async_trait]
impl CommandTransport for LoggingTransport {
    async fn send(&self, device_id: &str, command: &DeviceCommand) -> std::result::Result<(), CommandError> {
        info!("[Hub] {device_id} <- {} {:?}", command.command, command.params);
        Ok(())
    }
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("hub-accessory-bridge").join("config.json"))
        .filter(|path| path.exists())
}

fn load_config(args: &Args) -> Result<BridgeConfig> {
    let mut config = match args.config.clone().or_else(default_config_path) {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            BridgeConfig::from_json_file(path)?
        }
        None => BridgeConfig::default(),
    };
    config.apply_env()?;
    if let Some(ms) = args.debounce_ms {
        config.debounce_ms = ms;
    }
    Ok(config)
}

fn load_devices(path: &Path) -> Result<Vec<Device>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn handle_line(bridge: &Arc<Bridge>, line: &str) {
    let input = match serde_json::from_str::<InputLine>(line) {
        Ok(input) => input,
        Err(e) => {
            warn!("Ignoring malformed input: {e}");
            return;
        }
    };

    match input {
        InputLine::Event(event) => {
            let updates = bridge.handle_event(&event);
            debug!(
                "{}.{} changed {} characteristic(s)",
                event.device_id,
                event.attribute,
                updates.len()
            );
        }
        InputLine::Write(request) => {
            // Writes resolve only after the debounce period; keep reading meanwhile.
            let bridge = bridge.clone();
            tokio::spawn(async move {
                let binding = request.binding();
                match bridge
                    .write_characteristic(&request.device_id, &binding, request.value)
                    .await
                {
                    Ok(()) => info!("[Bridge] {}: {} written", request.device_id, binding.characteristic),
                    Err(e) => warn!("[Bridge] {}: write failed: {e}", request.device_id),
                }
            });
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    load_dotenv();
    init_logger();
    info!("Starting hub accessory bridge");

    let args = Args::parse();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    info!("Configuration loaded:");
    info!("  Temperature unit: {}", config.temperature_unit);
    info!("  Debounce: {}ms", config.debounce_ms);
    info!("  Adaptive lighting: {}", config.adaptive_lighting);

    let devices = match load_devices(&args.devices) {
        Ok(devices) => devices,
        Err(e) => {
            error!("Failed to load devices from {}: {e}", args.devices.display());
            std::process::exit(1);
        }
    };

    let bridge = Arc::new(Bridge::new(config, Arc::new(LoggingTransport)));
    let removed = bridge.sync_devices(devices);
    info!(
        "{} accessories ready ({} removed)",
        bridge.device_count(),
        removed.len()
    );

    match serde_json::to_string_pretty(&bridge.snapshot()) {
        Ok(json) => println!("{json}"),
        Err(e) => error!("Failed to serialize accessories: {e}"),
    }

    bridge.set_listener(Arc::new(|update: &CharacteristicUpdate| {
        match serde_json::to_string(update) {
            Ok(json) => println!("{json}"),
            Err(e) => warn!("Failed to serialize update: {e}"),
        }
    }));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => handle_line(&bridge, &line),
                Ok(None) => {
                    info!("Input closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read input: {e}");
                    break;
                }
            },
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Received shutdown signal"),
                    Err(e) => error!("Failed to listen for shutdown signal: {e}"),
                }
                break;
            }
        }
    }

    // Let debounced writes still in flight reach the hub.
    let grace = bridge.config().debounce_ms + 100;
    tokio::time::sleep(std::time::Duration::from_millis(grace)).await;
    info!("Hub accessory bridge stopped");
}
