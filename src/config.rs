use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use strum::{Display, EnumString};

/// Variables the bridge reads from the environment.
pub const ENV_KEYS: &[&str] = &[
    "TEMPERATURE_UNIT",
    "NAME_HEURISTICS",
    "ADAPTIVE_LIGHTING",
    "COMMAND_DEBOUNCE_MS",
    "BRIDGE_DEVICES",
    "BRIDGE_CONFIG",
    "RUST_LOG",
];

/// Fill unset bridge variables from `./.env`. Variables already present in
/// the environment win; unknown keys are ignored.
pub fn load_dotenv() {
    let Ok(content) = fs::read_to_string(".env") else {
        return;
    };
    for (key, value) in dotenv_entries(&content) {
        if std::env::var_os(key).is_none() {
            // SAFETY: runs at the top of main, before the runtime spawns threads
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// `KEY=value` lines for the keys in [`ENV_KEYS`]. Values may be quoted.
fn dotenv_entries(content: &str) -> Vec<(&'static str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .filter_map(|(key, value)| {
            let key = ENV_KEYS.iter().copied().find(|k| *k == key.trim())?;
            let value = value.trim();
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            Some((key, unquoted))
        })
        .collect()
}

/// Unit the hub reports temperatures in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum TemperatureUnit {
    #[default]
    #[serde(rename = "F")]
    #[strum(serialize = "F")]
    Fahrenheit,
    #[serde(rename = "C")]
    #[strum(serialize = "C")]
    Celsius,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
    pub temperature_unit: TemperatureUnit,
    /// Treat devices whose name mentions a light or fan as such.
    pub name_heuristics: bool,
    /// Expose color temperature on bulbs that also do full color.
    pub adaptive_lighting: bool,
    /// Capabilities hidden from classification, per device id.
    pub excluded_capabilities: HashMap<String, Vec<String>>,
    /// Extra device flags (e.g. `fan_3_spd`), per device id.
    pub device_flags: HashMap<String, Vec<String>>,
    pub debounce_ms: u64,
    /// Commands coalesced by the dispatcher instead of sent immediately.
    pub continuous_commands: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            temperature_unit: TemperatureUnit::Fahrenheit,
            name_heuristics: true,
            adaptive_lighting: true,
            excluded_capabilities: HashMap::new(),
            device_flags: HashMap::new(),
            debounce_ms: 600,
            continuous_commands: [
                "setLevel",
                "setVolume",
                "setSpeed",
                "setSaturation",
                "setHue",
                "setColorTemperature",
                "setHeatingSetpoint",
                "setCoolingSetpoint",
                "setThermostatSetpoint",
                "setThermostatMode",
                "setThermostatFanMode",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }
}

impl BridgeConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Overlay settings from environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(unit) = std::env::var("TEMPERATURE_UNIT") {
            self.temperature_unit = unit
                .parse()
                .map_err(|_| BridgeError::Config(format!("TEMPERATURE_UNIT={unit}")))?;
        }
        if let Ok(value) = std::env::var("NAME_HEURISTICS") {
            self.name_heuristics = parse_bool("NAME_HEURISTICS", &value)?;
        }
        if let Ok(value) = std::env::var("ADAPTIVE_LIGHTING") {
            self.adaptive_lighting = parse_bool("ADAPTIVE_LIGHTING", &value)?;
        }
        if let Ok(value) = std::env::var("COMMAND_DEBOUNCE_MS") {
            self.debounce_ms = value
                .parse()
                .map_err(|_| BridgeError::Config(format!("COMMAND_DEBOUNCE_MS={value}")))?;
        }
        Ok(())
    }

    pub fn excluded_capabilities_for(&self, device_id: &str) -> &[String] {
        self.excluded_capabilities
            .get(device_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn flags_for(&self, device_id: &str) -> &[String] {
        self.device_flags
            .get(device_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_continuous(&self, command: &str) -> bool {
        self.continuous_commands.iter().any(|c| c == command)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(BridgeError::Config(format!("{key}={value}"))),
    }
}
