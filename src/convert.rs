//! Value transforms between hub attribute forms and accessory characteristic forms.
//!
//! Every transform is total: malformed or out-of-range hub input is clamped
//! or mapped to a default instead of failing.

use crate::config::TemperatureUnit;
use serde_json::Value;

/// Battery percentage below which the low-battery status is raised.
pub const LOW_BATTERY_THRESHOLD: f64 = 20.0;

pub const MIN_MIRED: f64 = 140.0;
pub const MAX_MIRED: f64 = 500.0;

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

pub fn on_off(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("on"))
}

pub fn on_off_keyword(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

/// Hub hue (0-100) to protocol hue (0-360).
pub fn hue_to_degrees(hub: f64) -> f64 {
    (clamp_percent(hub) * 3.6).round()
}

/// Protocol hue (0-360) to hub hue (0-100).
pub fn degrees_to_hue(degrees: f64) -> f64 {
    (degrees.clamp(0.0, 360.0) / 3.6).round()
}

/// Kelvin to mired, always within the protocol's supported range.
pub fn kelvin_to_mired(kelvin: f64) -> f64 {
    if !kelvin.is_finite() || kelvin <= 0.0 {
        return MAX_MIRED;
    }
    (1_000_000.0 / kelvin).round().clamp(MIN_MIRED, MAX_MIRED)
}

pub fn mired_to_kelvin(mired: f64) -> f64 {
    (1_000_000.0 / mired.clamp(MIN_MIRED, MAX_MIRED)).round()
}

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    round1((f - 32.0) / 1.8)
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    round1(c * 1.8 + 32.0)
}

/// Hub temperature (in the configured unit) to the protocol's Celsius value.
pub fn temperature_to_protocol(value: f64, unit: TemperatureUnit) -> f64 {
    match unit {
        TemperatureUnit::Fahrenheit => fahrenheit_to_celsius(value),
        TemperatureUnit::Celsius => round1(value),
    }
}

/// Protocol Celsius value to hub temperature in the configured unit.
pub fn temperature_to_hub(celsius: f64, unit: TemperatureUnit) -> f64 {
    match unit {
        TemperatureUnit::Fahrenheit => celsius_to_fahrenheit(celsius),
        TemperatureUnit::Celsius => round1(celsius),
    }
}

pub fn battery_is_low(percent: f64) -> bool {
    percent < LOW_BATTERY_THRESHOLD
}

/// Default fan speed names for a device advertising `steps` speeds.
pub fn default_fan_speeds(steps: usize) -> Vec<String> {
    let names: &[&str] = match steps {
        3 => &["low", "medium", "high"],
        4 => &["low", "medium-low", "medium-high", "high"],
        6 => &["low", "medium-low", "medium", "medium-high", "high", "max"],
        _ => &["low", "medium-low", "medium", "medium-high", "high"],
    };
    names.iter().map(|n| n.to_string()).collect()
}

/// Named fan speed to a 0-100 rotation speed, proportional to its index.
///
/// `off` (or any name outside the list) maps to 0.
pub fn fan_speed_to_percent(speed: &str, speeds: &[String]) -> f64 {
    match speeds.iter().position(|s| s.eq_ignore_ascii_case(speed)) {
        Some(index) => ((index + 1) as f64 * 100.0 / speeds.len() as f64).round(),
        None => 0.0,
    }
}

/// 0-100 rotation speed to the nearest named fan speed.
///
/// Returns `None` for 0, which means the fan should be switched off.
pub fn percent_to_fan_speed(percent: f64, speeds: &[String]) -> Option<&str> {
    let percent = clamp_percent(percent);
    if percent <= 0.0 || speeds.is_empty() {
        return None;
    }
    let index = (percent * speeds.len() as f64 / 100.0).round() as usize;
    speeds
        .get(index.clamp(1, speeds.len()) - 1)
        .map(String::as_str)
}

/// Look up a hub keyword in a `(keyword, protocol value)` table.
pub fn lookup<T: Copy>(table: &[(&str, T)], keyword: Option<&str>, default: T) -> T {
    keyword
        .and_then(|k| {
            table
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(k))
                .map(|(_, v)| *v)
        })
        .unwrap_or(default)
}

/// Reverse lookup: protocol value to the first hub keyword mapped to it.
pub fn reverse_lookup<'t, T: PartialEq>(table: &[(&'t str, T)], value: &T) -> Option<&'t str> {
    table.iter().find(|(_, v)| v == value).map(|(k, _)| *k)
}

/// Parse a list-valued attribute that the hub may send either as a JSON
/// array or as a JSON-encoded string.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    let parsed;
    let array = match value {
        Some(Value::Array(items)) => items,
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => {
                parsed = items;
                &parsed
            }
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    array
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}
