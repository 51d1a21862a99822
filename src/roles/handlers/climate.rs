use super::{command_with, keyword_state, temperature_of, StateTable};
use crate::accessory::{CharValue, CharacteristicSpec, CharacteristicType, Materializer, Props, ServiceType};
use crate::config::{BridgeConfig, TemperatureUnit};
use crate::convert;
use crate::device::{CapabilitySet, Device, DeviceCommand};
use crate::roles::Role;

const OPERATING_STATES: StateTable = &[
    ("idle", 0),
    ("heating", 1),
    ("pending heat", 1),
    ("cooling", 2),
    ("pending cool", 2),
];

/// First entry per value is the keyword written back to the hub.
const MODES: StateTable = &[
    ("off", 0),
    ("heat", 1),
    ("cool", 2),
    ("auto", 3),
    ("emergency heat", 1),
];

/// Target temperature used when the device reports no setpoint at all.
const FALLBACK_TARGET_C: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Setpoint {
    Heating,
    Cooling,
    Single,
}

impl Setpoint {
    fn attribute(self) -> &'static str {
        match self {
            Setpoint::Heating => "heatingSetpoint",
            Setpoint::Cooling => "coolingSetpoint",
            Setpoint::Single => "thermostatSetpoint",
        }
    }

    fn command(self) -> &'static str {
        match self {
            Setpoint::Heating => "setHeatingSetpoint",
            Setpoint::Cooling => "setCoolingSetpoint",
            Setpoint::Single => "setThermostatSetpoint",
        }
    }
}

/// Which setpoint the single target temperature stands for right now.
///
/// In auto mode it is the setpoint closer to the current temperature, with
/// the heating setpoint winning ties.
fn active_setpoint(device: &Device) -> Setpoint {
    let mode = device.attribute_str("thermostatMode").unwrap_or("off").to_ascii_lowercase();
    match mode.as_str() {
        "heat" | "emergency heat" => Setpoint::Heating,
        "cool" => Setpoint::Cooling,
        "auto" => {
            let heat = device.attribute_f64("heatingSetpoint");
            let cool = device.attribute_f64("coolingSetpoint");
            match (heat, cool, device.attribute_f64("temperature")) {
                (Some(heat), Some(cool), Some(current)) => {
                    if (current - heat).abs() <= (current - cool).abs() {
                        Setpoint::Heating
                    } else {
                        Setpoint::Cooling
                    }
                }
                (Some(_), _, _) => Setpoint::Heating,
                (None, Some(_), _) => Setpoint::Cooling,
                _ => Setpoint::Single,
            }
        }
        _ => Setpoint::Single,
    }
}

fn target_temperature(device: &Device, config: &BridgeConfig) -> f64 {
    let preferred = active_setpoint(device);
    [preferred, Setpoint::Single, Setpoint::Heating, Setpoint::Cooling]
        .into_iter()
        .find_map(|s| temperature_of(device, config, s.attribute()))
        .unwrap_or(FALLBACK_TARGET_C)
}

fn set_target_temperature(device: &Device, config: &BridgeConfig, value: &CharValue) -> Vec<DeviceCommand> {
    let Some(celsius) = value.as_f64() else {
        return Vec::new();
    };
    let mut setpoint = active_setpoint(device);
    if setpoint == Setpoint::Single && !device.commands.contains(Setpoint::Single.command()) {
        setpoint = Setpoint::Heating;
    }
    command_with(
        setpoint.command(),
        convert::temperature_to_hub(celsius, config.temperature_unit),
    )
}

/// Threshold bound directly to one setpoint attribute.
fn threshold(kind: CharacteristicType, setpoint: Setpoint, props: Props) -> CharacteristicSpec {
    CharacteristicSpec::new(kind, move |d, c| {
        CharValue::Float(temperature_of(d, c, setpoint.attribute()).unwrap_or(FALLBACK_TARGET_C))
    })
    .on_set(move |_, c, value| match value.as_f64() {
        Some(celsius) => command_with(
            setpoint.command(),
            convert::temperature_to_hub(celsius, c.temperature_unit),
        ),
        None => Vec::new(),
    })
    .props(props)
    .subscribe(&[setpoint.attribute()])
}

/// Protocol modes the device can be put in, from `supportedThermostatModes`.
fn supported_modes(caps: &CapabilitySet<'_>) -> Vec<i64> {
    let advertised = convert::string_list(caps.attribute("supportedThermostatModes"));
    let mut modes: Vec<i64> = advertised
        .iter()
        .filter_map(|m| MODES.iter().find(|(k, _)| k.eq_ignore_ascii_case(m)))
        .map(|(_, v)| *v)
        .collect();
    if modes.is_empty() {
        return vec![0, 1, 2, 3];
    }
    modes.push(0);
    modes.sort_unstable();
    modes.dedup();
    modes
}

pub struct ThermostatRole;

impl Role for ThermostatRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("Thermostat")
            || (caps.has_capability("ThermostatMode")
                && caps.has_capability("TemperatureMeasurement")
                && caps.has_any_capability(&["ThermostatHeatingSetpoint", "ThermostatCoolingSetpoint", "ThermostatSetpoint"]))
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let caps = m.caps();
        let key = m.service(ServiceType::Thermostat, None, None);

        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::CurrentTemperature, |d, c| {
                CharValue::Float(temperature_of(d, c, "temperature").unwrap_or(0.0))
            })
            .props(Props::range(-100.0, 100.0, 0.1))
            .subscribe(&["temperature"]),
        );
        m.characteristic(
            &key,
            keyword_state(
                CharacteristicType::CurrentHeatingCoolingState,
                "thermostatOperatingState",
                OPERATING_STATES,
                0,
            ),
        );
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::TargetHeatingCoolingState, |d, _| {
                CharValue::Int(convert::lookup(MODES, d.attribute_str("thermostatMode"), 0))
            })
            .on_set(|_, _, value| {
                match value.as_i64().and_then(|v| convert::reverse_lookup(MODES, &v)) {
                    Some(mode) => command_with("setThermostatMode", mode),
                    None => Vec::new(),
                }
            })
            .props(Props::valid_values(&supported_modes(caps)))
            .subscribe(&["thermostatMode"]),
        );
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::TargetTemperature, |d, c| {
                CharValue::Float(target_temperature(d, c))
            })
            .on_set(set_target_temperature)
            .props(Props::range(10.0, 38.0, 0.5))
            .subscribe(&[
                "thermostatMode",
                "heatingSetpoint",
                "coolingSetpoint",
                "thermostatSetpoint",
                "temperature",
            ]),
        );
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::TemperatureDisplayUnits, |_, c| {
                CharValue::Int(match c.temperature_unit {
                    TemperatureUnit::Celsius => 0,
                    TemperatureUnit::Fahrenheit => 1,
                })
            })
            .props(Props::valid_values(&[0, 1])),
        );
        m.characteristic(
            &key,
            threshold(
                CharacteristicType::HeatingThresholdTemperature,
                Setpoint::Heating,
                Props::range(0.0, 25.0, 0.5),
            )
            .requires(caps.has_attribute("heatingSetpoint") && caps.has_command("setHeatingSetpoint")),
        );
        m.characteristic(
            &key,
            threshold(
                CharacteristicType::CoolingThresholdTemperature,
                Setpoint::Cooling,
                Props::range(10.0, 35.0, 0.5),
            )
            .requires(caps.has_attribute("coolingSetpoint") && caps.has_command("setCoolingSetpoint")),
        );
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::CurrentRelativeHumidity, |d, _| {
                CharValue::Int(super::percent_of(d, "humidity").unwrap_or(0))
            })
            .props(Props::range(0.0, 100.0, 1.0))
            .subscribe(&["humidity"])
            .requires(caps.has_attribute("humidity")),
        );
    }
}

/// The thermostat's own fan, exposed as a separate fan service.
pub struct ThermostatFanRole;

const RUNNING_STATES: &[&str] = &["heating", "cooling", "fan only"];

impl Role for ThermostatFanRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_attribute("thermostatFanMode") && caps.has_command("setThermostatFanMode")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let name = format!("{} Fan", m.device().name);
        let key = m.service(ServiceType::Fanv2, Some(&name), Some("thermostat_fan"));

        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::Active, |d, _| {
                let mode = d.attribute_str("thermostatFanMode").unwrap_or("auto");
                let running = d
                    .attribute_str("thermostatOperatingState")
                    .is_some_and(|s| RUNNING_STATES.iter().any(|r| r.eq_ignore_ascii_case(s)));
                let active = mode.eq_ignore_ascii_case("on")
                    || mode.eq_ignore_ascii_case("circulate")
                    || running;
                CharValue::Int(active as i64)
            })
            .on_set(|_, _, value| {
                let mode = if value.as_bool().unwrap_or(false) { "on" } else { "auto" };
                command_with("setThermostatFanMode", mode)
            })
            .props(Props::valid_values(&[0, 1]))
            .subscribe(&["thermostatFanMode", "thermostatOperatingState"]),
        );
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::TargetFanState, |d, _| {
                let auto = d
                    .attribute_str("thermostatFanMode")
                    .is_some_and(|mode| mode.eq_ignore_ascii_case("auto"));
                CharValue::Int(auto as i64)
            })
            .on_set(|_, _, value| {
                let mode = if value.as_bool().unwrap_or(false) { "auto" } else { "on" };
                command_with("setThermostatFanMode", mode)
            })
            .props(Props::valid_values(&[0, 1]))
            .subscribe(&["thermostatFanMode"]),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{configured, read, write};
    use crate::accessory::{CharValue, CharacteristicType, ServiceKey, ServiceType};
    use crate::config::{BridgeConfig, TemperatureUnit};
    use crate::device::{Device, DeviceCommand};
    use crate::roles::RoleKind;
    use serde_json::json;

    fn thermostat() -> Device {
        Device::new("20", "Hallway")
            .with_capability("Thermostat")
            .with_capability("TemperatureMeasurement")
            .with_command("setHeatingSetpoint")
            .with_command("setCoolingSetpoint")
            .with_command("setThermostatMode")
            .with_attribute("thermostatMode", "auto")
            .with_attribute("coolingSetpoint", 75)
            .with_attribute("heatingSetpoint", 68)
            .with_attribute("temperature", 70)
            .with_attribute("thermostatOperatingState", "heating")
    }

    #[test]
    fn test_auto_mode_picks_closer_setpoint() {
        let config = BridgeConfig::default();
        let accessory = configured(thermostat(), &config);
        let get = |c| read(&accessory, &config, ServiceType::Thermostat, c);

        assert_eq!(get(CharacteristicType::TargetTemperature), Some(CharValue::Float(20.0)));
        assert_eq!(get(CharacteristicType::CurrentTemperature), Some(CharValue::Float(21.1)));
        assert_eq!(get(CharacteristicType::CurrentHeatingCoolingState), Some(CharValue::Int(1)));
        assert_eq!(get(CharacteristicType::TargetHeatingCoolingState), Some(CharValue::Int(3)));
        assert_eq!(get(CharacteristicType::TemperatureDisplayUnits), Some(CharValue::Int(1)));
        assert_eq!(
            get(CharacteristicType::HeatingThresholdTemperature),
            Some(CharValue::Float(20.0))
        );

        assert_eq!(
            write(&accessory, &config, ServiceType::Thermostat, CharacteristicType::TargetTemperature, 21.0),
            vec![DeviceCommand::new("setHeatingSetpoint").with_param(69.8)]
        );
    }

    #[test]
    fn test_auto_mode_tie_prefers_heating() {
        let config = BridgeConfig::default();
        let accessory = configured(thermostat().with_attribute("temperature", 71.5), &config);
        assert_eq!(
            read(&accessory, &config, ServiceType::Thermostat, CharacteristicType::TargetTemperature),
            Some(CharValue::Float(20.0))
        );

        let accessory = configured(thermostat().with_attribute("temperature", 74), &config);
        assert_eq!(
            read(&accessory, &config, ServiceType::Thermostat, CharacteristicType::TargetTemperature),
            Some(CharValue::Float(23.9))
        );
    }

    #[test]
    fn test_cool_mode_writes_cooling_setpoint() {
        let config = BridgeConfig {
            temperature_unit: TemperatureUnit::Celsius,
            ..Default::default()
        };
        let accessory = configured(
            thermostat()
                .with_attribute("thermostatMode", "cool")
                .with_attribute("coolingSetpoint", 24),
            &config,
        );
        assert_eq!(
            write(&accessory, &config, ServiceType::Thermostat, CharacteristicType::TargetTemperature, 22.5),
            vec![DeviceCommand::new("setCoolingSetpoint").with_param(22.5)]
        );
        assert_eq!(
            write(&accessory, &config, ServiceType::Thermostat, CharacteristicType::TargetHeatingCoolingState, 0i64),
            vec![DeviceCommand::new("setThermostatMode").with_param("off")]
        );
    }

    #[test]
    fn test_unmapped_mode_reads_off() {
        let config = BridgeConfig::default();
        let accessory = configured(
            thermostat()
                .with_attribute("thermostatMode", "dry")
                .with_attribute("supportedThermostatModes", json!(["heat", "cool", "dry"])),
            &config,
        );
        assert_eq!(
            read(&accessory, &config, ServiceType::Thermostat, CharacteristicType::TargetHeatingCoolingState),
            Some(CharValue::Int(0))
        );
        let mode = accessory
            .service(&ServiceKey::new(ServiceType::Thermostat))
            .and_then(|s| s.characteristic(CharacteristicType::TargetHeatingCoolingState))
            .unwrap();
        assert_eq!(mode.props().valid_values, Some(vec![0, 1, 2]));
    }

    #[test]
    fn test_thermostat_fan_service() {
        let config = BridgeConfig::default();
        let accessory = configured(
            thermostat()
                .with_attribute("thermostatFanMode", "auto")
                .with_command("setThermostatFanMode"),
            &config,
        );
        assert_eq!(accessory.roles(), [RoleKind::Thermostat, RoleKind::ThermostatFan]);

        let fan = accessory
            .service(&ServiceKey::with_subtype(ServiceType::Fanv2, "thermostat_fan"))
            .unwrap();
        assert_eq!(fan.display_name(), "Hallway Fan");
        assert!(!fan.is_primary());
        assert_eq!(
            fan.characteristic(CharacteristicType::TargetFanState).unwrap().value(),
            &CharValue::Int(1)
        );
        // Operating state is heating, so the fan runs even in auto.
        assert_eq!(
            fan.characteristic(CharacteristicType::Active).unwrap().value(),
            &CharValue::Int(1)
        );
    }
}
