use super::{command, command_with, percent_spec};
use crate::accessory::{CharValue, CharacteristicSpec, CharacteristicType, Materializer, Props, ServiceType};
use crate::convert;
use crate::device::{CapabilitySet, Device};
use crate::roles::Role;
use log::debug;

/// Step-count hints a device can carry as flags.
const SPEED_FLAGS: &[(&str, usize)] = &[("fan_3_spd", 3), ("fan_4_spd", 4), ("fan_5_spd", 5), ("fan_6_spd", 6)];

/// Speed keywords that are not positions on the speed scale.
const NON_SPEEDS: &[&str] = &["off", "on", "auto"];

pub struct FanRole;

impl Role for FanRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("FanControl")
            || (caps.looks_like_fan() && caps.has_any_capability(&["Switch", "SwitchLevel"]))
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let caps = m.caps();
        let key = m.service(ServiceType::Fanv2, None, None);

        let switched = caps.has_command("on") && caps.has_command("off");
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::Active, |d, _| CharValue::Int(fan_is_on(d) as i64))
                .on_set(move |_, _, value| {
                    let on = value.as_bool().unwrap_or(false);
                    if switched {
                        command(convert::on_off_keyword(on))
                    } else {
                        command_with("setSpeed", convert::on_off_keyword(on))
                    }
                })
                .props(Props::valid_values(&[0, 1]))
                .subscribe(&["switch", "speed"]),
        );

        if caps.has_capability("FanControl") && caps.has_command("setSpeed") {
            let speeds = speed_names(caps);
            debug!("[Fan] {}: speed scale {:?}", caps.device().id, speeds);
            let step = (100.0 / speeds.len() as f64).round();
            let read_speeds = speeds.clone();
            m.characteristic(
                &key,
                CharacteristicSpec::new(CharacteristicType::RotationSpeed, move |d, _| {
                    let speed = d.attribute_str("speed").unwrap_or("off");
                    CharValue::Int(convert::fan_speed_to_percent(speed, &read_speeds) as i64)
                })
                .on_set(move |_, _, value| {
                    let percent = value.as_f64().unwrap_or(0.0);
                    let speed = convert::percent_to_fan_speed(percent, &speeds).unwrap_or("off");
                    command_with("setSpeed", speed)
                })
                .props(Props::range(0.0, 100.0, step))
                .subscribe(&["speed"]),
            );
        } else {
            m.characteristic(
                &key,
                percent_spec(CharacteristicType::RotationSpeed, "level", "setLevel")
                    .requires(caps.has_capability("SwitchLevel") && caps.has_command("setLevel")),
            );
        }
    }
}

fn fan_is_on(device: &Device) -> bool {
    match device.attribute_str("switch") {
        Some(state) => convert::on_off(Some(state)),
        None => device
            .attribute_str("speed")
            .is_some_and(|s| !s.eq_ignore_ascii_case("off")),
    }
}

/// Speed scale: the device's advertised speeds, else the defaults for the
/// flagged step count (five when unflagged).
fn speed_names(caps: &CapabilitySet<'_>) -> Vec<String> {
    let advertised: Vec<String> = convert::string_list(caps.attribute("supportedFanSpeeds"))
        .into_iter()
        .filter(|s| !NON_SPEEDS.iter().any(|n| n.eq_ignore_ascii_case(s)))
        .collect();
    if !advertised.is_empty() {
        return advertised;
    }
    let steps = SPEED_FLAGS
        .iter()
        .find(|(flag, _)| caps.has_flag(flag))
        .map(|(_, steps)| *steps)
        .unwrap_or(5);
    convert::default_fan_speeds(steps)
}
