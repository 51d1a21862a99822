use super::{command_with, StateTable};
use crate::accessory::{CharValue, CharacteristicSpec, CharacteristicType, Materializer, Props, ServiceType};
use crate::convert;
use crate::device::{CapabilitySet, Device};
use crate::roles::Role;

const STAY: i64 = 0;
const AWAY: i64 = 1;
const NIGHT: i64 = 2;
const DISARMED: i64 = 3;
const TRIGGERED: i64 = 4;

/// Hub alarm keywords. The first keyword per value is the one written back.
const ALARM_STATES: StateTable = &[
    ("stay", STAY),
    ("away", AWAY),
    ("night", NIGHT),
    ("off", DISARMED),
    ("alarm_active", TRIGGERED),
    ("armedHome", STAY),
    ("armed home", STAY),
    ("armedAway", AWAY),
    ("armed away", AWAY),
    ("armedNight", NIGHT),
    ("armed night", NIGHT),
    ("disarmed", DISARMED),
    ("allDisarmed", DISARMED),
    ("intrusion", TRIGGERED),
    ("intrusion-home", TRIGGERED),
    ("intrusion-away", TRIGGERED),
    ("intrusion-night", TRIGGERED),
];

/// Attributes carrying the alarm state, in order of preference.
const STATUS_ATTRIBUTES: &[&str] = &["alarmSystemStatus", "securityKeypad"];

fn alarm_state(device: &Device) -> i64 {
    let keyword = STATUS_ATTRIBUTES.iter().find_map(|a| device.attribute_str(a));
    convert::lookup(ALARM_STATES, keyword, DISARMED)
}

/// Home security system (hub safety monitor or keypad).
pub struct SecuritySystemRole;

impl Role for SecuritySystemRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("SecurityKeypad") || caps.has_attribute("alarmSystemStatus")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = m.service(ServiceType::SecuritySystem, None, None);
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::SecuritySystemCurrentState, |d, _| {
                CharValue::Int(alarm_state(d))
            })
            .props(Props::valid_values(&[STAY, AWAY, NIGHT, DISARMED, TRIGGERED]))
            .subscribe(STATUS_ATTRIBUTES),
        );
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::SecuritySystemTargetState, |d, _| {
                // A triggered alarm keeps the armed target; without one, disarmed.
                match alarm_state(d) {
                    TRIGGERED => CharValue::Int(AWAY),
                    state => CharValue::Int(state),
                }
            })
            .on_set(|_, _, value| {
                match value.as_i64().and_then(|v| convert::reverse_lookup(ALARM_STATES, &v)) {
                    Some(keyword) => command_with("setAlarmSystemStatus", keyword),
                    None => Vec::new(),
                }
            })
            .props(Props::valid_values(&[STAY, AWAY, NIGHT, DISARMED]))
            .subscribe(STATUS_ATTRIBUTES),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{configured, read, write};
    use crate::accessory::{CharValue, CharacteristicType, ServiceType};
    use crate::config::BridgeConfig;
    use crate::device::{Device, DeviceCommand};
    use crate::roles::RoleKind;

    fn monitor(status: &str) -> Device {
        Device::new("40", "Safety Monitor").with_attribute("alarmSystemStatus", status)
    }

    #[test]
    fn test_alarm_aliases() {
        let config = BridgeConfig::default();
        for (status, expected) in [
            ("armedAway", 1),
            ("armedHome", 0),
            ("armedNight", 2),
            ("disarmed", 3),
            ("intrusion", 4),
            ("weird", 3),
        ] {
            let accessory = configured(monitor(status), &config);
            assert_eq!(accessory.roles(), [RoleKind::SecuritySystem]);
            assert_eq!(
                read(&accessory, &config, ServiceType::SecuritySystem, CharacteristicType::SecuritySystemCurrentState),
                Some(CharValue::Int(expected)),
                "{status}"
            );
        }
    }

    #[test]
    fn test_arm_writes_keyword() {
        let config = BridgeConfig::default();
        let accessory = configured(monitor("disarmed"), &config);
        assert_eq!(
            write(&accessory, &config, ServiceType::SecuritySystem, CharacteristicType::SecuritySystemTargetState, 2i64),
            vec![DeviceCommand::new("setAlarmSystemStatus").with_param("night")]
        );
        assert_eq!(
            write(&accessory, &config, ServiceType::SecuritySystem, CharacteristicType::SecuritySystemTargetState, 3i64),
            vec![DeviceCommand::new("setAlarmSystemStatus").with_param("off")]
        );
    }
}
