//! Locks, valves, garage doors and window coverings.

use super::{command, command_with, keyword_state, percent_of, StateTable};
use crate::accessory::{CharValue, CharacteristicSpec, CharacteristicType, Materializer, Props, ServiceType};
use crate::device::{CapabilitySet, Device};
use crate::roles::Role;

const LOCK_STATES: StateTable = &[
    ("unlocked", 0),
    ("locked", 1),
    ("jammed", 2),
    ("unlocked with timeout", 0),
];

/// `stopped` doubles as the state for anything the hub reports as unknown.
const DOOR_STATES: StateTable = &[
    ("open", 0),
    ("closed", 1),
    ("opening", 2),
    ("closing", 3),
    ("stopped", 4),
];

const SHADE_MOTION: StateTable = &[("closing", 0), ("opening", 1)];

pub struct LockRole;

impl Role for LockRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("Lock")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = m.service(ServiceType::LockMechanism, None, None);
        m.characteristic(
            &key,
            keyword_state(CharacteristicType::LockCurrentState, "lock", LOCK_STATES, 3),
        );
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::LockTargetState, |d, _| {
                CharValue::Int(is_state(d, "lock", "locked") as i64)
            })
            .on_set(|_, _, value| {
                if value.as_bool().unwrap_or(false) {
                    command("lock")
                } else {
                    command("unlock")
                }
            })
            .props(Props::valid_values(&[0, 1]))
            .subscribe(&["lock"]),
        );
    }
}

pub struct ValveRole;

impl Role for ValveRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("Valve")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = m.service(ServiceType::Valve, None, None);
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::Active, |d, _| {
                CharValue::Int(is_state(d, "valve", "open") as i64)
            })
            .on_set(|_, _, value| {
                if value.as_bool().unwrap_or(false) {
                    command("open")
                } else {
                    command("close")
                }
            })
            .props(Props::valid_values(&[0, 1]))
            .subscribe(&["valve"]),
        );
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::InUse, |d, _| {
                CharValue::Int(is_state(d, "valve", "open") as i64)
            })
            .props(Props::valid_values(&[0, 1]))
            .subscribe(&["valve"]),
        );
        // Generic valve.
        m.characteristic(&key, CharacteristicSpec::constant(CharacteristicType::ValveType, 0i64));
    }
}

pub struct GarageDoorRole;

impl Role for GarageDoorRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("GarageDoorControl")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = m.service(ServiceType::GarageDoorOpener, None, None);
        m.characteristic(
            &key,
            keyword_state(CharacteristicType::CurrentDoorState, "door", DOOR_STATES, 4),
        );
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::TargetDoorState, |d, _| {
                let opening = is_state(d, "door", "open") || is_state(d, "door", "opening");
                CharValue::Int(if opening { 0 } else { 1 })
            })
            .on_set(|_, _, value| match value.as_i64() {
                Some(0) => command("open"),
                Some(_) => command("close"),
                None => Vec::new(),
            })
            .props(Props::valid_values(&[0, 1]))
            .subscribe(&["door"]),
        );
        m.characteristic(
            &key,
            CharacteristicSpec::constant(CharacteristicType::ObstructionDetected, false),
        );
    }
}

pub struct WindowCoveringRole;

impl Role for WindowCoveringRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_any_capability(&["WindowShade", "WindowBlind"])
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let caps = m.caps();
        let key = m.service(ServiceType::WindowCovering, None, None);
        let uses_position = caps.has_command("setPosition");

        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::CurrentPosition, |d, _| {
                CharValue::Int(shade_position(d))
            })
            .props(Props::range(0.0, 100.0, 1.0))
            .subscribe(&["position", "level"]),
        );
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::TargetPosition, |d, _| {
                CharValue::Int(shade_position(d))
            })
            .on_set(move |_, _, value| match value.as_i64() {
                Some(position) if uses_position => command_with("setPosition", position),
                Some(0) => command("close"),
                Some(100) => command("open"),
                Some(position) => command_with("setLevel", position),
                None => Vec::new(),
            })
            .props(Props::range(0.0, 100.0, 1.0))
            .subscribe(&["position", "level"]),
        );
        m.characteristic(
            &key,
            keyword_state(CharacteristicType::PositionState, "windowShade", SHADE_MOTION, 2),
        );
    }
}

fn is_state(device: &Device, attribute: &str, state: &str) -> bool {
    device
        .attribute_str(attribute)
        .is_some_and(|v| v.eq_ignore_ascii_case(state))
}

fn shade_position(device: &Device) -> i64 {
    percent_of(device, "position")
        .or_else(|| percent_of(device, "level"))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{configured, read, write};
    use crate::accessory::{CharValue, CharacteristicType, ServiceType};
    use crate::config::BridgeConfig;
    use crate::device::{Device, DeviceCommand};
    use crate::roles::RoleKind;

    #[test]
    fn test_lock_states() {
        let config = BridgeConfig::default();
        for (state, expected) in [("locked", 1), ("unlocked", 0), ("jammed", 2), ("unknown", 3)] {
            let accessory = configured(
                Device::new("30", "Front Door")
                    .with_capability("Lock")
                    .with_attribute("lock", state),
                &config,
            );
            assert_eq!(
                read(&accessory, &config, ServiceType::LockMechanism, CharacteristicType::LockCurrentState),
                Some(CharValue::Int(expected)),
                "{state}"
            );
        }
    }

    #[test]
    fn test_lock_target_commands() {
        let config = BridgeConfig::default();
        let accessory = configured(
            Device::new("30", "Front Door")
                .with_capability("Lock")
                .with_attribute("lock", "unlocked"),
            &config,
        );
        assert_eq!(
            write(&accessory, &config, ServiceType::LockMechanism, CharacteristicType::LockTargetState, 1i64),
            vec![DeviceCommand::new("lock")]
        );
    }

    #[test]
    fn test_garage_door_unknown_reads_stopped() {
        let config = BridgeConfig::default();
        let accessory = configured(
            Device::new("31", "Garage")
                .with_capability("GarageDoorControl")
                .with_capability("Switch")
                .with_attribute("door", "unknown"),
            &config,
        );
        assert_eq!(accessory.roles(), [RoleKind::GarageDoor]);
        assert_eq!(
            read(&accessory, &config, ServiceType::GarageDoorOpener, CharacteristicType::CurrentDoorState),
            Some(CharValue::Int(4))
        );
        assert_eq!(
            write(&accessory, &config, ServiceType::GarageDoorOpener, CharacteristicType::TargetDoorState, 0i64),
            vec![DeviceCommand::new("open")]
        );
    }

    #[test]
    fn test_window_shade_position() {
        let config = BridgeConfig::default();
        let accessory = configured(
            Device::new("32", "Bay Window")
                .with_capability("WindowShade")
                .with_capability("Switch")
                .with_command("setPosition")
                .with_attribute("position", 45)
                .with_attribute("windowShade", "opening"),
            &config,
        );
        assert_eq!(accessory.roles(), [RoleKind::WindowCovering]);
        let get = |c| read(&accessory, &config, ServiceType::WindowCovering, c);
        assert_eq!(get(CharacteristicType::CurrentPosition), Some(CharValue::Int(45)));
        assert_eq!(get(CharacteristicType::PositionState), Some(CharValue::Int(1)));
        assert_eq!(
            write(&accessory, &config, ServiceType::WindowCovering, CharacteristicType::TargetPosition, 80i64),
            vec![DeviceCommand::new("setPosition").with_param(80)]
        );
    }

    #[test]
    fn test_valve() {
        let config = BridgeConfig::default();
        let accessory = configured(
            Device::new("33", "Sprinkler")
                .with_capability("Valve")
                .with_attribute("valve", "open"),
            &config,
        );
        assert_eq!(
            read(&accessory, &config, ServiceType::Valve, CharacteristicType::InUse),
            Some(CharValue::Int(1))
        );
        assert_eq!(
            write(&accessory, &config, ServiceType::Valve, CharacteristicType::Active, 0i64),
            vec![DeviceCommand::new("close")]
        );
    }
}
