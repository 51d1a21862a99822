//! Stateless programmable buttons.
//!
//! Each physical button becomes its own sub-service. Button presses are
//! events, not state: they are emitted from the attribute update hook rather
//! than derived from the device.

use crate::accessory::{
    Accessory, BindingKey, CharValue, CharacteristicSpec, CharacteristicType, Materializer, Props,
    ServiceKey, ServiceType,
};
use crate::config::BridgeConfig;
use crate::device::{AttributeEvent, CapabilitySet, Device};
use crate::roles::Role;
use crate::router::CharacteristicUpdate;
use log::debug;

const SINGLE_PRESS: i64 = 0;
const DOUBLE_PRESS: i64 = 1;
const LONG_PRESS: i64 = 2;

/// Hub event attribute, the capability that produces it, and the protocol event.
const BUTTON_EVENTS: &[(&str, &str, i64)] = &[
    ("pushed", "PushableButton", SINGLE_PRESS),
    ("doubleTapped", "DoubleTapableButton", DOUBLE_PRESS),
    ("held", "HoldableButton", LONG_PRESS),
];

/// Upper bound on sub-services created from `numberOfButtons`.
const MAX_BUTTONS: usize = 32;

pub struct ButtonRole;

fn button_count(device: &Device) -> usize {
    device
        .attribute_f64("numberOfButtons")
        .map(|n| n.round().clamp(1.0, MAX_BUTTONS as f64) as usize)
        .unwrap_or(1)
}

fn button_key(index: usize) -> ServiceKey {
    ServiceKey::with_subtype(ServiceType::StatelessProgrammableSwitch, format!("button_{index}"))
}

impl Role for ButtonRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        BUTTON_EVENTS.iter().any(|(_, capability, _)| caps.has_capability(capability))
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let caps = m.caps();
        let device = m.device();
        let events: Vec<i64> = BUTTON_EVENTS
            .iter()
            .filter(|(_, capability, _)| caps.has_capability(capability))
            .map(|(_, _, event)| *event)
            .collect();

        for index in 1..=button_count(device) {
            let name = format!("{} Button {index}", device.name);
            let subtype = format!("button_{index}");
            let key = m.service(ServiceType::StatelessProgrammableSwitch, Some(&name), Some(&subtype));
            m.characteristic(
                &key,
                CharacteristicSpec::new(CharacteristicType::ProgrammableSwitchEvent, |_, _| CharValue::Null)
                    .props(Props::valid_values(&events))
                    .event(),
            );
            m.characteristic(
                &key,
                CharacteristicSpec::constant(CharacteristicType::ServiceLabelIndex, index as i64),
            );
        }
    }

    fn handle_attribute_update(
        &self,
        accessory: &mut Accessory,
        event: &AttributeEvent,
        _config: &BridgeConfig,
    ) -> Vec<CharacteristicUpdate> {
        let Some(&(_, _, value)) = BUTTON_EVENTS.iter().find(|(a, _, _)| *a == event.attribute) else {
            return Vec::new();
        };
        let index = match &event.value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .map(|n| n.round() as usize)
        .unwrap_or(1);

        let binding = BindingKey {
            service: button_key(index),
            characteristic: CharacteristicType::ProgrammableSwitchEvent,
        };
        let Some((_, characteristic)) = accessory.binding_mut(&binding) else {
            debug!(
                "[Button] {}: event for button {index}, which is not exposed",
                event.device_id
            );
            return Vec::new();
        };
        characteristic.emit(CharValue::Int(value));
        vec![CharacteristicUpdate {
            device_id: event.device_id.clone(),
            binding,
            value: CharValue::Int(value),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::handlers::testing::configured;
    use crate::roles::RoleKind;

    fn remote() -> Device {
        Device::new("60", "Remote")
            .with_capability("PushableButton")
            .with_capability("HoldableButton")
            .with_attribute("numberOfButtons", 3)
    }

    #[test]
    fn test_one_sub_service_per_button() {
        let config = BridgeConfig::default();
        let accessory = configured(remote(), &config);
        assert_eq!(accessory.roles(), [RoleKind::Button]);

        for index in 1..=3 {
            let service = accessory.service(&button_key(index)).unwrap();
            assert_eq!(service.display_name(), format!("Remote Button {index}"));
            assert_eq!(
                service.characteristic(CharacteristicType::ServiceLabelIndex).unwrap().value(),
                &CharValue::Int(index as i64)
            );
            let event = service.characteristic(CharacteristicType::ProgrammableSwitchEvent).unwrap();
            assert_eq!(event.props().valid_values, Some(vec![SINGLE_PRESS, LONG_PRESS]));
        }
        assert!(accessory.service(&button_key(1)).unwrap().is_primary());
        assert!(accessory.service(&button_key(4)).is_none());
    }

    #[test]
    fn test_held_event_is_emitted_on_matching_button() {
        let config = BridgeConfig::default();
        let mut accessory = configured(remote(), &config);

        let updates = ButtonRole.handle_attribute_update(
            &mut accessory,
            &AttributeEvent::new("60", "held", 2),
            &config,
        );
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].binding.service, button_key(2));
        assert_eq!(updates[0].value, CharValue::Int(LONG_PRESS));

        // Same press twice is still two events.
        ButtonRole.handle_attribute_update(&mut accessory, &AttributeEvent::new("60", "held", 2), &config);
        let event = accessory
            .service(&button_key(2))
            .and_then(|s| s.characteristic(CharacteristicType::ProgrammableSwitchEvent))
            .unwrap();
        assert_eq!(event.version(), 2);
    }

    #[test]
    fn test_fewer_buttons_remove_stale_sub_services() {
        let config = BridgeConfig::default();
        let classifier = crate::roles::Classifier::default();
        let mut accessory = configured(remote(), &config);
        assert!(accessory.service(&button_key(3)).is_some());

        accessory.replace_device(remote().with_attribute("numberOfButtons", 2));
        let report = accessory.configure(&classifier, &config);

        assert_eq!(report.cleanup.removed_services, vec![button_key(3)]);
        assert!(accessory.service(&button_key(3)).is_none());
        assert!(accessory.service(&button_key(2)).is_some());
        assert!(accessory.service(&button_key(1)).unwrap().is_primary());
        assert_eq!(
            accessory
                .services()
                .filter(|s| s.key().kind == ServiceType::StatelessProgrammableSwitch)
                .count(),
            2
        );
    }

    #[test]
    fn test_unrelated_attribute_is_ignored() {
        let config = BridgeConfig::default();
        let mut accessory = configured(remote(), &config);
        let updates = ButtonRole.handle_attribute_update(
            &mut accessory,
            &AttributeEvent::new("60", "battery", 80),
            &config,
        );
        assert!(updates.is_empty());
    }
}
