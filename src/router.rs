//! Attribute update routing.
//!
//! Keeps an index from (attribute, device) to the characteristic bindings
//! that follow it, so a live attribute change refreshes exactly the affected
//! characteristics and nothing else.

use crate::accessory::{Accessory, BindingKey, CharValue};
use crate::config::BridgeConfig;
use crate::device::AttributeEvent;
use crate::roles::RoleRegistry;
use log::{debug, trace};
use serde::Serialize;
use std::collections::HashMap;

/// A characteristic value change to publish to protocol clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacteristicUpdate {
    pub device_id: String,
    pub binding: BindingKey,
    pub value: CharValue,
}

#[derive(Debug, Default)]
pub struct AttributeRouter {
    /// attribute name -> device id -> subscribed bindings
    routes: HashMap<String, HashMap<String, Vec<BindingKey>>>,
}

impl AttributeRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every subscription of the accessory's device with its current
    /// bindings. Called after each classification pass.
    pub fn register(&mut self, accessory: &Accessory) {
        self.unregister(accessory.id());
        let subscriptions = accessory.subscriptions();
        debug!(
            "[Router] {}: {} attribute subscriptions",
            accessory.id(),
            subscriptions.len()
        );
        for (attribute, binding) in subscriptions {
            self.routes
                .entry(attribute)
                .or_default()
                .entry(accessory.id().to_string())
                .or_default()
                .push(binding);
        }
    }

    pub fn unregister(&mut self, device_id: &str) {
        self.routes.retain(|_, devices| {
            devices.remove(device_id);
            !devices.is_empty()
        });
    }

    pub fn subscribers(&self, device_id: &str, attribute: &str) -> &[BindingKey] {
        self.routes
            .get(attribute)
            .and_then(|devices| devices.get(device_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of (attribute, binding) subscriptions.
    pub fn binding_count(&self) -> usize {
        self.routes
            .values()
            .flat_map(HashMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Apply one attribute change to its accessory.
    ///
    /// Records the new value, re-derives every subscribed characteristic,
    /// then lets the device's roles react to event-style attributes. Only
    /// characteristics whose value actually changed are reported.
    pub fn route(
        &self,
        accessory: &mut Accessory,
        event: &AttributeEvent,
        registry: &RoleRegistry,
        config: &BridgeConfig,
    ) -> Vec<CharacteristicUpdate> {
        accessory.set_attribute(&event.attribute, event.value.clone());

        let bindings = self.subscribers(&event.device_id, &event.attribute);
        if bindings.is_empty() {
            trace!(
                "[Router] {}: no binding follows {}",
                event.device_id, event.attribute
            );
        }

        let mut updates = Vec::new();
        for binding in bindings {
            let Some((device, characteristic)) = accessory.binding_mut(binding) else {
                debug!(
                    "[Router] {}: stale binding {}/{}",
                    event.device_id, binding.service, binding.characteristic
                );
                continue;
            };
            if characteristic.refresh(device, config) {
                updates.push(CharacteristicUpdate {
                    device_id: event.device_id.clone(),
                    binding: binding.clone(),
                    value: characteristic.value().clone(),
                });
            }
        }

        for role in accessory.roles().to_vec() {
            updates.extend(
                registry
                    .handler(role)
                    .handle_attribute_update(accessory, event, config),
            );
        }

        updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::{CharacteristicType, ServiceKey, ServiceType};
    use crate::device::Device;
    use crate::roles::Classifier;

    fn dimmer() -> Accessory {
        let mut accessory = Accessory::new(
            Device::new("1", "Den Dimmer")
                .with_capability("Switch")
                .with_capability("SwitchLevel")
                .with_capability("Battery")
                .with_command("setLevel")
                .with_attribute("switch", "on")
                .with_attribute("level", 40)
                .with_attribute("battery", 90),
        );
        accessory.configure(&Classifier::default(), &BridgeConfig::default());
        accessory
    }

    fn brightness() -> BindingKey {
        BindingKey {
            service: ServiceKey::new(ServiceType::Lightbulb),
            characteristic: CharacteristicType::Brightness,
        }
    }

    #[test]
    fn test_route_refreshes_only_subscribed_bindings() {
        let config = BridgeConfig::default();
        let registry = RoleRegistry::standard();
        let mut accessory = dimmer();
        let mut router = AttributeRouter::new();
        router.register(&accessory);

        let on = BindingKey {
            service: ServiceKey::new(ServiceType::Lightbulb),
            characteristic: CharacteristicType::On,
        };
        let on_version = accessory.characteristic(&on).unwrap().version();

        let updates = router.route(
            &mut accessory,
            &AttributeEvent::new("1", "level", 75),
            &registry,
            &config,
        );
        assert_eq!(
            updates,
            vec![CharacteristicUpdate {
                device_id: "1".into(),
                binding: brightness(),
                value: CharValue::Int(75),
            }]
        );
        assert_eq!(accessory.characteristic(&on).unwrap().version(), on_version);
        assert_eq!(accessory.device().attribute_f64("level"), Some(75.0));
    }

    #[test]
    fn test_unchanged_value_produces_no_update() {
        let config = BridgeConfig::default();
        let registry = RoleRegistry::standard();
        let mut accessory = dimmer();
        let mut router = AttributeRouter::new();
        router.register(&accessory);

        let updates = router.route(
            &mut accessory,
            &AttributeEvent::new("1", "level", 40),
            &registry,
            &config,
        );
        assert!(updates.is_empty());
    }

    #[test]
    fn test_unsubscribed_attribute_is_recorded_but_not_routed() {
        let config = BridgeConfig::default();
        let registry = RoleRegistry::standard();
        let mut accessory = dimmer();
        let mut router = AttributeRouter::new();
        router.register(&accessory);

        let updates = router.route(
            &mut accessory,
            &AttributeEvent::new("1", "rssi", -60),
            &registry,
            &config,
        );
        assert!(updates.is_empty());
        assert_eq!(accessory.device().attribute_f64("rssi"), Some(-60.0));
    }

    #[test]
    fn test_motion_event_touches_only_motion_binding() {
        let config = BridgeConfig::default();
        let registry = RoleRegistry::standard();
        let mut accessory = Accessory::new(
            Device::new("7", "Hall Multisensor")
                .with_capability("MotionSensor")
                .with_capability("TemperatureMeasurement")
                .with_capability("Battery")
                .with_capability("TamperAlert")
                .with_attribute("motion", "inactive")
                .with_attribute("temperature", 68)
                .with_attribute("battery", 80)
                .with_attribute("tamper", "clear"),
        );
        accessory.configure(&Classifier::default(), &config);
        let mut router = AttributeRouter::new();
        router.register(&accessory);

        let motion = BindingKey {
            service: ServiceKey::new(ServiceType::MotionSensor),
            characteristic: CharacteristicType::MotionDetected,
        };
        let others = [
            BindingKey {
                service: ServiceKey::new(ServiceType::MotionSensor),
                characteristic: CharacteristicType::StatusTampered,
            },
            BindingKey {
                service: ServiceKey::new(ServiceType::TemperatureSensor),
                characteristic: CharacteristicType::CurrentTemperature,
            },
            BindingKey {
                service: ServiceKey::new(ServiceType::Battery),
                characteristic: CharacteristicType::BatteryLevel,
            },
            BindingKey {
                service: ServiceKey::new(ServiceType::Battery),
                characteristic: CharacteristicType::StatusLowBattery,
            },
        ];
        let versions: Vec<u32> = others
            .iter()
            .map(|b| accessory.characteristic(b).unwrap().version())
            .collect();

        let updates = router.route(
            &mut accessory,
            &AttributeEvent::new("7", "motion", "active"),
            &registry,
            &config,
        );

        assert_eq!(
            updates,
            vec![CharacteristicUpdate {
                device_id: "7".into(),
                binding: motion.clone(),
                value: CharValue::Bool(true),
            }]
        );
        assert_eq!(router.subscribers("7", "motion"), [motion]);
        let after: Vec<u32> = others
            .iter()
            .map(|b| accessory.characteristic(b).unwrap().version())
            .collect();
        assert_eq!(after, versions);
    }

    #[test]
    fn test_register_replaces_previous_subscriptions() {
        let accessory = dimmer();
        let mut router = AttributeRouter::new();
        router.register(&accessory);
        let count = router.binding_count();
        router.register(&accessory);
        assert_eq!(router.binding_count(), count);
        assert_eq!(router.subscribers("1", "level"), [brightness()]);

        router.unregister("1");
        assert_eq!(router.binding_count(), 0);
        assert!(router.subscribers("1", "level").is_empty());
    }
}
