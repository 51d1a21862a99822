//! Multi-label role classification.

use super::registry::RoleRegistry;
use super::RoleKind;
use crate::config::BridgeConfig;
use crate::device::CapabilitySet;
use log::debug;
use std::hash::{DefaultHasher, Hash, Hasher};

#[derive(Default)]
pub struct Classifier {
    registry: RoleRegistry,
}

impl Classifier {
    pub fn new(registry: RoleRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// Evaluate every role in registry order.
    ///
    /// A role is skipped when the device has one of its excluded capabilities
    /// or attributes, or when an already-accepted role shadows it.
    pub fn classify(&self, caps: &CapabilitySet<'_>) -> Vec<RoleKind> {
        let mut accepted: Vec<RoleKind> = Vec::new();

        for definition in self.registry.definitions() {
            if definition
                .exclude_capabilities
                .iter()
                .any(|c| caps.has_capability(c))
                || definition
                    .exclude_attributes
                    .iter()
                    .any(|a| caps.has_attribute(a))
            {
                continue;
            }
            if !definition.handler.is_supported(caps) {
                continue;
            }

            let shadowed_by = self
                .registry
                .definitions()
                .iter()
                .filter(|d| accepted.contains(&d.kind))
                .find(|d| d.exclude_roles.contains(&definition.kind));
            if let Some(by) = shadowed_by {
                debug!(
                    "[Classifier] {}: {} shadowed by {}",
                    caps.device().id,
                    definition.kind,
                    by.kind
                );
                continue;
            }

            if !accepted.contains(&definition.kind) {
                accepted.push(definition.kind);
            }
        }

        debug!("[Classifier] {}: roles {:?}", caps.device().id, accepted);
        accepted
    }

    /// Hash of every input that can change the classification result.
    ///
    /// Attribute names are included, attribute values are not: live value
    /// changes never invalidate the cache.
    pub fn fingerprint(&self, caps: &CapabilitySet<'_>, config: &BridgeConfig) -> u64 {
        let device = caps.device();
        let mut hasher = DefaultHasher::new();
        device.name.hash(&mut hasher);
        for capability in caps.capabilities() {
            capability.hash(&mut hasher);
        }
        0xffu8.hash(&mut hasher);
        for attribute in device.attributes.keys() {
            attribute.hash(&mut hasher);
        }
        0xffu8.hash(&mut hasher);
        device.commands.hash(&mut hasher);
        for flag in caps.flags() {
            flag.hash(&mut hasher);
        }
        config.name_heuristics.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;

    fn classify(device: &Device) -> Vec<RoleKind> {
        let config = BridgeConfig::default();
        Classifier::default().classify(&CapabilitySet::new(device, &config))
    }

    #[test]
    fn test_garage_door_excludes_switch() {
        let device = Device::new("1", "Garage")
            .with_capability("Switch")
            .with_capability("GarageDoorControl")
            .with_attribute("door", "closed")
            .with_attribute("switch", "off");
        assert_eq!(classify(&device), vec![RoleKind::GarageDoor]);
    }

    #[test]
    fn test_garage_door_excludes_contact_sensor() {
        let device = Device::new("1", "Garage")
            .with_capability("ContactSensor")
            .with_capability("GarageDoorControl");
        assert_eq!(classify(&device), vec![RoleKind::GarageDoor]);
    }

    #[test]
    fn test_multi_label_dimmer_with_meter() {
        let device = Device::new("1", "Den Dimmer")
            .with_capability("Switch")
            .with_capability("SwitchLevel")
            .with_capability("EnergyMeter")
            .with_capability("PowerMeter")
            .with_command("setLevel");
        assert_eq!(
            classify(&device),
            vec![RoleKind::Light, RoleKind::EnergyMeter, RoleKind::PowerMeter]
        );
    }

    #[test]
    fn test_fan_shadows_light_and_switch() {
        let device = Device::new("1", "Ceiling")
            .with_capability("Switch")
            .with_capability("SwitchLevel")
            .with_capability("FanControl")
            .with_attribute("speed", "low");
        assert_eq!(classify(&device), vec![RoleKind::Fan]);
    }

    #[test]
    fn test_name_heuristic_fan() {
        let device = Device::new("1", "Bedroom Fan")
            .with_capability("Switch")
            .with_capability("SwitchLevel");
        assert_eq!(classify(&device), vec![RoleKind::Fan]);

        let mut config = BridgeConfig::default();
        config.name_heuristics = false;
        let roles = Classifier::default().classify(&CapabilitySet::new(&device, &config));
        assert_eq!(roles, vec![RoleKind::Light]);
    }

    #[test]
    fn test_thermostat_absorbs_temperature_and_humidity() {
        let device = Device::new("1", "Hallway")
            .with_capability("Thermostat")
            .with_capability("TemperatureMeasurement")
            .with_capability("RelativeHumidityMeasurement")
            .with_capability("Battery");
        assert_eq!(
            classify(&device),
            vec![RoleKind::Thermostat, RoleKind::Battery]
        );
    }

    #[test]
    fn test_multi_sensor() {
        let device = Device::new("1", "Multi")
            .with_capability("MotionSensor")
            .with_capability("TemperatureMeasurement")
            .with_capability("IlluminanceMeasurement")
            .with_capability("Battery");
        assert_eq!(
            classify(&device),
            vec![
                RoleKind::MotionSensor,
                RoleKind::TemperatureSensor,
                RoleKind::IlluminanceSensor,
                RoleKind::Battery
            ]
        );
    }

    #[test]
    fn test_no_roles() {
        assert!(classify(&Device::new("1", "Hub Variable")).is_empty());
    }

    #[test]
    fn test_fingerprint_ignores_values() {
        let config = BridgeConfig::default();
        let classifier = Classifier::default();
        let a = Device::new("1", "Lamp").with_attribute("switch", "on");
        let b = Device::new("1", "Lamp").with_attribute("switch", "off");
        let c = Device::new("1", "Lamp")
            .with_attribute("switch", "off")
            .with_attribute("level", 3);

        let fa = classifier.fingerprint(&CapabilitySet::new(&a, &config), &config);
        let fb = classifier.fingerprint(&CapabilitySet::new(&b, &config), &config);
        let fc = classifier.fingerprint(&CapabilitySet::new(&c, &config), &config);
        assert_eq!(fa, fb);
        assert_ne!(fb, fc);
    }
}
