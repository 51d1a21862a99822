//! Read-only sensors.

use super::{keyword_state, percent_of, temperature_of, StateTable};
use crate::accessory::{
    CharValue, CharacteristicSpec, CharacteristicType, Materializer, Props, ServiceKey, ServiceType,
};
use crate::device::CapabilitySet;
use crate::roles::Role;

const CONTACT: StateTable = &[("closed", 0), ("open", 1)];
const PRESENCE: StateTable = &[("not present", 0), ("present", 1)];
const WATER: StateTable = &[("dry", 0), ("wet", 1)];
const DETECTED: StateTable = &[("clear", 0), ("tested", 0), ("detected", 1)];
const TAMPER: StateTable = &[("clear", 0), ("detected", 1)];

/// Tamper status on sensors that report it.
fn tamper(m: &mut Materializer<'_>, key: &ServiceKey) {
    let present = m.caps().has_capability("TamperAlert") || m.caps().has_attribute("tamper");
    m.characteristic(
        key,
        keyword_state(CharacteristicType::StatusTampered, "tamper", TAMPER, 0).requires(present),
    );
}

/// Sensor exposing a single enum characteristic read from a keyword attribute.
fn keyword_sensor(
    m: &mut Materializer<'_>,
    service: ServiceType,
    kind: CharacteristicType,
    attribute: &'static str,
    table: StateTable,
) -> ServiceKey {
    let key = m.service(service, None, None);
    m.characteristic(&key, keyword_state(kind, attribute, table, 0));
    key
}

pub struct ContactSensorRole;

impl Role for ContactSensorRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("ContactSensor")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = keyword_sensor(
            m,
            ServiceType::ContactSensor,
            CharacteristicType::ContactSensorState,
            "contact",
            CONTACT,
        );
        tamper(m, &key);
    }
}

pub struct MotionSensorRole;

impl Role for MotionSensorRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("MotionSensor")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = m.service(ServiceType::MotionSensor, None, None);
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::MotionDetected, |d, _| {
                CharValue::Bool(d.attribute_str("motion").is_some_and(|v| v.eq_ignore_ascii_case("active")))
            })
            .subscribe(&["motion"]),
        );
        tamper(m, &key);
    }
}

pub struct PresenceSensorRole;

impl Role for PresenceSensorRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("PresenceSensor")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        keyword_sensor(
            m,
            ServiceType::OccupancySensor,
            CharacteristicType::OccupancyDetected,
            "presence",
            PRESENCE,
        );
    }
}

pub struct LeakSensorRole;

impl Role for LeakSensorRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("WaterSensor")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = keyword_sensor(m, ServiceType::LeakSensor, CharacteristicType::LeakDetected, "water", WATER);
        tamper(m, &key);
    }
}

pub struct SmokeDetectorRole;

impl Role for SmokeDetectorRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("SmokeDetector")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        keyword_sensor(m, ServiceType::SmokeSensor, CharacteristicType::SmokeDetected, "smoke", DETECTED);
    }
}

pub struct CarbonMonoxideRole;

impl Role for CarbonMonoxideRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("CarbonMonoxideDetector")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        keyword_sensor(
            m,
            ServiceType::CarbonMonoxideSensor,
            CharacteristicType::CarbonMonoxideDetected,
            "carbonMonoxide",
            DETECTED,
        );
    }
}

pub struct TemperatureSensorRole;

impl Role for TemperatureSensorRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("TemperatureMeasurement")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = m.service(ServiceType::TemperatureSensor, None, None);
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::CurrentTemperature, |d, c| {
                CharValue::Float(temperature_of(d, c, "temperature").unwrap_or(0.0))
            })
            .props(Props::range(-100.0, 100.0, 0.1))
            .subscribe(&["temperature"]),
        );
    }
}

pub struct HumiditySensorRole;

impl Role for HumiditySensorRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("RelativeHumidityMeasurement")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = m.service(ServiceType::HumiditySensor, None, None);
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::CurrentRelativeHumidity, |d, _| {
                CharValue::Int(percent_of(d, "humidity").unwrap_or(0))
            })
            .props(Props::range(0.0, 100.0, 1.0))
            .subscribe(&["humidity"]),
        );
    }
}

pub struct IlluminanceSensorRole;

impl Role for IlluminanceSensorRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("IlluminanceMeasurement")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = m.service(ServiceType::LightSensor, None, None);
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::CurrentAmbientLightLevel, |d, _| {
                CharValue::Float(d.attribute_f64("illuminance").unwrap_or(0.0))
            })
            .props(Props::range(0.0001, 100_000.0, 0.0001))
            .subscribe(&["illuminance"]),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{configured, read};
    use crate::accessory::{CharValue, CharacteristicType, ServiceType};
    use crate::config::{BridgeConfig, TemperatureUnit};
    use crate::device::Device;
    use crate::roles::RoleKind;

    #[test]
    fn test_contact_states() {
        let config = BridgeConfig::default();
        for (state, expected) in [("open", 1), ("closed", 0), ("garbage", 0)] {
            let accessory = configured(
                Device::new("70", "Back Door")
                    .with_capability("ContactSensor")
                    .with_attribute("contact", state),
                &config,
            );
            assert_eq!(
                read(&accessory, &config, ServiceType::ContactSensor, CharacteristicType::ContactSensorState),
                Some(CharValue::Int(expected)),
                "{state}"
            );
        }
    }

    #[test]
    fn test_tamper_only_when_reported() {
        let config = BridgeConfig::default();
        let plain = configured(
            Device::new("71", "Hall Motion")
                .with_capability("MotionSensor")
                .with_attribute("motion", "active"),
            &config,
        );
        assert_eq!(
            read(&plain, &config, ServiceType::MotionSensor, CharacteristicType::MotionDetected),
            Some(CharValue::Bool(true))
        );
        assert!(read(&plain, &config, ServiceType::MotionSensor, CharacteristicType::StatusTampered).is_none());

        let tamper = configured(
            Device::new("72", "Hall Motion")
                .with_capability("MotionSensor")
                .with_capability("TamperAlert")
                .with_attribute("tamper", "detected"),
            &config,
        );
        assert_eq!(
            read(&tamper, &config, ServiceType::MotionSensor, CharacteristicType::StatusTampered),
            Some(CharValue::Int(1))
        );
    }

    #[test]
    fn test_detectors() {
        let config = BridgeConfig::default();
        let accessory = configured(
            Device::new("73", "Basement")
                .with_capability("WaterSensor")
                .with_capability("SmokeDetector")
                .with_capability("CarbonMonoxideDetector")
                .with_capability("PresenceSensor")
                .with_attribute("water", "wet")
                .with_attribute("smoke", "tested")
                .with_attribute("carbonMonoxide", "detected")
                .with_attribute("presence", "present"),
            &config,
        );
        assert_eq!(
            accessory.roles(),
            [
                RoleKind::PresenceSensor,
                RoleKind::LeakSensor,
                RoleKind::SmokeDetector,
                RoleKind::CarbonMonoxide
            ]
        );
        let get = |s, c| read(&accessory, &config, s, c);
        assert_eq!(get(ServiceType::LeakSensor, CharacteristicType::LeakDetected), Some(CharValue::Int(1)));
        assert_eq!(get(ServiceType::SmokeSensor, CharacteristicType::SmokeDetected), Some(CharValue::Int(0)));
        assert_eq!(
            get(ServiceType::CarbonMonoxideSensor, CharacteristicType::CarbonMonoxideDetected),
            Some(CharValue::Int(1))
        );
        assert_eq!(
            get(ServiceType::OccupancySensor, CharacteristicType::OccupancyDetected),
            Some(CharValue::Int(1))
        );
    }

    #[test]
    fn test_environment_sensors() {
        let config = BridgeConfig {
            temperature_unit: TemperatureUnit::Celsius,
            ..Default::default()
        };
        let accessory = configured(
            Device::new("74", "Office")
                .with_capability("TemperatureMeasurement")
                .with_capability("RelativeHumidityMeasurement")
                .with_capability("IlluminanceMeasurement")
                .with_attribute("temperature", "21.46")
                .with_attribute("humidity", 104)
                .with_attribute("illuminance", 0),
            &config,
        );
        let get = |s, c| read(&accessory, &config, s, c);
        assert_eq!(
            get(ServiceType::TemperatureSensor, CharacteristicType::CurrentTemperature),
            Some(CharValue::Float(21.5))
        );
        assert_eq!(
            get(ServiceType::HumiditySensor, CharacteristicType::CurrentRelativeHumidity),
            Some(CharValue::Int(100))
        );
        assert_eq!(
            get(ServiceType::LightSensor, CharacteristicType::CurrentAmbientLightLevel),
            Some(CharValue::Float(0.0001))
        );
    }
}
