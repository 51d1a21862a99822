use super::percent_of;
use crate::accessory::{CharValue, CharacteristicSpec, CharacteristicType, Materializer, Props, ServiceType};
use crate::convert;
use crate::device::CapabilitySet;
use crate::roles::Role;

/// Hub devices cannot report whether they are charging.
const NOT_CHARGEABLE: i64 = 2;

/// Battery service. A missing or null reading is treated as full so a
/// device that has not reported yet never looks low.
pub struct BatteryRole;

impl Role for BatteryRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("Battery")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = m.service(ServiceType::Battery, None, None);
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::BatteryLevel, |d, _| {
                CharValue::Int(percent_of(d, "battery").unwrap_or(100))
            })
            .props(Props::range(0.0, 100.0, 1.0))
            .subscribe(&["battery"]),
        );
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::StatusLowBattery, |d, _| {
                let low = d.attribute_f64("battery").is_some_and(convert::battery_is_low);
                CharValue::Int(low as i64)
            })
            .props(Props::valid_values(&[0, 1]))
            .subscribe(&["battery"]),
        );
        m.characteristic(
            &key,
            CharacteristicSpec::constant(CharacteristicType::ChargingState, NOT_CHARGEABLE),
        );
    }
}

/// Cumulative energy (kWh). Shares the meter service with [`PowerMeterRole`].
pub struct EnergyMeterRole;

impl Role for EnergyMeterRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("EnergyMeter")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = m.service(ServiceType::EnergyMeter, None, None);
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::TotalEnergy, |d, _| {
                CharValue::Float(convert::round1(d.attribute_f64("energy").unwrap_or(0.0)))
            })
            .props(Props::range(0.0, f64::MAX, 0.1))
            .subscribe(&["energy"]),
        );
    }
}

/// Instantaneous power (W).
pub struct PowerMeterRole;

impl Role for PowerMeterRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("PowerMeter")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = m.service(ServiceType::EnergyMeter, None, None);
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::CurrentPower, |d, _| {
                CharValue::Float(convert::round1(d.attribute_f64("power").unwrap_or(0.0)))
            })
            .props(Props::range(0.0, f64::MAX, 0.1))
            .subscribe(&["power"]),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{configured, read};
    use crate::accessory::{CharValue, CharacteristicType, ServiceType};
    use crate::config::BridgeConfig;
    use crate::device::Device;
    use serde_json::Value;

    fn battery(value: impl Into<Value>) -> Device {
        Device::new("90", "Door Sensor")
            .with_capability("Battery")
            .with_attribute("battery", value)
    }

    #[test]
    fn test_battery_levels() {
        let config = BridgeConfig::default();
        for (value, level, low) in [
            (Value::from(15), 15, 1),
            (Value::from(20), 20, 0),
            (Value::from(130), 100, 0),
            (Value::from("abc"), 100, 0),
            (Value::Null, 100, 0),
        ] {
            let accessory = configured(battery(value.clone()), &config);
            let get = |c| read(&accessory, &config, ServiceType::Battery, c);
            assert_eq!(get(CharacteristicType::BatteryLevel), Some(CharValue::Int(level)), "{value}");
            assert_eq!(get(CharacteristicType::StatusLowBattery), Some(CharValue::Int(low)), "{value}");
            assert_eq!(get(CharacteristicType::ChargingState), Some(CharValue::Int(2)));
        }
    }

    #[test]
    fn test_meters_share_one_service() {
        let config = BridgeConfig::default();
        let accessory = configured(
            Device::new("91", "Dryer Plug")
                .with_capability("EnergyMeter")
                .with_capability("PowerMeter")
                .with_attribute("energy", 12.34)
                .with_attribute("power", 0.5),
            &config,
        );
        assert_eq!(accessory.services().count(), 2);
        let get = |c| read(&accessory, &config, ServiceType::EnergyMeter, c);
        assert_eq!(get(CharacteristicType::TotalEnergy), Some(CharValue::Float(12.3)));
        assert_eq!(get(CharacteristicType::CurrentPower), Some(CharValue::Float(0.5)));
    }
}
