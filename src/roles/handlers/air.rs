use super::{active_from_switch, command_with, keyword_state, percent_of, StateTable};
use crate::accessory::{CharValue, CharacteristicSpec, CharacteristicType, Materializer, Props, ServiceType};
use crate::convert;
use crate::device::{CapabilitySet, Device};
use crate::roles::Role;

/// CO2 level (ppm) at or above which the abnormal flag is raised.
const CO2_ABNORMAL_PPM: f64 = 2000.0;

/// Upper bounds of the protocol's air quality bands 1 (excellent) to 4;
/// anything above the last bound is 5 (poor).
const AQI_BANDS: &[f64] = &[50.0, 100.0, 150.0, 200.0];

const FILTER_STATUS: StateTable = &[("normal", 0), ("replace", 1)];

pub struct AirPurifierRole;

impl Role for AirPurifierRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("AirPurifier")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let caps = m.caps();
        let key = m.service(ServiceType::AirPurifier, None, None);

        m.characteristic(&key, active_from_switch());
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::CurrentAirPurifierState, |d, _| {
                // 0 inactive, 2 purifying
                CharValue::Int(if convert::on_off(d.attribute_str("switch")) { 2 } else { 0 })
            })
            .props(Props::valid_values(&[0, 1, 2]))
            .subscribe(&["switch"]),
        );
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::TargetAirPurifierState, |d, _| {
                let auto = d
                    .attribute_str("airPurifierMode")
                    .is_some_and(|v| v.eq_ignore_ascii_case("auto"));
                CharValue::Int(auto as i64)
            })
            .on_set(|_, _, value| {
                let mode = if value.as_bool().unwrap_or(false) { "auto" } else { "manual" };
                command_with("setAirPurifierMode", mode)
            })
            .props(Props::valid_values(&[0, 1]))
            .subscribe(&["airPurifierMode"])
            .requires(caps.has_command("setAirPurifierMode")),
        );
    }
}

pub struct CarbonDioxideRole;

impl Role for CarbonDioxideRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("CarbonDioxideMeasurement")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = m.service(ServiceType::CarbonDioxideSensor, None, None);
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::CarbonDioxideDetected, |d, _| {
                let abnormal = d.attribute_f64("carbonDioxide").is_some_and(|ppm| ppm >= CO2_ABNORMAL_PPM);
                CharValue::Int(abnormal as i64)
            })
            .props(Props::valid_values(&[0, 1]))
            .subscribe(&["carbonDioxide"]),
        );
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::CarbonDioxideLevel, |d, _| {
                CharValue::Float(d.attribute_f64("carbonDioxide").unwrap_or(0.0))
            })
            .props(Props::range(0.0, 100_000.0, 1.0))
            .subscribe(&["carbonDioxide"]),
        );
    }
}

fn air_quality(device: &Device) -> i64 {
    match device.attribute_f64("airQualityIndex") {
        Some(aqi) if aqi >= 0.0 => AQI_BANDS
            .iter()
            .position(|bound| aqi <= *bound)
            .map(|band| band as i64 + 1)
            .unwrap_or(5),
        _ => 0,
    }
}

pub struct AirQualityRole;

impl Role for AirQualityRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("AirQuality")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = m.service(ServiceType::AirQualitySensor, None, None);
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::AirQuality, |d, _| CharValue::Int(air_quality(d)))
                .props(Props::valid_values(&[0, 1, 2, 3, 4, 5]))
                .subscribe(&["airQualityIndex"]),
        );
    }
}

pub struct FilterMaintenanceRole;

impl Role for FilterMaintenanceRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("FilterStatus")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let caps = m.caps();
        let key = m.service(ServiceType::FilterMaintenance, None, None);
        m.characteristic(
            &key,
            keyword_state(CharacteristicType::FilterChangeIndication, "filterStatus", FILTER_STATUS, 0),
        );
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::FilterLifeLevel, |d, _| {
                CharValue::Int(percent_of(d, "filterLife").unwrap_or(100))
            })
            .props(Props::range(0.0, 100.0, 1.0))
            .subscribe(&["filterLife"])
            .requires(caps.has_attribute("filterLife")),
        );
    }
}
