//! Role handlers: one stateless strategy object per role.
//!
//! Each handler declares its services through the [`Materializer`], binds
//! always-present characteristics unconditionally and conditional ones
//! behind `requires(..)`, and names the hub attributes each binding follows.
//!
//! [`Materializer`]: crate::accessory::Materializer

pub mod access;
pub mod air;
pub mod button;
pub mod climate;
pub mod fan;
pub mod light;
pub mod power;
pub mod security;
pub mod sensors;
pub mod speaker;
pub mod switch;
pub mod virtuals;

use crate::accessory::{CharValue, CharacteristicSpec, CharacteristicType, Props};
use crate::config::BridgeConfig;
use crate::convert;
use crate::device::{Device, DeviceCommand};
use serde_json::Value;

/// Protocol enum values are small unsigned integers.
pub(crate) type StateTable = &'static [(&'static str, i64)];

/// On/off bound to the `switch` attribute and the `on`/`off` commands.
pub(crate) fn on_state() -> CharacteristicSpec {
    CharacteristicSpec::new(CharacteristicType::On, |d, _| {
        convert::on_off(d.attribute_str("switch")).into()
    })
    .on_set(|_, _, value| {
        let on = value.as_bool().unwrap_or(false);
        vec![DeviceCommand::new(convert::on_off_keyword(on))]
    })
    .subscribe(&["switch"])
}

/// Active (0/1) bound to the `switch` attribute and the `on`/`off` commands.
pub(crate) fn active_from_switch() -> CharacteristicSpec {
    CharacteristicSpec::new(CharacteristicType::Active, |d, _| {
        CharValue::Int(convert::on_off(d.attribute_str("switch")) as i64)
    })
    .on_set(|_, _, value| command(convert::on_off_keyword(value.as_bool().unwrap_or(false))))
    .props(Props::valid_values(&[0, 1]))
    .subscribe(&["switch"])
}

pub(crate) fn percent_of(device: &Device, attribute: &str) -> Option<i64> {
    device
        .attribute_f64(attribute)
        .map(|v| convert::clamp_percent(v).round() as i64)
}

/// 0-100 value read from `attribute`, written with `command(value)`.
pub(crate) fn percent_spec(
    kind: CharacteristicType,
    attribute: &'static str,
    command: &'static str,
) -> CharacteristicSpec {
    CharacteristicSpec::new(kind, move |d, _| {
        CharValue::Int(percent_of(d, attribute).unwrap_or(0))
    })
    .on_set(move |_, _, value| match value.as_f64() {
        Some(v) => command_with(command, convert::clamp_percent(v).round() as i64),
        None => Vec::new(),
    })
    .props(Props::range(0.0, 100.0, 1.0))
    .subscribe(&[attribute])
}

/// Enum state looked up from a keyword attribute.
pub(crate) fn keyword_state(
    kind: CharacteristicType,
    attribute: &'static str,
    table: StateTable,
    default: i64,
) -> CharacteristicSpec {
    CharacteristicSpec::new(kind, move |d, _| {
        CharValue::Int(convert::lookup(table, d.attribute_str(attribute), default))
    })
    .props(Props::valid_values(&distinct_values(table, default)))
    .subscribe(&[attribute])
}

fn distinct_values(table: StateTable, default: i64) -> Vec<i64> {
    let mut values: Vec<i64> = table.iter().map(|(_, v)| *v).collect();
    values.push(default);
    values.sort_unstable();
    values.dedup();
    values
}

/// Hub temperature attribute converted to the protocol's Celsius.
pub(crate) fn temperature_of(device: &Device, config: &BridgeConfig, attribute: &str) -> Option<f64> {
    device
        .attribute_f64(attribute)
        .map(|v| convert::temperature_to_protocol(v, config.temperature_unit))
}

pub(crate) fn command_with(command: &str, param: impl Into<Value>) -> Vec<DeviceCommand> {
    vec![DeviceCommand::new(command).with_param(param)]
}

pub(crate) fn command(command: &str) -> Vec<DeviceCommand> {
    vec![DeviceCommand::new(command)]
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::accessory::{Accessory, BindingKey, CharValue, CharacteristicType, ServiceKey, ServiceType};
    use crate::config::BridgeConfig;
    use crate::device::{Device, DeviceCommand};
    use crate::roles::Classifier;

    pub fn configured(device: Device, config: &BridgeConfig) -> Accessory {
        let mut accessory = Accessory::new(device);
        accessory.configure(&Classifier::default(), config);
        accessory
    }

    pub fn binding(kind: ServiceType, characteristic: CharacteristicType) -> BindingKey {
        BindingKey {
            service: ServiceKey::new(kind),
            characteristic,
        }
    }

    pub fn read(
        accessory: &Accessory,
        config: &BridgeConfig,
        kind: ServiceType,
        characteristic: CharacteristicType,
    ) -> Option<CharValue> {
        accessory
            .characteristic(&binding(kind, characteristic))
            .map(|c| c.read(accessory.device(), config))
    }

    pub fn write(
        accessory: &Accessory,
        config: &BridgeConfig,
        kind: ServiceType,
        characteristic: CharacteristicType,
        value: impl Into<CharValue>,
    ) -> Vec<DeviceCommand> {
        accessory
            .characteristic(&binding(kind, characteristic))
            .and_then(|c| c.write(accessory.device(), config, &value.into()))
            .unwrap_or_default()
    }
}
