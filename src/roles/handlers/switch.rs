use super::on_state;
use crate::accessory::{CharacteristicSpec, CharacteristicType, Materializer, ServiceType};
use crate::convert;
use crate::device::CapabilitySet;
use crate::roles::Role;

/// Plain on/off switch.
pub struct SwitchRole;

impl Role for SwitchRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("Switch")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = m.service(ServiceType::Switch, None, None);
        m.characteristic(&key, on_state());
    }
}

/// Wall outlet. In-use follows metered power when the device reports it,
/// otherwise the switch state.
pub struct OutletRole;

impl Role for OutletRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("Outlet")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = m.service(ServiceType::Outlet, None, None);
        m.characteristic(&key, on_state());
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::OutletInUse, |d, _| {
                match d.attribute_f64("power") {
                    Some(watts) => (watts > 0.0).into(),
                    None => convert::on_off(d.attribute_str("switch")).into(),
                }
            })
            .subscribe(&["power", "switch"]),
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

    #[test]
    fn test_switch_reads_and_writes() {
        let config = BridgeConfig::default();
        let accessory = configured(
            Device::new("1", "Porch")
                .with_capability("Switch")
                .with_attribute("switch", "on"),
            &config,
        );
        assert_eq!(accessory.roles(), [RoleKind::Switch]);
        assert_eq!(
            read(&accessory, &config, ServiceType::Switch, CharacteristicType::On),
            Some(CharValue::Bool(true))
        );
        assert_eq!(
            write(&accessory, &config, ServiceType::Switch, CharacteristicType::On, false),
            vec![DeviceCommand::new("off")]
        );
    }

    #[test]
    fn test_outlet_in_use_prefers_power() {
        let config = BridgeConfig::default();
        let accessory = configured(
            Device::new("2", "Kettle Plug")
                .with_capability("Outlet")
                .with_capability("Switch")
                .with_attribute("switch", "on")
                .with_attribute("power", 0),
            &config,
        );
        assert_eq!(accessory.roles(), [RoleKind::Outlet]);
        assert_eq!(
            read(&accessory, &config, ServiceType::Outlet, CharacteristicType::OutletInUse),
            Some(CharValue::Bool(false))
        );

        let accessory = configured(
            Device::new("3", "Lamp Plug")
                .with_capability("Outlet")
                .with_attribute("switch", "on"),
            &config,
        );
        assert_eq!(
            read(&accessory, &config, ServiceType::Outlet, CharacteristicType::OutletInUse),
            Some(CharValue::Bool(true))
        );
    }
}
