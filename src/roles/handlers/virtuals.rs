//! Hub automations exposed as switches.

use super::command;
use crate::accessory::{CharValue, CharacteristicSpec, CharacteristicType, Materializer, ServiceType};
use crate::convert;
use crate::device::CapabilitySet;
use crate::roles::Role;

/// A hub mode. On while the mode is active; turning it on activates it.
/// Turning it off does nothing, since leaving a mode means entering another.
pub struct VirtualModeRole;

impl Role for VirtualModeRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_flag("virtual_mode")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = m.service(ServiceType::Switch, None, Some("mode"));
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::On, |d, _| {
                CharValue::Bool(convert::on_off(d.attribute_str("switch")))
            })
            .on_set(|_, _, value| {
                if value.as_bool().unwrap_or(false) {
                    command("activateMode")
                } else {
                    Vec::new()
                }
            })
            .subscribe(&["switch"]),
        );
    }
}

/// A hub rule ("piston"). Momentary: always reads off, turning it on runs it.
pub struct VirtualPistonRole;

impl Role for VirtualPistonRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_flag("virtual_piston")
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let key = m.service(ServiceType::Switch, None, Some("piston"));
        m.characteristic(
            &key,
            CharacteristicSpec::constant(CharacteristicType::On, false).on_set(|_, _, value| {
                if value.as_bool().unwrap_or(false) {
                    command("executePiston")
                } else {
                    Vec::new()
                }
            }),
        );
    }
}
