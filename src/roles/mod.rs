//! Accessory roles.
//!
//! A role is a classification label ("light", "lock", "motionSensor", ...)
//! that decides which services and characteristics a device exposes. Each
//! [`RoleKind`] is backed by a stateless [`Role`] strategy object in
//! [`handlers`]; the [`RoleRegistry`] orders them and carries their
//! exclusion rules, and the [`Classifier`] evaluates the registry.

pub mod classifier;
pub mod handlers;
pub mod registry;

pub use classifier::Classifier;
pub use registry::{RoleDefinition, RoleRegistry};

use crate::accessory::{Accessory, Materializer};
use crate::config::BridgeConfig;
use crate::device::{AttributeEvent, CapabilitySet};
use crate::router::CharacteristicUpdate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum RoleKind {
    WindowCovering,
    GarageDoor,
    Lock,
    Valve,
    SecuritySystem,
    AirPurifier,
    Fan,
    Light,
    Outlet,
    Speaker,
    Thermostat,
    ThermostatFan,
    VirtualMode,
    VirtualPiston,
    Switch,
    Button,
    ContactSensor,
    MotionSensor,
    PresenceSensor,
    LeakSensor,
    SmokeDetector,
    CarbonMonoxide,
    CarbonDioxide,
    AirQuality,
    TemperatureSensor,
    HumiditySensor,
    IlluminanceSensor,
    Battery,
    EnergyMeter,
    PowerMeter,
    FilterMaintenance,
}

/// Strategy for one role.
pub trait Role: Send + Sync {
    /// Whether the device plays this role (exclusions are applied by the classifier).
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool;

    /// Upsert this role's services and characteristic bindings.
    fn configure(&self, m: &mut Materializer<'_>);

    /// Extra handling for a live attribute change, beyond refreshing the
    /// bindings subscribed to it. Used for event-style attributes.
    fn handle_attribute_update(
        &self,
        _accessory: &mut Accessory,
        _event: &AttributeEvent,
        _config: &BridgeConfig,
    ) -> Vec<CharacteristicUpdate> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_role_names_are_camel_case() {
        assert_eq!(RoleKind::GarageDoor.to_string(), "garageDoor");
        assert_eq!("energyMeter".parse::<RoleKind>().unwrap(), RoleKind::EnergyMeter);
        assert_eq!(
            serde_json::to_string(&RoleKind::CarbonMonoxide).unwrap(),
            "\"carbonMonoxide\""
        );
    }

    #[test]
    fn test_every_role_is_registered_once() {
        let registry = RoleRegistry::standard();
        for kind in RoleKind::iter() {
            assert_eq!(
                registry.definitions().iter().filter(|d| d.kind == kind).count(),
                1,
                "{kind}"
            );
        }
    }
}
