//! Accessory services.

use super::characteristic::{Characteristic, CharacteristicType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
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
pub enum ServiceType {
    AccessoryInformation,
    Switch,
    Outlet,
    Lightbulb,
    Fanv2,
    AirPurifier,
    LockMechanism,
    Valve,
    GarageDoorOpener,
    WindowCovering,
    Thermostat,
    SecuritySystem,
    Speaker,
    StatelessProgrammableSwitch,
    ContactSensor,
    MotionSensor,
    OccupancySensor,
    LeakSensor,
    SmokeSensor,
    CarbonMonoxideSensor,
    CarbonDioxideSensor,
    AirQualitySensor,
    TemperatureSensor,
    HumiditySensor,
    LightSensor,
    Battery,
    EnergyMeter,
    FilterMaintenance,
}

/// Identifies a service on an accessory: its type plus an optional subtype
/// for types that appear more than once (e.g. one per button).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceKey {
    pub kind: ServiceType,
    pub subtype: Option<String>,
}

impl ServiceKey {
    pub fn new(kind: ServiceType) -> Self {
        Self {
            kind,
            subtype: None,
        }
    }

    pub fn with_subtype(kind: ServiceType, subtype: impl Into<String>) -> Self {
        Self {
            kind,
            subtype: Some(subtype.into()),
        }
    }

    pub fn information() -> Self {
        Self::new(ServiceType::AccessoryInformation)
    }

    /// Permanent services are never removed by cleanup.
    pub fn is_permanent(&self) -> bool {
        self.kind == ServiceType::AccessoryInformation
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.subtype.as_deref().unwrap_or(""))
    }
}

#[derive(Debug)]
pub struct Service {
    pub(crate) key: ServiceKey,
    pub(crate) display_name: String,
    pub(crate) primary: bool,
    pub(crate) characteristics: BTreeMap<CharacteristicType, Characteristic>,
}

impl Service {
    pub fn new(key: ServiceKey, display_name: impl Into<String>) -> Self {
        Self {
            key,
            display_name: display_name.into(),
            primary: false,
            characteristics: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn characteristic(&self, kind: CharacteristicType) -> Option<&Characteristic> {
        self.characteristics.get(&kind)
    }

    pub fn characteristic_mut(&mut self, kind: CharacteristicType) -> Option<&mut Characteristic> {
        self.characteristics.get_mut(&kind)
    }

    pub fn characteristics(&self) -> impl Iterator<Item = &Characteristic> {
        self.characteristics.values()
    }
}
