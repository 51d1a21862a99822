//! Ordered role table.
//!
//! Declaration order matters only for exclusions: a role listed earlier can
//! shadow later roles through `exclude_roles`. A device may match any number
//! of roles.

use super::handlers::{
    access, air, button, climate, fan, light, power, security, sensors, speaker, switch, virtuals,
};
use super::{Role, RoleKind};
use crate::accessory::Materializer;
use crate::device::CapabilitySet;

pub struct RoleDefinition {
    pub kind: RoleKind,
    pub handler: &'static dyn Role,
    /// Skip the role when the device has any of these capabilities.
    pub exclude_capabilities: &'static [&'static str],
    /// Skip the role when the device reports any of these attributes.
    pub exclude_attributes: &'static [&'static str],
    /// Roles that can no longer match once this one has been accepted.
    pub exclude_roles: &'static [RoleKind],
}

fn role(kind: RoleKind, handler: &'static dyn Role) -> RoleDefinition {
    RoleDefinition {
        kind,
        handler,
        exclude_capabilities: &[],
        exclude_attributes: &[],
        exclude_roles: &[],
    }
}

impl RoleDefinition {
    fn excluding_capabilities(mut self, capabilities: &'static [&'static str]) -> Self {
        self.exclude_capabilities = capabilities;
        self
    }

    fn excluding_attributes(mut self, attributes: &'static [&'static str]) -> Self {
        self.exclude_attributes = attributes;
        self
    }

    fn shadowing(mut self, roles: &'static [RoleKind]) -> Self {
        self.exclude_roles = roles;
        self
    }
}

/// Capabilities that make a device something more specific than a plain switch.
const NOT_A_PLAIN_SWITCH: &[&str] = &[
    "GarageDoorControl",
    "WindowShade",
    "Valve",
    "Lock",
    "FanControl",
];

pub struct RoleRegistry {
    definitions: Vec<RoleDefinition>,
}

impl RoleRegistry {
    pub fn new(definitions: Vec<RoleDefinition>) -> Self {
        Self { definitions }
    }

    /// The built-in role table.
    pub fn standard() -> Self {
        use RoleKind::*;

        Self::new(vec![
            role(WindowCovering, &access::WindowCoveringRole).shadowing(&[Switch, Light]),
            role(GarageDoor, &access::GarageDoorRole).shadowing(&[Switch, ContactSensor]),
            role(Lock, &access::LockRole),
            role(Valve, &access::ValveRole).shadowing(&[Switch]),
            role(SecuritySystem, &security::SecuritySystemRole),
            role(AirPurifier, &air::AirPurifierRole).shadowing(&[Fan, Switch]),
            role(Fan, &fan::FanRole).shadowing(&[Light, Switch]),
            role(Light, &light::LightRole)
                .excluding_capabilities(&["AudioVolume", "MusicPlayer"])
                .shadowing(&[Switch]),
            role(Outlet, &switch::OutletRole).shadowing(&[Switch]),
            role(Speaker, &speaker::SpeakerRole).shadowing(&[Switch]),
            role(Thermostat, &climate::ThermostatRole)
                .shadowing(&[TemperatureSensor, HumiditySensor]),
            role(ThermostatFan, &climate::ThermostatFanRole),
            role(VirtualMode, &virtuals::VirtualModeRole).shadowing(&[Switch]),
            role(VirtualPiston, &virtuals::VirtualPistonRole).shadowing(&[Switch]),
            role(Switch, &switch::SwitchRole)
                .excluding_capabilities(NOT_A_PLAIN_SWITCH)
                .excluding_attributes(&["windowShade", "door"]),
            role(Button, &button::ButtonRole),
            role(ContactSensor, &sensors::ContactSensorRole)
                .excluding_capabilities(&["GarageDoorControl"]),
            role(MotionSensor, &sensors::MotionSensorRole),
            role(PresenceSensor, &sensors::PresenceSensorRole),
            role(LeakSensor, &sensors::LeakSensorRole),
            role(SmokeDetector, &sensors::SmokeDetectorRole),
            role(CarbonMonoxide, &sensors::CarbonMonoxideRole),
            role(CarbonDioxide, &air::CarbonDioxideRole),
            role(AirQuality, &air::AirQualityRole),
            role(TemperatureSensor, &sensors::TemperatureSensorRole)
                .excluding_capabilities(&["Thermostat"]),
            role(HumiditySensor, &sensors::HumiditySensorRole)
                .excluding_capabilities(&["Thermostat"]),
            role(IlluminanceSensor, &sensors::IlluminanceSensorRole),
            role(Battery, &power::BatteryRole),
            role(EnergyMeter, &power::EnergyMeterRole),
            role(PowerMeter, &power::PowerMeterRole),
            role(FilterMaintenance, &air::FilterMaintenanceRole),
        ])
    }

    pub fn definitions(&self) -> &[RoleDefinition] {
        &self.definitions
    }

    pub fn get(&self, kind: RoleKind) -> Option<&RoleDefinition> {
        self.definitions.iter().find(|d| d.kind == kind)
    }

    /// Strategy for a role. Roles missing from the table configure nothing.
    pub fn handler(&self, kind: RoleKind) -> &dyn Role {
        self.get(kind).map(|d| d.handler).unwrap_or(&NoopRole)
    }
}

impl Default for RoleRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

struct NoopRole;

impl Role for NoopRole {
    fn is_supported(&self, _caps: &CapabilitySet<'_>) -> bool {
        false
    }

    fn configure(&self, _m: &mut Materializer<'_>) {}
}
