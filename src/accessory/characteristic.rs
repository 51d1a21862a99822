//! Characteristic bindings.
//!
//! A [`Characteristic`] is one readable (and maybe writable) control point on
//! a service. It holds the binding's get handler (hub state to protocol
//! value), optional set handler (protocol value to hub commands), declared
//! constraints and the hub attributes it follows.

use crate::config::BridgeConfig;
use crate::device::{Device, DeviceCommand};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
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
pub enum CharacteristicType {
    // Identity
    Name,
    Manufacturer,
    Model,
    SerialNumber,
    FirmwareRevision,
    // Power and lighting
    On,
    OutletInUse,
    Brightness,
    Hue,
    Saturation,
    ColorTemperature,
    // Fans and purifiers
    Active,
    RotationSpeed,
    CurrentFanState,
    TargetFanState,
    CurrentAirPurifierState,
    TargetAirPurifierState,
    // Access
    LockCurrentState,
    LockTargetState,
    CurrentDoorState,
    TargetDoorState,
    ObstructionDetected,
    CurrentPosition,
    TargetPosition,
    PositionState,
    InUse,
    ValveType,
    // Climate
    CurrentTemperature,
    TargetTemperature,
    CurrentHeatingCoolingState,
    TargetHeatingCoolingState,
    HeatingThresholdTemperature,
    CoolingThresholdTemperature,
    TemperatureDisplayUnits,
    CurrentRelativeHumidity,
    // Sensors
    ContactSensorState,
    MotionDetected,
    OccupancyDetected,
    LeakDetected,
    SmokeDetected,
    CarbonMonoxideDetected,
    CarbonDioxideDetected,
    CarbonDioxideLevel,
    AirQuality,
    CurrentAmbientLightLevel,
    StatusTampered,
    // Power metering
    CurrentPower,
    TotalEnergy,
    // Battery
    BatteryLevel,
    StatusLowBattery,
    ChargingState,
    FilterChangeIndication,
    FilterLifeLevel,
    // Security
    SecuritySystemCurrentState,
    SecuritySystemTargetState,
    // Audio
    Mute,
    Volume,
    // Buttons
    ProgrammableSwitchEvent,
    ServiceLabelIndex,
}

/// Protocol-side characteristic value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CharValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// No value yet (e.g. a stateless event characteristic before any event).
    Null,
}

impl CharValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CharValue::Bool(b) => Some(*b),
            CharValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CharValue::Int(i) => Some(*i as f64),
            CharValue::Float(f) if f.is_finite() => Some(*f),
            CharValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|f| f.round() as i64)
    }
}

impl From<bool> for CharValue {
    fn from(value: bool) -> Self {
        CharValue::Bool(value)
    }
}

impl From<i64> for CharValue {
    fn from(value: i64) -> Self {
        CharValue::Int(value)
    }
}

impl From<u8> for CharValue {
    fn from(value: u8) -> Self {
        CharValue::Int(value.into())
    }
}

impl From<f64> for CharValue {
    fn from(value: f64) -> Self {
        CharValue::Float(value)
    }
}

impl From<&str> for CharValue {
    fn from(value: &str) -> Self {
        CharValue::Str(value.to_string())
    }
}

impl From<String> for CharValue {
    fn from(value: String) -> Self {
        CharValue::Str(value)
    }
}

/// Declared numeric/enum constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Props {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_values: Option<Vec<i64>>,
}

impl Props {
    pub fn range(min: f64, max: f64, step: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            step: Some(step),
            valid_values: None,
        }
    }

    pub fn valid_values(values: &[i64]) -> Self {
        Self {
            valid_values: Some(values.to_vec()),
            ..Default::default()
        }
    }

    /// Clamp a numeric value into the declared range.
    ///
    /// Integers stay integers; non-numeric values pass through untouched.
    pub fn clamp(&self, value: CharValue) -> CharValue {
        let lo = self.min.unwrap_or(f64::NEG_INFINITY);
        let hi = self.max.unwrap_or(f64::INFINITY);
        match value {
            CharValue::Int(i) => CharValue::Int((i as f64).clamp(lo, hi).round() as i64),
            CharValue::Float(f) if f.is_nan() => CharValue::Float(self.min.unwrap_or(0.0)),
            CharValue::Float(f) => CharValue::Float(f.clamp(lo, hi)),
            other => other,
        }
    }
}

/// Reads the hub's device state and produces the protocol value.
pub type GetHandler = Arc<dyn Fn(&Device, &BridgeConfig) -> CharValue + Send + Sync>;

/// Turns a protocol write into the hub commands that realize it.
pub type SetHandler =
    Arc<dyn Fn(&Device, &BridgeConfig, &CharValue) -> Vec<DeviceCommand> + Send + Sync>;

pub struct Characteristic {
    kind: CharacteristicType,
    props: Props,
    value: CharValue,
    version: u32,
    get_handler: GetHandler,
    set_handler: Option<SetHandler>,
    attributes: Vec<String>,
}

impl Characteristic {
    pub fn new(kind: CharacteristicType, get_handler: GetHandler) -> Self {
        Self {
            kind,
            props: Props::default(),
            value: CharValue::Null,
            version: 0,
            get_handler,
            set_handler: None,
            attributes: Vec::new(),
        }
    }

    pub fn kind(&self) -> CharacteristicType {
        self.kind
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Last value pushed to the protocol side.
    pub fn value(&self) -> &CharValue {
        &self.value
    }

    /// Incremented every time a different value is pushed.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn is_writable(&self) -> bool {
        self.set_handler.is_some()
    }

    /// Hub attributes this binding follows.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Replace the binding's handlers, constraints and subscriptions.
    pub(crate) fn rebind(
        &mut self,
        get_handler: GetHandler,
        set_handler: Option<SetHandler>,
        props: Props,
        attributes: Vec<String>,
    ) {
        self.get_handler = get_handler;
        self.set_handler = set_handler;
        self.props = props;
        self.attributes = attributes;
    }

    /// Derive the current protocol value from the device, within constraints.
    pub fn read(&self, device: &Device, config: &BridgeConfig) -> CharValue {
        self.props.clamp((self.get_handler)(device, config))
    }

    pub fn write(
        &self,
        device: &Device,
        config: &BridgeConfig,
        value: &CharValue,
    ) -> Option<Vec<DeviceCommand>> {
        let handler = self.set_handler.as_ref()?;
        Some(handler(device, config, &self.props.clamp(value.clone())))
    }

    /// Store a new protocol value. Returns true if it differs from the last one.
    pub fn push(&mut self, value: CharValue) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        self.version = self.version.wrapping_add(1);
        true
    }

    /// Store an event value. Always counts as a change, so repeating the
    /// same button press is still delivered.
    pub fn emit(&mut self, value: CharValue) {
        self.value = value;
        self.version = self.version.wrapping_add(1);
    }

    /// Re-derive the value from the device and push it.
    pub fn refresh(&mut self, device: &Device, config: &BridgeConfig) -> bool {
        let value = self.read(device, config);
        self.push(value)
    }
}

impl fmt::Debug for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Characteristic")
            .field("kind", &self.kind)
            .field("props", &self.props)
            .field("value", &self.value)
            .field("version", &self.version)
            .field("writable", &self.is_writable())
            .field("attributes", &self.attributes)
            .finish()
    }
}
