//! Hub-side device model.
//!
//! A [`Device`] is the hub's description of one physical or virtual device:
//! what it can do (capabilities, commands) and what it currently reports
//! (attributes). Descriptors arrive from the device directory; attribute
//! values are then kept current by [`AttributeEvent`]s.

pub mod capabilities;

pub use capabilities::CapabilitySet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    #[default]
    Online,
    Offline,
}

/// Device descriptor as delivered by the hub's device directory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub status: DeviceStatus,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub firmware: Option<String>,
    pub serial: Option<String>,
    pub capabilities: BTreeSet<String>,
    pub attributes: BTreeMap<String, Value>,
    pub commands: BTreeSet<String>,
    /// Device-specific hints, e.g. `fan_4_spd` or `virtual_mode`.
    pub flags: BTreeSet<String>,
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_capability(mut self, capability: &str) -> Self {
        self.capabilities.insert(capability.to_string());
        self
    }

    pub fn with_command(mut self, command: &str) -> Self {
        self.commands.insert(command.to_string());
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_flag(mut self, flag: &str) -> Self {
        self.flags.insert(flag.to_string());
        self
    }

    /// Current value of an attribute; JSON `null` counts as missing.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).filter(|v| !v.is_null())
    }

    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }

    /// Numeric attribute value, accepting numbers and numeric strings.
    pub fn attribute_f64(&self, name: &str) -> Option<f64> {
        match self.attribute(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .filter(|v: &f64| v.is_finite())
    }
}

/// Live attribute change pushed (or polled) from the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeEvent {
    pub device_id: String,
    pub attribute: String,
    pub value: Value,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl AttributeEvent {
    pub fn new(device_id: impl Into<String>, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            device_id: device_id.into(),
            attribute: attribute.into(),
            value: value.into(),
            timestamp: Some(Utc::now()),
        }
    }
}

/// A command to invoke on a hub device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub command: String,
    pub params: Vec<Value>,
}

impl DeviceCommand {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: impl Into<Value>) -> Self {
        self.params.push(param.into());
        self
    }
}
