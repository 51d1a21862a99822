//! Capability Set: read-only membership queries over a device.
//!
//! Computed once per classification pass (with configured exclusions and
//! extra flags applied) and passed by reference to the classifier and every
//! role handler.

use super::Device;
use crate::config::BridgeConfig;
use serde_json::Value;
use std::collections::BTreeSet;

const LIGHT_WORDS: &[&str] = &["light", "lamp", "bulb", "sconce", "chandelier"];
const FAN_WORDS: &[&str] = &["fan"];

pub struct CapabilitySet<'a> {
    device: &'a Device,
    capabilities: BTreeSet<&'a str>,
    flags: BTreeSet<&'a str>,
    name_lower: String,
    name_heuristics: bool,
}

impl<'a> CapabilitySet<'a> {
    pub fn new(device: &'a Device, config: &'a BridgeConfig) -> Self {
        let excluded = config.excluded_capabilities_for(&device.id);
        let capabilities = device
            .capabilities
            .iter()
            .map(String::as_str)
            .filter(|c| !excluded.iter().any(|e| e == c))
            .collect();
        let flags = device
            .flags
            .iter()
            .chain(config.flags_for(&device.id))
            .map(String::as_str)
            .collect();

        Self {
            device,
            capabilities,
            flags,
            name_lower: device.name.to_lowercase(),
            name_heuristics: config.name_heuristics,
        }
    }

    pub fn device(&self) -> &'a Device {
        self.device
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.contains(name)
    }

    pub fn has_any_capability(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.has_capability(n))
    }

    /// True when the device reports the attribute (even if its value is null).
    pub fn has_attribute(&self, name: &str) -> bool {
        self.device.attributes.contains_key(name)
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.device.commands.contains(name)
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.contains(name)
    }

    pub fn attribute(&self, name: &str) -> Option<&'a Value> {
        self.device.attribute(name)
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.capabilities.iter().copied()
    }

    pub fn flags(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.flags.iter().copied()
    }

    pub fn looks_like_light(&self) -> bool {
        self.name_heuristics && LIGHT_WORDS.iter().any(|w| self.name_lower.contains(w))
    }

    pub fn looks_like_fan(&self) -> bool {
        self.name_heuristics && FAN_WORDS.iter().any(|w| self.name_lower.contains(w))
    }
}
