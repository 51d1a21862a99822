//! Accessory-side model: one [`Accessory`] per hub device.
//!
//! An accessory owns the hub [`Device`] it mirrors, the protocol services
//! materialized for it, and the cached classification of the device.

pub mod characteristic;
pub mod materializer;
pub mod service;

pub use characteristic::{CharValue, Characteristic, CharacteristicType, Props};
pub use materializer::{CharacteristicSpec, CleanupReport, Materializer, PassContext};
pub use service::{Service, ServiceKey, ServiceType};

use crate::config::BridgeConfig;
use crate::device::{CapabilitySet, Device};
use crate::roles::{Classifier, RoleKind};
use log::warn;
use serde::Serialize;
use std::collections::BTreeMap;

/// Address of one characteristic binding on an accessory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BindingKey {
    pub service: ServiceKey,
    pub characteristic: CharacteristicType,
}

/// Cached result of classifying a device.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub fingerprint: u64,
    pub roles: Vec<RoleKind>,
}

/// Outcome of one classification pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    pub roles: Vec<RoleKind>,
    /// True when the roles came from the classification cache.
    pub cached: bool,
    pub cleanup: CleanupReport,
}

#[derive(Debug)]
pub struct Accessory {
    device: Device,
    services: BTreeMap<ServiceKey, Service>,
    classification: Option<Classification>,
}

impl Accessory {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            services: BTreeMap::new(),
            classification: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.device.id
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Replace the hub descriptor (full refresh). Takes effect on the next pass.
    pub fn replace_device(&mut self, device: Device) {
        self.device = device;
    }

    /// Record a live attribute value. Only the update router writes here.
    pub(crate) fn set_attribute(&mut self, attribute: &str, value: serde_json::Value) {
        self.device.attributes.insert(attribute.to_string(), value);
    }

    /// Roles matched by the last pass.
    pub fn roles(&self) -> &[RoleKind] {
        self.classification
            .as_ref()
            .map(|c| c.roles.as_slice())
            .unwrap_or(&[])
    }

    pub fn service(&self, key: &ServiceKey) -> Option<&Service> {
        self.services.get(key)
    }

    pub fn service_mut(&mut self, key: &ServiceKey) -> Option<&mut Service> {
        self.services.get_mut(key)
    }

    /// First service of the given type, whatever its subtype.
    pub fn find_service(&self, kind: ServiceType) -> Option<&Service> {
        self.services.values().find(|s| s.key.kind == kind)
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    pub fn characteristic(&self, binding: &BindingKey) -> Option<&Characteristic> {
        self.services
            .get(&binding.service)?
            .characteristic(binding.characteristic)
    }

    /// Split borrow: the device (read) and one characteristic (write).
    pub(crate) fn binding_mut(
        &mut self,
        binding: &BindingKey,
    ) -> Option<(&Device, &mut Characteristic)> {
        let characteristic = self
            .services
            .get_mut(&binding.service)?
            .characteristic_mut(binding.characteristic)?;
        Some((&self.device, characteristic))
    }

    /// Run one classification pass: classify (cached), materialize every
    /// matched role, then clean up whatever the pass did not touch.
    pub fn configure(&mut self, classifier: &Classifier, config: &BridgeConfig) -> PassReport {
        let caps = CapabilitySet::new(&self.device, config);
        let fingerprint = classifier.fingerprint(&caps, config);

        let (roles, cached) = match &self.classification {
            Some(c) if c.fingerprint == fingerprint => (c.roles.clone(), true),
            _ => (classifier.classify(&caps), false),
        };
        if roles.is_empty() && !cached {
            warn!(
                "[Classifier] {} ({}): no roles matched, exposing identity only",
                self.device.id, self.device.name
            );
        }

        let mut pass = PassContext::new();
        {
            let mut materializer = Materializer::new(&caps, config, &mut self.services, &mut pass);
            configure_information(&mut materializer);
            for role in &roles {
                classifier.registry().handler(*role).configure(&mut materializer);
            }
        }
        let cleanup = pass.finish(&self.device.id, &mut self.services);

        self.classification = Some(Classification {
            fingerprint,
            roles: roles.clone(),
        });

        PassReport {
            roles,
            cached,
            cleanup,
        }
    }

    /// Every characteristic on every service, with its address.
    pub fn bindings(&self) -> impl Iterator<Item = (BindingKey, &Characteristic)> {
        self.services.values().flat_map(|service| {
            service.characteristics().map(move |characteristic| {
                (
                    BindingKey {
                        service: service.key.clone(),
                        characteristic: characteristic.kind(),
                    },
                    characteristic,
                )
            })
        })
    }

    /// Every (attribute, binding) pair the current bindings subscribe to.
    pub fn subscriptions(&self) -> Vec<(String, BindingKey)> {
        self.bindings()
            .flat_map(|(binding, characteristic)| {
                characteristic
                    .attributes()
                    .iter()
                    .map(move |attribute| (attribute.clone(), binding.clone()))
            })
            .collect()
    }

    pub fn snapshot(&self) -> AccessorySnapshot {
        AccessorySnapshot {
            id: self.device.id.clone(),
            name: self.device.name.clone(),
            roles: self.roles().to_vec(),
            services: self
                .services
                .values()
                .map(|service| ServiceSnapshot {
                    key: service.key.to_string(),
                    name: service.display_name.clone(),
                    primary: service.primary,
                    characteristics: service
                        .characteristics()
                        .map(|c| CharacteristicSnapshot {
                            kind: c.kind(),
                            value: c.value().clone(),
                            props: c.props().clone(),
                            writable: c.is_writable(),
                            attributes: c.attributes().to_vec(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Identity service: present on every accessory, never cleaned up.
fn configure_information(m: &mut Materializer<'_>) {
    let device = m.device();
    let key = m.service(ServiceType::AccessoryInformation, None, None);
    let text = |value: &Option<String>, fallback: &str| {
        value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    };

    m.characteristic(
        &key,
        CharacteristicSpec::constant(CharacteristicType::Name, device.name.as_str()),
    );
    m.characteristic(
        &key,
        CharacteristicSpec::constant(
            CharacteristicType::Manufacturer,
            text(&device.manufacturer, "Unknown"),
        ),
    );
    m.characteristic(
        &key,
        CharacteristicSpec::constant(CharacteristicType::Model, text(&device.model, "Unknown")),
    );
    m.characteristic(
        &key,
        CharacteristicSpec::constant(
            CharacteristicType::SerialNumber,
            text(&device.serial, &device.id),
        ),
    );
    m.characteristic(
        &key,
        CharacteristicSpec::constant(
            CharacteristicType::FirmwareRevision,
            text(&device.firmware, "1.0.0"),
        ),
    );
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacteristicSnapshot {
    pub kind: CharacteristicType,
    pub value: CharValue,
    pub props: Props,
    pub writable: bool,
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceSnapshot {
    pub key: String,
    pub name: String,
    pub primary: bool,
    pub characteristics: Vec<CharacteristicSnapshot>,
}

/// Serializable view of an accessory's services and current values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessorySnapshot {
    pub id: String,
    pub name: String,
    pub roles: Vec<RoleKind>,
    pub services: Vec<ServiceSnapshot>,
}
