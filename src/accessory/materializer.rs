//! Idempotent upsert of services and characteristics.
//!
//! A classification pass creates a fresh [`PassContext`], lets every matched
//! role upsert what it needs through a [`Materializer`], then hands the
//! context to [`PassContext::finish`], which removes whatever was not marked
//! active during the pass and elects the primary service.

use super::characteristic::{
    CharValue, Characteristic, CharacteristicType, GetHandler, Props, SetHandler,
};
use super::service::{Service, ServiceKey, ServiceType};
use crate::config::BridgeConfig;
use crate::device::{CapabilitySet, Device, DeviceCommand};
use log::{debug, info};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Everything a role declares about one characteristic.
pub struct CharacteristicSpec {
    kind: CharacteristicType,
    get_handler: GetHandler,
    set_handler: Option<SetHandler>,
    props: Props,
    attributes: Vec<String>,
    pre_req: Option<bool>,
    remove_if_missing: bool,
    value: Option<CharValue>,
    event: bool,
}

impl CharacteristicSpec {
    pub fn new(
        kind: CharacteristicType,
        get: impl Fn(&Device, &BridgeConfig) -> CharValue + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            get_handler: Arc::new(get),
            set_handler: None,
            props: Props::default(),
            attributes: Vec::new(),
            pre_req: None,
            remove_if_missing: true,
            value: None,
            event: false,
        }
    }

    /// A characteristic whose value never follows hub state.
    pub fn constant(kind: CharacteristicType, value: impl Into<CharValue>) -> Self {
        let value = value.into();
        let static_value = value.clone();
        Self::new(kind, move |_, _| static_value.clone()).value(value)
    }

    pub fn on_set(
        mut self,
        set: impl Fn(&Device, &BridgeConfig, &CharValue) -> Vec<DeviceCommand> + Send + Sync + 'static,
    ) -> Self {
        self.set_handler = Some(Arc::new(set));
        self
    }

    pub fn props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    /// Hub attributes whose changes must refresh this characteristic.
    pub fn subscribe(mut self, attributes: &[&str]) -> Self {
        self.attributes = attributes.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Only bind when `present` holds; otherwise the characteristic is absent.
    pub fn requires(mut self, present: bool) -> Self {
        self.pre_req = Some(present);
        self
    }

    /// When the prerequisite fails, leave an existing binding untouched
    /// instead of removing it.
    pub fn keep_if_missing(mut self) -> Self {
        self.remove_if_missing = false;
        self
    }

    /// Event characteristic: its value is only ever emitted by an update
    /// hook, so passes bind it without pushing or refreshing a value.
    pub fn event(mut self) -> Self {
        self.event = true;
        self
    }

    /// Push this value instead of deriving one from the device.
    pub fn value(mut self, value: impl Into<CharValue>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Per-pass bookkeeping of what the matched roles asked for.
#[derive(Debug, Default)]
pub struct PassContext {
    active_services: Vec<ServiceKey>,
    active_characteristics: HashSet<(ServiceKey, CharacteristicType)>,
}

/// What cleanup removed at the end of a pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CleanupReport {
    pub removed_services: Vec<ServiceKey>,
    pub removed_characteristics: Vec<(ServiceKey, CharacteristicType)>,
}

impl CleanupReport {
    pub fn is_empty(&self) -> bool {
        self.removed_services.is_empty() && self.removed_characteristics.is_empty()
    }
}

impl PassContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn mark_service(&mut self, key: &ServiceKey) {
        if !self.active_services.contains(key) {
            self.active_services.push(key.clone());
        }
    }

    fn mark_characteristic(&mut self, key: &ServiceKey, kind: CharacteristicType) {
        self.active_characteristics.insert((key.clone(), kind));
    }

    fn is_service_active(&self, key: &ServiceKey) -> bool {
        key.is_permanent() || self.active_services.contains(key)
    }

    /// Remove everything not marked active during the pass and elect the
    /// primary service: the first non-permanent service activated.
    pub fn finish(
        self,
        device_id: &str,
        services: &mut BTreeMap<ServiceKey, Service>,
    ) -> CleanupReport {
        let mut report = CleanupReport::default();

        services.retain(|key, _| {
            let keep = self.is_service_active(key);
            if !keep {
                info!("[Materializer] {device_id}: removing stale service {key}");
                report.removed_services.push(key.clone());
            }
            keep
        });

        for (key, service) in services.iter_mut() {
            service.characteristics.retain(|kind, _| {
                let keep = self.active_characteristics.contains(&(key.clone(), *kind));
                if !keep {
                    info!("[Materializer] {device_id}: removing stale characteristic {kind} from {key}");
                    report.removed_characteristics.push((key.clone(), *kind));
                }
                keep
            });
        }

        let primary = self
            .active_services
            .iter()
            .find(|key| !key.is_permanent() && services.contains_key(*key))
            .cloned();
        for (key, service) in services.iter_mut() {
            service.primary = primary.as_ref() == Some(key);
        }

        report
    }
}

/// Upsert interface handed to role handlers during a pass.
pub struct Materializer<'a> {
    device: &'a Device,
    caps: &'a CapabilitySet<'a>,
    config: &'a BridgeConfig,
    services: &'a mut BTreeMap<ServiceKey, Service>,
    pass: &'a mut PassContext,
}

impl<'a> Materializer<'a> {
    pub fn new(
        caps: &'a CapabilitySet<'a>,
        config: &'a BridgeConfig,
        services: &'a mut BTreeMap<ServiceKey, Service>,
        pass: &'a mut PassContext,
    ) -> Self {
        Self {
            device: caps.device(),
            caps,
            config,
            services,
            pass,
        }
    }

    pub fn device(&self) -> &'a Device {
        self.device
    }

    pub fn caps(&self) -> &'a CapabilitySet<'a> {
        self.caps
    }

    pub fn config(&self) -> &'a BridgeConfig {
        self.config
    }

    /// Find or create a service and mark it active for this pass.
    ///
    /// `name` defaults to the device name. Both `name` and `subtype` are
    /// reduced to a safe character set.
    pub fn service(
        &mut self,
        kind: ServiceType,
        name: Option<&str>,
        subtype: Option<&str>,
    ) -> ServiceKey {
        let raw_name = name.unwrap_or(&self.device.name);
        let display_name = sanitize_name(raw_name);
        if display_name != raw_name {
            debug!(
                "[Materializer] {}: service name {raw_name:?} sanitized to {display_name:?}",
                self.device.id
            );
        }

        let key = match subtype {
            Some(raw) => {
                let subtype = sanitize_subtype(raw);
                if subtype != raw {
                    debug!(
                        "[Materializer] {}: subtype {raw:?} sanitized to {subtype:?}",
                        self.device.id
                    );
                }
                ServiceKey::with_subtype(kind, subtype)
            }
            None => ServiceKey::new(kind),
        };

        match self.services.get_mut(&key) {
            Some(service) => {
                if service.display_name != display_name {
                    debug!(
                        "[Materializer] {}: renaming {key} to {display_name:?}",
                        self.device.id
                    );
                    service.display_name = display_name;
                }
            }
            None => {
                debug!("[Materializer] {}: adding service {key}", self.device.id);
                self.services
                    .insert(key.clone(), Service::new(key.clone(), display_name));
            }
        }

        self.pass.mark_service(&key);
        key
    }

    /// Find or create a characteristic on `service` and (re)bind it.
    ///
    /// Returns false when the prerequisite failed and nothing was bound.
    pub fn characteristic(&mut self, service: &ServiceKey, spec: CharacteristicSpec) -> bool {
        let device = self.device;
        let config = self.config;
        let Some(target) = self.services.get_mut(service) else {
            return false;
        };

        if spec.pre_req == Some(false) {
            if spec.remove_if_missing {
                if target.characteristics.remove(&spec.kind).is_some() {
                    info!(
                        "[Materializer] {}: prerequisite lost, removing {} from {service}",
                        device.id, spec.kind
                    );
                }
            } else if target.characteristics.contains_key(&spec.kind) {
                self.pass.mark_characteristic(service, spec.kind);
            }
            return false;
        }

        let characteristic = target
            .characteristics
            .entry(spec.kind)
            .or_insert_with(|| Characteristic::new(spec.kind, spec.get_handler.clone()));
        characteristic.rebind(spec.get_handler, spec.set_handler, spec.props, spec.attributes);
        match spec.value {
            _ if spec.event => {}
            Some(value) => {
                characteristic.push(value);
            }
            None => {
                characteristic.refresh(device, config);
            }
        }

        self.pass.mark_characteristic(service, spec.kind);
        true
    }
}

/// Keep letters, digits, spaces, apostrophes, hyphens and periods; the
/// result starts and ends with a letter or digit.
pub fn sanitize_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '\'' | '-' | '.'))
        .collect();
    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c: char| !c.is_alphanumeric());
    if trimmed.is_empty() {
        "Unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Keep ASCII letters, digits, underscores and hyphens.
pub fn sanitize_subtype(subtype: &str) -> String {
    subtype
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect()
}
