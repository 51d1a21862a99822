//! The bridge: owns every accessory and wires the pieces together.
//!
//! Device descriptors go through classification and materialization,
//! attribute events through the router, and protocol writes through the
//! role set handlers and then the command dispatcher.

use crate::accessory::{AccessorySnapshot, Accessory, BindingKey, CharValue, PassReport, Props};
use crate::config::BridgeConfig;
use crate::device::{AttributeEvent, Device};
use crate::dispatcher::{CommandDispatcher, CommandTransport};
use crate::error::{BridgeError, Result};
use crate::roles::{Classifier, RoleKind};
use crate::router::{AttributeRouter, CharacteristicUpdate};
use futures_util::future::join_all;
use log::{debug, info};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Called with every characteristic value change.
pub type UpdateListener = Arc<dyn Fn(&CharacteristicUpdate) + Send + Sync>;

#[derive(Default)]
struct BridgeState {
    accessories: HashMap<String, Accessory>,
    router: AttributeRouter,
}

pub struct Bridge {
    config: Arc<BridgeConfig>,
    classifier: Classifier,
    state: RwLock<BridgeState>,
    dispatcher: CommandDispatcher,
    listener: RwLock<Option<UpdateListener>>,
}

impl Bridge {
    pub fn new(config: BridgeConfig, transport: Arc<dyn CommandTransport>) -> Self {
        let dispatcher = CommandDispatcher::new(transport, &config);
        Self {
            config: Arc::new(config),
            classifier: Classifier::default(),
            state: RwLock::new(BridgeState::default()),
            dispatcher,
            listener: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn set_listener(&self, listener: UpdateListener) {
        *self.listener.write() = Some(listener);
    }

    /// Add a device or refresh its descriptor, then run a classification
    /// pass. Value changes the pass produced are published like events.
    pub fn upsert_device(&self, device: Device) -> PassReport {
        let (report, updates) = {
            let mut state = self.state.write();
            let BridgeState {
                accessories,
                router,
            } = &mut *state;

            let id = device.id.clone();
            let accessory = match accessories.entry(id.clone()) {
                Entry::Occupied(entry) => {
                    let accessory = entry.into_mut();
                    accessory.replace_device(device);
                    accessory
                }
                Entry::Vacant(entry) => {
                    info!("[Bridge] adding {} ({})", id, device.name);
                    entry.insert(Accessory::new(device))
                }
            };

            let before: HashMap<BindingKey, u32> = accessory
                .bindings()
                .map(|(binding, c)| (binding, c.version()))
                .collect();
            let report = accessory.configure(&self.classifier, &self.config);
            if !report.cached {
                info!("[Bridge] {id}: roles {:?}", report.roles);
            }
            router.register(accessory);

            let updates: Vec<CharacteristicUpdate> = accessory
                .bindings()
                .filter(|(binding, c)| {
                    before.get(binding).is_some_and(|version| *version != c.version())
                })
                .map(|(binding, c)| CharacteristicUpdate {
                    device_id: id.clone(),
                    binding,
                    value: c.value().clone(),
                })
                .collect();
            (report, updates)
        };

        self.publish(&updates);
        report
    }

    /// Full refresh: upsert every listed device and drop the ones that are
    /// no longer listed. Returns the ids of dropped devices.
    pub fn sync_devices(&self, devices: Vec<Device>) -> Vec<String> {
        let listed: HashSet<String> = devices.iter().map(|d| d.id.clone()).collect();
        for device in devices {
            self.upsert_device(device);
        }

        let stale: Vec<String> = self
            .state
            .read()
            .accessories
            .keys()
            .filter(|id| !listed.contains(*id))
            .cloned()
            .collect();
        for id in &stale {
            self.remove_device(id);
        }
        stale
    }

    pub fn remove_device(&self, device_id: &str) -> bool {
        let mut state = self.state.write();
        state.router.unregister(device_id);
        let removed = state.accessories.remove(device_id).is_some();
        if removed {
            info!("[Bridge] removed {device_id}");
        }
        removed
    }

    /// Apply a live attribute change. Events for unknown devices are dropped.
    pub fn handle_event(&self, event: &AttributeEvent) -> Vec<CharacteristicUpdate> {
        let updates = {
            let mut state = self.state.write();
            let BridgeState {
                accessories,
                router,
            } = &mut *state;
            let Some(accessory) = accessories.get_mut(&event.device_id) else {
                debug!(
                    "[Bridge] dropping {} event for unknown device {}",
                    event.attribute, event.device_id
                );
                return Vec::new();
            };
            router.route(accessory, event, self.classifier.registry(), &self.config)
        };

        self.publish(&updates);
        updates
    }

    /// Current protocol value, derived from the latest hub state.
    pub fn read_characteristic(&self, device_id: &str, binding: &BindingKey) -> Result<CharValue> {
        let state = self.state.read();
        let accessory = locate(&state.accessories, device_id, binding)?;
        let characteristic = accessory
            .characteristic(binding)
            .ok_or_else(|| unknown_characteristic(binding))?;
        Ok(characteristic.read(accessory.device(), &self.config))
    }

    /// Translate a protocol write into hub commands and send them.
    ///
    /// The local value is not changed: it follows once the hub reports the
    /// new attribute value.
    pub async fn write_characteristic(
        &self,
        device_id: &str,
        binding: &BindingKey,
        value: CharValue,
    ) -> Result<()> {
        let commands = {
            let state = self.state.read();
            let accessory = locate(&state.accessories, device_id, binding)?;
            let characteristic = accessory
                .characteristic(binding)
                .ok_or_else(|| unknown_characteristic(binding))?;
            validate(binding, characteristic.props(), &value)?;
            characteristic
                .write(accessory.device(), &self.config, &value)
                .ok_or_else(|| BridgeError::ReadOnly(binding.characteristic.to_string()))?
        };

        if commands.is_empty() {
            debug!("[Bridge] {device_id}: write to {} sends nothing", binding.characteristic);
            return Ok(());
        }

        let results = join_all(
            commands
                .into_iter()
                .map(|command| self.dispatcher.dispatch(device_id, command)),
        )
        .await;
        for result in results {
            result?;
        }
        Ok(())
    }

    pub fn roles(&self, device_id: &str) -> Option<Vec<RoleKind>> {
        self.state
            .read()
            .accessories
            .get(device_id)
            .map(|a| a.roles().to_vec())
    }

    pub fn device_count(&self) -> usize {
        self.state.read().accessories.len()
    }

    /// Snapshot of every accessory, ordered by device id.
    pub fn snapshot(&self) -> Vec<AccessorySnapshot> {
        let state = self.state.read();
        let mut snapshots: Vec<AccessorySnapshot> =
            state.accessories.values().map(Accessory::snapshot).collect();
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots
    }

    fn publish(&self, updates: &[CharacteristicUpdate]) {
        if updates.is_empty() {
            return;
        }
        let listener = self.listener.read().clone();
        if let Some(listener) = listener {
            for update in updates {
                listener(update);
            }
        }
    }
}

fn locate<'a>(
    accessories: &'a HashMap<String, Accessory>,
    device_id: &str,
    binding: &BindingKey,
) -> Result<&'a Accessory> {
    let accessory = accessories
        .get(device_id)
        .ok_or_else(|| BridgeError::UnknownDevice(device_id.to_string()))?;
    if accessory.service(&binding.service).is_none() {
        return Err(BridgeError::UnknownService {
            device_id: device_id.to_string(),
            service: binding.service.to_string(),
        });
    }
    Ok(accessory)
}

fn unknown_characteristic(binding: &BindingKey) -> BridgeError {
    BridgeError::UnknownCharacteristic {
        service: binding.service.to_string(),
        characteristic: binding.characteristic.to_string(),
    }
}

/// Reject values the declared constraints cannot accept at all. Numbers
/// outside the range are clamped later, not rejected.
fn validate(binding: &BindingKey, props: &Props, value: &CharValue) -> Result<()> {
    let invalid = |reason: String| BridgeError::InvalidValue {
        characteristic: binding.characteristic.to_string(),
        reason,
    };
    if let Some(valid) = &props.valid_values {
        return match value.as_i64() {
            Some(v) if valid.contains(&v) => Ok(()),
            _ => Err(invalid(format!("{value:?} is not one of {valid:?}"))),
        };
    }
    if (props.min.is_some() || props.max.is_some()) && value.as_f64().is_none() {
        return Err(invalid(format!("{value:?} is not a number")));
    }
    Ok(())
}
