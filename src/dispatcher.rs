//! Debounced command dispatch.
//!
//! Continuous controls (sliders, steppers) produce bursts of writes. For
//! those commands only the last value of a burst is sent: each call restarts
//! a per-(device, command) timer, and when it finally fires the latest
//! parameters go out once. Every caller in the burst receives that single
//! send's result. Other commands are sent immediately.

use crate::config::BridgeConfig;
use crate::device::DeviceCommand;
use crate::error::CommandError;
use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Delivers commands to the hub.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn send(&self, device_id: &str, command: &DeviceCommand) -> Result<(), CommandError>;
}

type Waiter = oneshot::Sender<Result<(), CommandError>>;
type PendingKey = (String, String);

struct Pending {
    command: DeviceCommand,
    waiters: Vec<Waiter>,
    cancel: CancellationToken,
    generation: u64,
}

#[derive(Default)]
struct PendingTable {
    entries: HashMap<PendingKey, Pending>,
    next_generation: u64,
}

pub struct CommandDispatcher {
    transport: Arc<dyn CommandTransport>,
    debounce: Duration,
    continuous: HashSet<String>,
    pending: Arc<Mutex<PendingTable>>,
}

impl CommandDispatcher {
    pub fn new(transport: Arc<dyn CommandTransport>, config: &BridgeConfig) -> Self {
        Self {
            transport,
            debounce: Duration::from_millis(config.debounce_ms),
            continuous: config.continuous_commands.iter().cloned().collect(),
            pending: Arc::new(Mutex::new(PendingTable::default())),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn is_debounced(&self, command: &str) -> bool {
        !self.debounce.is_zero() && self.continuous.contains(command)
    }

    /// Number of debounced commands waiting for their timer.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().entries.len()
    }

    /// Send a command, coalescing it with other calls for the same device
    /// and command when that command is debounced.
    ///
    /// Resolves once the command (or the call that superseded it) has been
    /// sent, with the result of that send.
    pub async fn dispatch(&self, device_id: &str, command: DeviceCommand) -> Result<(), CommandError> {
        if !self.is_debounced(&command.command) {
            debug!("[Dispatcher] {device_id}: sending {} now", command.command);
            return self.transport.send(device_id, &command).await;
        }

        let (tx, rx) = oneshot::channel();
        self.schedule(device_id, command, tx);
        rx.await.unwrap_or(Err(CommandError::Dropped))
    }

    fn schedule(&self, device_id: &str, command: DeviceCommand, waiter: Waiter) {
        let key = (device_id.to_string(), command.command.clone());
        let cancel = CancellationToken::new();

        let generation = {
            let mut table = self.pending.lock();
            table.next_generation += 1;
            let generation = table.next_generation;

            let mut waiters = Vec::new();
            if let Some(previous) = table.entries.remove(&key) {
                previous.cancel.cancel();
                debug!(
                    "[Dispatcher] {device_id}: {} superseded, {} caller(s) carried over",
                    key.1,
                    previous.waiters.len()
                );
                waiters = previous.waiters;
            }
            waiters.push(waiter);

            table.entries.insert(
                key.clone(),
                Pending {
                    command,
                    waiters,
                    cancel: cancel.clone(),
                    generation,
                },
            );
            generation
        };

        let pending = self.pending.clone();
        let transport = self.transport.clone();
        let debounce = self.debounce;
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(debounce) => {}
            }

            // A newer call may have replaced the entry between the timer
            // firing and this lock.
            let entry = {
                let mut table = pending.lock();
                match table.entries.get(&key) {
                    Some(entry) if entry.generation == generation => table.entries.remove(&key),
                    _ => None,
                }
            };
            let Some(entry) = entry else {
                return;
            };

            let (device_id, _) = key;
            debug!(
                "[Dispatcher] {device_id}: sending {} {:?} for {} caller(s)",
                entry.command.command,
                entry.command.params,
                entry.waiters.len()
            );
            let result = transport.send(&device_id, &entry.command).await;
            if let Err(e) = &result {
                warn!("[Dispatcher] {device_id}: {} failed: {e}", entry.command.command);
            }
            for waiter in entry.waiters {
                let _ = waiter.send(result.clone());
            }
        });
    }
}
