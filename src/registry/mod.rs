//! In-memory model of connected instruments
//!
//! The registry holds devices, and each device owns its channels and
//! configurables. Channels own signals, and signals own their sample
//! streams. Children keep a `Weak` reference to their parent so that
//! removing a device is enough to tear the whole subtree down.
//!
//! # Threading
//!
//! [`Registry`] is a cheap cloneable handle. Mutation (creating devices,
//! channels, pushing samples) happens on the GUI thread; the script thread
//! only holds `Arc` handles and reads through them. Everything sits behind
//! `RwLock`s so the handles are `Send + Sync`, but the locks are only ever
//! written from one thread.
//!
//! State changes the UI must react to are published as [`RegistryEvent`]s
//! on a crossbeam channel and picked up with [`Registry::drain_events`].

pub mod channel;
pub mod configurable;
pub mod device;
pub mod persist;
pub mod signal;

pub use channel::{Channel, ChannelKind};
pub use configurable::Configurable;
pub use device::Device;
pub use signal::{Sample, Signal};

use crate::types::DeviceType;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Errors raised by registry operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// More than one signal matches a (quantity, flags) pair on push
    #[error("channel {channel} has {count} signals for {quantity}, cannot pick one")]
    AmbiguousSignal {
        channel: String,
        quantity: String,
        count: usize,
    },

    /// `add_signal` for a (quantity, flags) pair that already has a signal
    #[error("channel {channel} already has a signal for {quantity}")]
    SignalExists { channel: String, quantity: String },

    /// A sample older than the newest one already in the target signal
    #[error("channel {channel}: sample at {timestamp} precedes last sample at {last}")]
    OutOfOrderSample {
        channel: String,
        timestamp: f64,
        last: f64,
    },

    /// A channel with the same name already exists on the device
    #[error("device {device} already has a channel named {name}")]
    ChannelExists { device: String, name: String },

    /// A configurable with the same name already exists on the device
    #[error("device {device} already has a configurable named {name}")]
    ConfigurableExists { device: String, name: String },
}

/// Notifications published by the registry
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    DeviceAdded(String),
    DeviceRemoved(String),
    /// A channel switched the signal used for live display
    ActiveSignalChanged {
        device_id: String,
        channel: String,
        signal: Arc<Signal>,
    },
}

pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct RegistryInner {
    devices: RwLock<BTreeMap<String, Arc<Device>>>,
    next_device: AtomicU32,
    event_tx: Sender<RegistryEvent>,
    event_rx: Receiver<RegistryEvent>,
}

/// Shared handle to the device registry
#[derive(Debug, Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            inner: Arc::new(RegistryInner {
                devices: RwLock::new(BTreeMap::new()),
                next_device: AtomicU32::new(1),
                event_tx,
                event_rx,
            }),
        }
    }

    /// Create and register a new device
    ///
    /// The id is `"<type-tag>:<n>"`, unique for the lifetime of the registry.
    pub fn create_device(
        &self,
        device_type: DeviceType,
        name: impl Into<String>,
        start_timestamp: f64,
    ) -> Arc<Device> {
        let n = self.inner.next_device.fetch_add(1, Ordering::Relaxed);
        let id = format!("{}:{}", device_type.tag(), n);
        let device = Device::new(
            id.clone(),
            name.into(),
            device_type,
            start_timestamp,
            self.inner.event_tx.clone(),
        );

        write_lock(&self.inner.devices).insert(id.clone(), device.clone());
        tracing::info!("Device {} ({}) added", id, device_type);
        let _ = self.inner.event_tx.send(RegistryEvent::DeviceAdded(id));
        device
    }

    /// Disconnect a device, dropping its channels and configurables
    pub fn remove_device(&self, id: &str) -> Option<Arc<Device>> {
        let device = write_lock(&self.inner.devices).remove(id)?;
        device.disconnect();
        tracing::info!("Device {} removed", id);
        let _ = self
            .inner
            .event_tx
            .send(RegistryEvent::DeviceRemoved(id.to_string()));
        Some(device)
    }

    pub fn device(&self, id: &str) -> Option<Arc<Device>> {
        read_lock(&self.inner.devices).get(id).cloned()
    }

    /// All devices, ordered by id
    pub fn devices(&self) -> Vec<Arc<Device>> {
        read_lock(&self.inner.devices).values().cloned().collect()
    }

    pub fn device_count(&self) -> usize {
        read_lock(&self.inner.devices).len()
    }

    /// Drain all pending registry events
    pub fn drain_events(&self) -> Vec<RegistryEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.inner.event_rx.try_recv() {
            events.push(event);
        }
        events
    }
}
