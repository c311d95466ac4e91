//! Devices: the roots of the registry tree

use super::{read_lock, write_lock, Channel, ChannelKind, Configurable, RegistryError, RegistryEvent};
use crate::types::{ConfigKeySet, DeviceType};
use crossbeam_channel::Sender;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock, Weak};

/// A connected (or simulated) instrument
///
/// Owns its channels and configurables. Channel indices come from a
/// per-device counter that only ever increases, so an index is never
/// handed out twice even after channels are dropped.
#[derive(Debug)]
pub struct Device {
    id: String,
    name: String,
    device_type: DeviceType,
    start_timestamp: f64,
    channel_counter: AtomicU32,
    channels: RwLock<BTreeMap<String, Arc<Channel>>>,
    configurables: RwLock<BTreeMap<String, Arc<Configurable>>>,
    events: Sender<RegistryEvent>,
    self_ref: Weak<Device>,
}

impl Device {
    pub(super) fn new(
        id: String,
        name: String,
        device_type: DeviceType,
        start_timestamp: f64,
        events: Sender<RegistryEvent>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            id,
            name,
            device_type,
            start_timestamp,
            channel_counter: AtomicU32::new(0),
            channels: RwLock::new(BTreeMap::new()),
            configurables: RwLock::new(BTreeMap::new()),
            events,
            self_ref: self_ref.clone(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Seconds since the epoch at which the device started acquiring
    pub fn start_timestamp(&self) -> f64 {
        self.start_timestamp
    }

    /// Hand out the next channel index
    pub fn next_channel_index(&self) -> u32 {
        self.channel_counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Create a channel on this device
    pub fn add_channel(
        &self,
        name: &str,
        groups: &[&str],
        kind: ChannelKind,
    ) -> Result<Arc<Channel>, RegistryError> {
        let mut channels = write_lock(&self.channels);
        if channels.contains_key(name) {
            return Err(RegistryError::ChannelExists {
                device: self.id.clone(),
                name: name.to_string(),
            });
        }

        let channel = Channel::new(
            self.self_ref.clone(),
            self.id.clone(),
            self.next_channel_index(),
            name.to_string(),
            groups.iter().map(|g| g.to_string()).collect(),
            kind,
            self.events.clone(),
        );
        channels.insert(name.to_string(), channel.clone());
        tracing::debug!("Channel {} (#{}) added to {}", name, channel.index(), self.id);
        Ok(channel)
    }

    pub fn channel(&self, name: &str) -> Option<Arc<Channel>> {
        read_lock(&self.channels).get(name).cloned()
    }

    /// Channels in creation order
    pub fn channels(&self) -> Vec<Arc<Channel>> {
        let mut channels: Vec<_> = read_lock(&self.channels).values().cloned().collect();
        channels.sort_by_key(|c| c.index());
        channels
    }

    /// Channels that belong to the named group
    pub fn channel_group(&self, group: &str) -> Vec<Arc<Channel>> {
        self.channels()
            .into_iter()
            .filter(|c| c.groups().iter().any(|g| g == group))
            .collect()
    }

    pub fn add_configurable(
        &self,
        name: &str,
        getable: ConfigKeySet,
        setable: ConfigKeySet,
    ) -> Result<Arc<Configurable>, RegistryError> {
        let mut configurables = write_lock(&self.configurables);
        if configurables.contains_key(name) {
            return Err(RegistryError::ConfigurableExists {
                device: self.id.clone(),
                name: name.to_string(),
            });
        }

        let configurable = Arc::new(Configurable::new(
            name,
            self.id.clone(),
            self.device_type,
            getable,
            setable,
        ));
        configurables.insert(name.to_string(), configurable.clone());
        Ok(configurable)
    }

    pub fn configurable(&self, name: &str) -> Option<Arc<Configurable>> {
        read_lock(&self.configurables).get(name).cloned()
    }

    pub fn configurables(&self) -> Vec<Arc<Configurable>> {
        read_lock(&self.configurables).values().cloned().collect()
    }

    /// Drop all owned channels and configurables
    pub(super) fn disconnect(&self) {
        write_lock(&self.channels).clear();
        write_lock(&self.configurables).clear();
    }
}
