//! Channels and the sample push path

use super::{read_lock, write_lock, Device, RegistryError, RegistryEvent, Signal};
use crate::types::{Quantity, QuantityFlags, SignalKey, Unit};
use crossbeam_channel::Sender;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

/// Whether a channel was declared by the driver or created by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Fixed,
    User,
}

/// A named data source on a device
///
/// Signals are indexed by `(quantity, flags)`. Normally a key maps to at
/// most one signal; [`Channel::push_sample`] refuses to guess when it
/// finds more than one.
#[derive(Debug)]
pub struct Channel {
    device: Weak<Device>,
    device_id: String,
    index: u32,
    name: String,
    groups: Vec<String>,
    kind: ChannelKind,
    signals: RwLock<HashMap<SignalKey, Vec<Arc<Signal>>>>,
    active: RwLock<Option<Arc<Signal>>>,
    events: Sender<RegistryEvent>,
    self_ref: Weak<Channel>,
}

impl Channel {
    pub(super) fn new(
        device: Weak<Device>,
        device_id: String,
        index: u32,
        name: String,
        groups: Vec<String>,
        kind: ChannelKind,
        events: Sender<RegistryEvent>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            device,
            device_id,
            index,
            name,
            groups,
            kind,
            signals: RwLock::new(HashMap::new()),
            active: RwLock::new(None),
            events,
            self_ref: self_ref.clone(),
        })
    }

    /// Owning device, or `None` once it has been disconnected
    pub fn device(&self) -> Option<Arc<Device>> {
        self.device.upgrade()
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Signal currently used for live display
    pub fn active_signal(&self) -> Option<Arc<Signal>> {
        read_lock(&self.active).clone()
    }

    /// Signals registered for a (quantity, flags) pair
    pub fn signals(&self, quantity: Quantity, flags: QuantityFlags) -> Vec<Arc<Signal>> {
        read_lock(&self.signals)
            .get(&SignalKey::new(quantity, flags))
            .cloned()
            .unwrap_or_default()
    }

    /// Every signal on the channel, ordered by key for stable display
    pub fn all_signals(&self) -> Vec<Arc<Signal>> {
        let signals = read_lock(&self.signals);
        let mut keys: Vec<&SignalKey> = signals.keys().collect();
        keys.sort_by_key(|k| (k.quantity.code(), k.flags.bits()));
        keys.into_iter()
            .flat_map(|k| signals[k].iter().cloned())
            .collect()
    }

    fn new_signal(&self, key: SignalKey, unit: Unit) -> Arc<Signal> {
        Arc::new(Signal::new(
            self.self_ref.clone(),
            self.device_id.clone(),
            self.name.clone(),
            key,
            unit,
        ))
    }

    /// Register a signal for a (quantity, flags) pair not yet in use
    ///
    /// The first signal added to a channel becomes its active signal.
    pub fn add_signal(
        &self,
        quantity: Quantity,
        flags: QuantityFlags,
        unit: Unit,
    ) -> Result<Arc<Signal>, RegistryError> {
        let key = SignalKey::new(quantity, flags);
        let signal = {
            let mut signals = write_lock(&self.signals);
            let list = signals.entry(key).or_default();
            if !list.is_empty() {
                return Err(RegistryError::SignalExists {
                    channel: self.name.clone(),
                    quantity: key.to_string(),
                });
            }
            let signal = self.new_signal(key, unit);
            list.push(signal.clone());
            signal
        };

        let first = {
            let mut active = write_lock(&self.active);
            if active.is_none() {
                *active = Some(signal.clone());
                true
            } else {
                false
            }
        };
        if first {
            self.notify_active_changed(&signal);
        }
        Ok(signal)
    }

    /// Register a signal without the duplicate check
    ///
    /// Drivers declaring fixed signals use this; it never changes the
    /// active signal.
    pub fn insert_signal(&self, quantity: Quantity, flags: QuantityFlags, unit: Unit) -> Arc<Signal> {
        let key = SignalKey::new(quantity, flags);
        let signal = self.new_signal(key, unit);
        write_lock(&self.signals)
            .entry(key)
            .or_default()
            .push(signal.clone());
        signal
    }

    /// Append a sample, creating the matching signal on first use
    ///
    /// If the target signal differs from the active one it becomes active
    /// and an [`RegistryEvent::ActiveSignalChanged`] is published. With more
    /// than one signal for the key, or a timestamp older than the signal's
    /// last sample, nothing is appended and nothing changes.
    #[allow(clippy::too_many_arguments)]
    pub fn push_sample(
        &self,
        value: f64,
        timestamp: f64,
        quantity: Quantity,
        flags: QuantityFlags,
        unit: Unit,
        digits: u32,
        decimals: u32,
    ) -> Result<(), RegistryError> {
        let key = SignalKey::new(quantity, flags);
        let signal = {
            let mut signals = write_lock(&self.signals);
            match signals.get(&key).map(Vec::len).unwrap_or(0) {
                0 => {
                    let signal = self.new_signal(key, unit);
                    tracing::warn!(
                        "Channel {}: no signal for {}, creating one",
                        self.name,
                        key
                    );
                    signals.insert(key, vec![signal.clone()]);
                    signal
                }
                1 => {
                    let signal = signals[&key][0].clone();
                    if let Some(last) = signal.last_sample() {
                        if timestamp < last.timestamp {
                            return Err(RegistryError::OutOfOrderSample {
                                channel: self.name.clone(),
                                timestamp,
                                last: last.timestamp,
                            });
                        }
                    }
                    signal
                }
                count => {
                    return Err(RegistryError::AmbiguousSignal {
                        channel: self.name.clone(),
                        quantity: key.to_string(),
                        count,
                    });
                }
            }
        };

        let changed = {
            let mut active = write_lock(&self.active);
            let same = active.as_ref().is_some_and(|a| Arc::ptr_eq(a, &signal));
            if !same {
                *active = Some(signal.clone());
            }
            !same
        };
        if changed {
            self.notify_active_changed(&signal);
        }

        signal.push_sample(timestamp, value, digits, decimals);
        Ok(())
    }

    fn notify_active_changed(&self, signal: &Arc<Signal>) {
        let _ = self.events.send(RegistryEvent::ActiveSignalChanged {
            device_id: self.device_id.clone(),
            channel: self.name.clone(),
            signal: signal.clone(),
        });
    }
}
