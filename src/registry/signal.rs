//! Signals and their sample streams

use super::{read_lock, write_lock, Channel};
use crate::types::{Quantity, QuantityFlags, SignalKey, Unit};
use std::sync::{Arc, RwLock, Weak};

/// A single timestamped value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Seconds since the epoch
    pub timestamp: f64,
    pub value: f64,
}

#[derive(Debug, Default)]
struct SignalData {
    samples: Vec<Sample>,
    digits: u32,
    decimals: u32,
}

/// A measured quantity on a channel with its append-only sample stream
#[derive(Debug)]
pub struct Signal {
    channel: Weak<Channel>,
    device_id: String,
    channel_name: String,
    key: SignalKey,
    unit: Unit,
    data: RwLock<SignalData>,
}

impl Signal {
    pub(super) fn new(
        channel: Weak<Channel>,
        device_id: String,
        channel_name: String,
        key: SignalKey,
        unit: Unit,
    ) -> Self {
        Self {
            channel,
            device_id,
            channel_name,
            key,
            unit,
            data: RwLock::new(SignalData {
                samples: Vec::new(),
                digits: 7,
                decimals: 3,
            }),
        }
    }

    pub fn channel(&self) -> Option<Arc<Channel>> {
        self.channel.upgrade()
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn key(&self) -> SignalKey {
        self.key
    }

    pub fn quantity(&self) -> Quantity {
        self.key.quantity
    }

    pub fn quantity_flags(&self) -> QuantityFlags {
        self.key.flags
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Name shown in legends and view titles, e.g. `"A1 Voltage DC"`
    pub fn display_name(&self) -> String {
        format!("{} {}", self.channel_name, self.key)
    }

    /// Append a sample and update the display precision
    pub fn push_sample(&self, timestamp: f64, value: f64, digits: u32, decimals: u32) {
        let mut data = write_lock(&self.data);
        data.samples.push(Sample { timestamp, value });
        data.digits = digits;
        data.decimals = decimals;
    }

    pub fn len(&self) -> usize {
        read_lock(&self.data).samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_sample(&self) -> Option<Sample> {
        read_lock(&self.data).samples.last().copied()
    }

    /// Copy of the whole stream
    pub fn samples(&self) -> Vec<Sample> {
        read_lock(&self.data).samples.clone()
    }

    /// Copy of the samples from `start` onwards
    pub fn samples_since(&self, start: usize) -> Vec<Sample> {
        let data = read_lock(&self.data);
        data.samples.get(start..).map(<[Sample]>::to_vec).unwrap_or_default()
    }

    pub fn digits(&self) -> u32 {
        read_lock(&self.data).digits
    }

    pub fn decimals(&self) -> u32 {
        read_lock(&self.data).decimals
    }

    /// Last value formatted with the signal's precision and unit
    pub fn format_last(&self) -> Option<String> {
        let data = read_lock(&self.data);
        let sample = data.samples.last()?;
        Some(format!(
            "{:.*} {}",
            data.decimals as usize,
            sample.value,
            self.unit.symbol()
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::registry::{ChannelKind, Registry};
    use crate::types::{DeviceType, Quantity, QuantityFlags, Unit};

    #[test]
    fn test_stream_is_append_only() {
        let registry = Registry::new();
        let dev = registry.create_device(DeviceType::Multimeter, "DMM", 0.0);
        let ch = dev.add_channel("P1", &[], ChannelKind::Fixed).unwrap();
        let sig = ch
            .add_signal(Quantity::Resistance, QuantityFlags::NONE, Unit::Ohm)
            .unwrap();

        assert!(sig.is_empty());
        assert!(sig.last_sample().is_none());
        sig.push_sample(1.0, 100.0, 6, 1);
        sig.push_sample(2.0, 101.5, 6, 1);

        assert_eq!(sig.len(), 2);
        assert_eq!(sig.samples()[0].value, 100.0);
        assert_eq!(sig.last_sample().unwrap().timestamp, 2.0);
        assert_eq!(sig.samples_since(1).len(), 1);
        assert!(sig.samples_since(5).is_empty());
        assert_eq!(sig.format_last().unwrap(), "101.5 Ω");
    }

    #[test]
    fn test_display_name() {
        let registry = Registry::new();
        let dev = registry.create_device(DeviceType::Demo, "Demo", 0.0);
        let ch = dev.add_channel("A1", &[], ChannelKind::Fixed).unwrap();
        let sig = ch
            .add_signal(Quantity::Voltage, QuantityFlags::DC, Unit::Volt)
            .unwrap();
        assert_eq!(sig.display_name(), "A1 Voltage DC");
    }
}
