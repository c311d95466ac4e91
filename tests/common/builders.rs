//! Test data builders using the builder pattern

use benchvis_rs::registry::ChannelKind;
use benchvis_rs::types::{ConfigKey, ConfigKeySet};
use benchvis_rs::{Device, DeviceType, Quantity, QuantityFlags, Registry, Unit};
use std::sync::Arc;

struct ChannelSpec {
    name: String,
    group: Option<String>,
    signals: Vec<(Quantity, QuantityFlags, Unit)>,
}

/// Builder for devices with channels, signals and configurables
pub struct DeviceBuilder {
    device_type: DeviceType,
    name: String,
    start_timestamp: f64,
    channels: Vec<ChannelSpec>,
    configurables: Vec<(String, ConfigKeySet, ConfigKeySet)>,
}

impl DeviceBuilder {
    pub fn new(device_type: DeviceType, name: impl Into<String>) -> Self {
        Self {
            device_type,
            name: name.into(),
            start_timestamp: 0.0,
            channels: Vec::new(),
            configurables: Vec::new(),
        }
    }

    pub fn start_timestamp(mut self, ts: f64) -> Self {
        self.start_timestamp = ts;
        self
    }

    /// Channel with a single signal
    pub fn channel(self, name: &str, quantity: Quantity, unit: Unit) -> Self {
        self.channel_with(name, None, &[(quantity, QuantityFlags::NONE, unit)])
    }

    pub fn channel_with(
        mut self,
        name: &str,
        group: Option<&str>,
        signals: &[(Quantity, QuantityFlags, Unit)],
    ) -> Self {
        self.channels.push(ChannelSpec {
            name: name.to_string(),
            group: group.map(str::to_string),
            signals: signals.to_vec(),
        });
        self
    }

    /// Configurable whose keys are both getable and setable
    pub fn configurable(mut self, name: &str, keys: &[ConfigKey]) -> Self {
        let set: ConfigKeySet = keys.iter().copied().collect();
        self.configurables
            .push((name.to_string(), set.clone(), set));
        self
    }

    pub fn build(self, registry: &Registry) -> Arc<Device> {
        let device = registry.create_device(self.device_type, &self.name, self.start_timestamp);
        for spec in self.channels {
            let groups: Vec<&str> = spec.group.as_deref().into_iter().collect();
            let channel = device
                .add_channel(&spec.name, &groups, ChannelKind::Fixed)
                .expect("channel names are unique");
            for (quantity, flags, unit) in spec.signals {
                channel
                    .add_signal(quantity, flags, unit)
                    .expect("signal keys are unique");
            }
        }
        for (name, getable, setable) in self.configurables {
            device
                .add_configurable(&name, getable, setable)
                .expect("configurable names are unique");
        }
        device
    }
}

/// Power supply with `V` and `I` channels and an `output1` configurable
pub fn power_supply(registry: &Registry) -> Arc<Device> {
    DeviceBuilder::new(DeviceType::PowerSupply, "PSU")
        .channel("V", Quantity::Voltage, Unit::Volt)
        .channel("I", Quantity::Current, Unit::Ampere)
        .configurable(
            "output1",
            &[ConfigKey::Enabled, ConfigKey::VoltageTarget, ConfigKey::CurrentLimit],
        )
        .build(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_builder() {
        let registry = Registry::new();
        let device = DeviceBuilder::new(DeviceType::Multimeter, "DMM")
            .channel("P1", Quantity::Voltage, Unit::Volt)
            .configurable("meter", &[ConfigKey::MeasuredQuantity])
            .build(&registry);

        assert_eq!(device.name(), "DMM");
        assert_eq!(device.channels().len(), 1);
        assert!(device.channel("P1").unwrap().active_signal().is_some());
        assert!(device.configurable("meter").is_some());
    }
}
