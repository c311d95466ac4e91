//! Saving and restoring registry handles through the settings store
//!
//! Only identifiers are stored: the device id, the channel or configurable
//! name under that device, and for signals the quantity code and flag mask
//! under the channel. Restoring resolves them against the live registry and
//! yields `None` as soon as any piece is missing, so callers can skip the
//! entity and carry on.
//!
//! Every key is written with an optional prefix so that one settings group
//! can hold several handles (`x_`/`y_` for an XY plot, `v_`/`i_` for a power
//! panel).

use super::{Channel, Configurable, Device, Registry, Signal};
use crate::config::SettingsStore;
use crate::types::{Quantity, QuantityFlags};
use std::sync::Arc;

const DEVICE_KEY: &str = "device";
const CHANNEL_KEY: &str = "channel";
const CONFIGURABLE_KEY: &str = "configurable";
const SIGNAL_QUANTITY_KEY: &str = "signal_q";
const SIGNAL_FLAGS_KEY: &str = "signal_qf";

fn key(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix, name)
}

pub fn save_configurable(configurable: &Configurable, settings: &mut SettingsStore, prefix: &str) {
    settings.set_value(&key(prefix, DEVICE_KEY), configurable.device_id());
    settings.set_value(&key(prefix, CONFIGURABLE_KEY), configurable.name());
}

pub fn save_channel(channel: &Channel, settings: &mut SettingsStore, prefix: &str) {
    settings.set_value(&key(prefix, DEVICE_KEY), channel.device_id());
    settings.set_value(&key(prefix, CHANNEL_KEY), channel.name());
}

pub fn save_signal(signal: &Signal, settings: &mut SettingsStore, prefix: &str) {
    settings.set_value(&key(prefix, DEVICE_KEY), signal.device_id());
    settings.set_value(&key(prefix, CHANNEL_KEY), signal.channel_name());
    settings.set_value(&key(prefix, SIGNAL_QUANTITY_KEY), signal.quantity().code());
    settings.set_value(&key(prefix, SIGNAL_FLAGS_KEY), signal.quantity_flags().bits());
}

pub fn restore_device(registry: &Registry, settings: &SettingsStore, prefix: &str) -> Option<Arc<Device>> {
    let id = settings.string(&key(prefix, DEVICE_KEY))?;
    registry.device(&id)
}

pub fn restore_configurable(
    registry: &Registry,
    settings: &SettingsStore,
    prefix: &str,
) -> Option<Arc<Configurable>> {
    let device = restore_device(registry, settings, prefix)?;
    let name = settings.string(&key(prefix, CONFIGURABLE_KEY))?;
    device.configurable(&name)
}

pub fn restore_channel(registry: &Registry, settings: &SettingsStore, prefix: &str) -> Option<Arc<Channel>> {
    let device = restore_device(registry, settings, prefix)?;
    let name = settings.string(&key(prefix, CHANNEL_KEY))?;
    device.channel(&name)
}

/// Whether the group holds a signal handle rather than a bare channel
pub fn is_signal(settings: &SettingsStore, prefix: &str) -> bool {
    settings.contains(&key(prefix, SIGNAL_QUANTITY_KEY))
}

/// Resolve a saved signal; with several signals under the key the first wins
pub fn restore_signal(registry: &Registry, settings: &SettingsStore, prefix: &str) -> Option<Arc<Signal>> {
    let channel = restore_channel(registry, settings, prefix)?;
    let quantity = Quantity::from_code(settings.u32(&key(prefix, SIGNAL_QUANTITY_KEY))?)?;
    let flags = QuantityFlags::from_bits(settings.u64(&key(prefix, SIGNAL_FLAGS_KEY))?);
    channel.signals(quantity, flags).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ChannelKind;
    use crate::types::{ConfigKey, DeviceType, Unit};
    use proptest::prelude::*;

    fn psu(registry: &Registry) -> Arc<Device> {
        let dev = registry.create_device(DeviceType::PowerSupply, "PSU", 0.0);
        dev.add_configurable(
            "output1",
            [ConfigKey::Enabled].into_iter().collect(),
            [ConfigKey::Enabled, ConfigKey::VoltageTarget].into_iter().collect(),
        )
        .unwrap();
        let ch = dev.add_channel("V1", &["CH1"], ChannelKind::Fixed).unwrap();
        ch.add_signal(Quantity::Voltage, QuantityFlags::DC, Unit::Volt)
            .unwrap();
        dev
    }

    #[test]
    fn test_configurable_round_trip() {
        let registry = Registry::new();
        let dev = psu(&registry);
        let conf = dev.configurable("output1").unwrap();

        let mut settings = SettingsStore::new();
        save_configurable(&conf, &mut settings, "");
        let restored = restore_configurable(&registry, &settings, "").unwrap();

        assert_eq!(restored.device_id(), dev.id());
        assert_eq!(restored.name(), "output1");
    }

    #[test]
    fn test_signal_round_trip_with_prefix() {
        let registry = Registry::new();
        let dev = psu(&registry);
        let sig = dev.channel("V1").unwrap().active_signal().unwrap();

        let mut settings = SettingsStore::new();
        save_signal(&sig, &mut settings, "x_");
        assert!(settings.contains("x_signal_q"));

        let restored = restore_signal(&registry, &settings, "x_").unwrap();
        assert!(Arc::ptr_eq(&restored, &sig));
        assert!(restore_signal(&registry, &settings, "y_").is_none());
    }

    #[test]
    fn test_restore_missing_pieces_is_none() {
        let registry = Registry::new();
        let dev = psu(&registry);
        let ch = dev.channel("V1").unwrap();

        let mut settings = SettingsStore::new();
        save_channel(&ch, &mut settings, "");
        assert!(restore_channel(&registry, &settings, "").is_some());

        // Unknown channel name
        settings.set_value("channel", "V9");
        assert!(restore_channel(&registry, &settings, "").is_none());

        // Signal keys absent
        settings.set_value("channel", "V1");
        assert!(restore_signal(&registry, &settings, "").is_none());

        // Quantity not present on the channel
        settings.set_value("signal_q", Quantity::Current.code());
        settings.set_value("signal_qf", QuantityFlags::DC.bits());
        assert!(restore_signal(&registry, &settings, "").is_none());

        // Device gone
        registry.remove_device(dev.id());
        settings.set_value("signal_q", Quantity::Voltage.code());
        assert!(restore_signal(&registry, &settings, "").is_none());
        assert!(restore_device(&registry, &settings, "").is_none());
    }

    proptest! {
        #[test]
        fn prop_signal_key_survives_settings(q_idx in 0usize..20, bits in any::<u64>()) {
            let quantity = Quantity::all().nth(q_idx % Quantity::all().count()).unwrap();
            let flags = QuantityFlags::from_bits(bits);

            let registry = Registry::new();
            let dev = registry.create_device(DeviceType::User, "User", 0.0);
            let ch = dev.add_channel("U", &[], ChannelKind::User).unwrap();
            let sig = ch.add_signal(quantity, flags, Unit::Unitless).unwrap();

            let mut settings = SettingsStore::new();
            settings.begin_group("view0");
            save_signal(&sig, &mut settings, "");
            let restored = restore_signal(&registry, &settings, "").unwrap();
            prop_assert!(Arc::ptr_eq(&restored, &sig));
        }
    }
}
