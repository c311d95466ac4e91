//! Properties of sample pushes and active-signal tracking

mod common;

use benchvis_rs::registry::{ChannelKind, RegistryError, RegistryEvent};
use benchvis_rs::types::SignalKey;
use benchvis_rs::{DeviceType, Quantity, QuantityFlags, Registry, Unit};
use proptest::prelude::*;

fn key_strategy() -> impl Strategy<Value = (Quantity, QuantityFlags)> {
    prop_oneof![
        Just((Quantity::Voltage, QuantityFlags::DC)),
        Just((Quantity::Voltage, QuantityFlags::AC)),
        Just((Quantity::Current, QuantityFlags::DC)),
        Just((Quantity::Resistance, QuantityFlags::NONE)),
    ]
}

fn active_changes(registry: &Registry) -> usize {
    registry
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, RegistryEvent::ActiveSignalChanged { .. }))
        .count()
}

proptest! {
    #[test]
    fn prop_active_signal_follows_last_push(
        pushes in prop::collection::vec((key_strategy(), -1e3f64..1e3), 1..60)
    ) {
        let registry = Registry::new();
        let dev = registry.create_device(DeviceType::User, "User", 0.0);
        let ch = dev.add_channel("U1", &[], ChannelKind::User).unwrap();
        registry.drain_events();

        let mut switches = 0;
        let mut last_key = None;
        for (i, ((quantity, flags), value)) in pushes.iter().enumerate() {
            let key = SignalKey::new(*quantity, *flags);
            if last_key != Some(key) {
                switches += 1;
                last_key = Some(key);
            }
            ch.push_sample(*value, i as f64, *quantity, *flags, quantity.default_unit(), 5, 3)
                .unwrap();

            let active = ch.active_signal().unwrap();
            prop_assert_eq!(active.key(), key);
            prop_assert_eq!(active.last_sample().unwrap().value, *value);
        }

        let total: usize = ch.all_signals().iter().map(|s| s.len()).sum();
        prop_assert_eq!(total, pushes.len());
        prop_assert_eq!(active_changes(&registry), switches);
    }

    #[test]
    fn prop_samples_keep_push_order(values in prop::collection::vec(-1e6f64..1e6, 0..100)) {
        let registry = Registry::new();
        let dev = registry.create_device(DeviceType::User, "User", 0.0);
        let ch = dev.add_channel("U1", &[], ChannelKind::User).unwrap();

        for (i, v) in values.iter().enumerate() {
            ch.push_sample(*v, i as f64, Quantity::Voltage, QuantityFlags::DC, Unit::Volt, 7, 3)
                .unwrap();
        }

        let stored: Vec<f64> = ch
            .active_signal()
            .map(|s| s.samples().iter().map(|sample| sample.value).collect())
            .unwrap_or_default();
        prop_assert_eq!(stored, values);
    }
}

#[test]
fn test_ambiguous_push_changes_nothing() {
    let registry = Registry::new();
    let dev = registry.create_device(DeviceType::Demo, "Demo", 0.0);
    let ch = dev.add_channel("A1", &[], ChannelKind::Fixed).unwrap();
    let first = ch.insert_signal(Quantity::Voltage, QuantityFlags::DC, Unit::Volt);
    let second = ch.insert_signal(Quantity::Voltage, QuantityFlags::DC, Unit::Volt);
    registry.drain_events();

    let err = ch
        .push_sample(1.0, 0.0, Quantity::Voltage, QuantityFlags::DC, Unit::Volt, 5, 3)
        .unwrap_err();

    assert!(matches!(err, RegistryError::AmbiguousSignal { count: 2, .. }));
    assert!(first.is_empty());
    assert!(second.is_empty());
    assert!(ch.active_signal().is_none());
    assert_eq!(active_changes(&registry), 0);
}

#[test]
fn test_signal_handles_outlive_device_removal() {
    let registry = Registry::new();
    let dev = registry.create_device(DeviceType::Demo, "Demo", 0.0);
    let id = dev.id().to_string();
    let ch = dev.add_channel("A1", &[], ChannelKind::Fixed).unwrap();
    ch.push_sample(2.5, 1.0, Quantity::Voltage, QuantityFlags::DC, Unit::Volt, 5, 3)
        .unwrap();
    let sig = ch.active_signal().unwrap();
    drop((dev, ch));

    registry.remove_device(&id);

    assert!(registry.device(&id).is_none());
    assert!(sig.channel().is_none());
    common::assert_float_eq(sig.last_sample().unwrap().value, 2.5, 1e-12);
}
