//! Simulated demo device
//!
//! Creates a [`DeviceType::Demo`] device with four analog channels, each
//! driven by a waveform generator. [`DemoDriver::tick`] runs on the GUI
//! thread and pushes every sample that came due since the previous tick.

use crate::config::DemoConfig;
use crate::error::Result;
use crate::registry::{Channel, ChannelKind, Device, Registry};
use crate::types::{ConfigKey, ConfigKeySet, DeviceType, Quantity, QuantityFlags};
use std::f64::consts::TAU;
use std::sync::Arc;

/// Most samples a single tick will catch up on per channel
const MAX_CATCH_UP: usize = 1000;

const DIGITS: u32 = 7;
const DECIMALS: u32 = 3;

/// Seconds since the Unix epoch
pub fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1e6
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Triangle,
        Waveform::Sawtooth,
    ];

    /// Normalized value in [-1, 1] at `phase` in [0, 1)
    pub fn sample(&self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            Waveform::Sawtooth => 2.0 * phase - 1.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Sine => "Sine",
            Waveform::Square => "Square",
            Waveform::Triangle => "Triangle",
            Waveform::Sawtooth => "Sawtooth",
        }
    }
}

/// Editable generator parameters of one analog channel
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorParams {
    pub waveform: Waveform,
    pub amplitude: f64,
    pub offset: f64,
    pub frequency: f64,
    pub quantity: Quantity,
    pub flags: QuantityFlags,
}

struct AnalogChannel {
    channel: Arc<Channel>,
    params: GeneratorParams,
}

impl AnalogChannel {
    fn value_at(&self, t: f64) -> f64 {
        let p = &self.params;
        let phase = (t * p.frequency).rem_euclid(1.0);
        p.offset + p.amplitude * p.waveform.sample(phase)
    }
}

pub struct DemoDriver {
    device: Arc<Device>,
    channels: Vec<AnalogChannel>,
    period: f64,
    /// Time of the next sample, relative to the device start
    next_sample: f64,
}

impl DemoDriver {
    /// Create the demo device in the registry
    pub fn connect(registry: &Registry, config: &DemoConfig, now: f64) -> Result<Self> {
        let device = registry.create_device(DeviceType::Demo, "Demo", now);
        let defaults = [
            ("A1", Waveform::Sine, Quantity::Voltage, 5.0),
            ("A2", Waveform::Square, Quantity::Current, 1.0),
            ("A3", Waveform::Triangle, Quantity::Voltage, 2.0),
            ("A4", Waveform::Sawtooth, Quantity::Voltage, 3.0),
        ];

        let keys: ConfigKeySet = [
            ConfigKey::MeasuredQuantity,
            ConfigKey::Amplitude,
            ConfigKey::Offset,
            ConfigKey::Frequency,
        ]
        .into_iter()
        .collect();

        let mut channels = Vec::with_capacity(defaults.len());
        for (name, waveform, quantity, amplitude) in defaults {
            let channel = device.add_channel(name, &["Analog"], ChannelKind::Fixed)?;
            device.add_configurable(name, keys.clone(), keys.clone())?;
            channels.push(AnalogChannel {
                channel,
                params: GeneratorParams {
                    waveform,
                    amplitude,
                    offset: 0.0,
                    frequency: 0.5,
                    quantity,
                    flags: QuantityFlags::DC,
                },
            });
        }

        let rate = if config.sample_rate_hz > 0.0 {
            config.sample_rate_hz
        } else {
            crate::config::DEFAULT_DEMO_SAMPLE_RATE_HZ
        };
        tracing::info!("Demo device {} connected at {} Hz", device.id(), rate);

        Ok(Self {
            device,
            channels,
            period: 1.0 / rate,
            next_sample: 0.0,
        })
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn params(&self, channel: &str) -> Option<&GeneratorParams> {
        self.channels
            .iter()
            .find(|c| c.channel.name() == channel)
            .map(|c| &c.params)
    }

    pub fn params_mut(&mut self, channel: &str) -> Option<&mut GeneratorParams> {
        self.channels
            .iter_mut()
            .find(|c| c.channel.name() == channel)
            .map(|c| &mut c.params)
    }

    /// Push every sample due up to `now`; returns the number of sample times
    pub fn tick(&mut self, now: f64) -> usize {
        let elapsed = now - self.device.start_timestamp();
        let mut count = 0;
        while self.next_sample <= elapsed && count < MAX_CATCH_UP {
            let t = self.next_sample;
            let timestamp = self.device.start_timestamp() + t;
            for analog in &self.channels {
                let p = &analog.params;
                let result = analog.channel.push_sample(
                    analog.value_at(t),
                    timestamp,
                    p.quantity,
                    p.flags,
                    p.quantity.default_unit(),
                    DIGITS,
                    DECIMALS,
                );
                if let Err(e) = result {
                    tracing::warn!("Demo sample dropped: {}", e);
                }
            }
            self.next_sample += self.period;
            count += 1;
        }
        if count == MAX_CATCH_UP {
            // Skip ahead instead of replaying a long stall
            self.next_sample = elapsed + self.period;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rate: f64) -> DemoConfig {
        DemoConfig {
            enabled: true,
            sample_rate_hz: rate,
        }
    }

    #[test]
    fn test_connect_creates_channels_and_configurables() {
        let registry = Registry::new();
        let driver = DemoDriver::connect(&registry, &config(10.0), 100.0).unwrap();
        let dev = driver.device();
        assert_eq!(dev.device_type(), DeviceType::Demo);
        let names: Vec<String> = dev
            .channel_group("Analog")
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["A1", "A2", "A3", "A4"]);
        assert!(dev.configurable("A1").is_some());
        assert!(crate::views::matching_rule(&dev.configurable("A1").unwrap())
            .map(|r| r.kind == crate::views::ViewKind::DemoControl)
            .unwrap_or(false));
    }

    #[test]
    fn test_tick_pushes_due_samples() {
        let registry = Registry::new();
        let mut driver = DemoDriver::connect(&registry, &config(10.0), 100.0).unwrap();

        // t = 0.0, 0.1, ..., 0.5
        assert_eq!(driver.tick(100.55), 6);
        assert_eq!(driver.tick(100.55), 0);

        let a1 = driver.device().channel("A1").unwrap();
        let signal = a1.active_signal().unwrap();
        assert_eq!(signal.len(), 6);
        assert_eq!(signal.quantity(), Quantity::Voltage);
        assert!(signal.samples()[0].value.abs() < 1e-9);

        let a2 = driver.device().channel("A2").unwrap();
        assert_eq!(a2.active_signal().unwrap().quantity(), Quantity::Current);
    }

    #[test]
    fn test_params_change_values() {
        let registry = Registry::new();
        let mut driver = DemoDriver::connect(&registry, &config(1.0), 0.0).unwrap();
        {
            let p = driver.params_mut("A1").unwrap();
            p.amplitude = 0.0;
            p.offset = 2.5;
        }
        driver.tick(0.0);
        let signal = driver.device().channel("A1").unwrap().active_signal().unwrap();
        assert_eq!(signal.last_sample().unwrap().value, 2.5);
    }

    #[test]
    fn test_quantity_change_switches_active_signal() {
        let registry = Registry::new();
        let mut driver = DemoDriver::connect(&registry, &config(1.0), 0.0).unwrap();
        driver.tick(0.0);
        driver.params_mut("A3").unwrap().quantity = Quantity::Frequency;
        driver.tick(1.0);

        let a3 = driver.device().channel("A3").unwrap();
        assert_eq!(a3.all_signals().len(), 2);
        assert_eq!(a3.active_signal().unwrap().quantity(), Quantity::Frequency);
    }

    #[test]
    fn test_long_stall_is_capped() {
        let registry = Registry::new();
        let mut driver = DemoDriver::connect(&registry, &config(100.0), 0.0).unwrap();
        assert_eq!(driver.tick(3600.0), MAX_CATCH_UP);
        assert_eq!(driver.tick(3600.0), 0);
    }

    #[test]
    fn test_waveform_shapes() {
        assert_eq!(Waveform::Square.sample(0.25), 1.0);
        assert_eq!(Waveform::Square.sample(0.75), -1.0);
        assert_eq!(Waveform::Triangle.sample(0.5), 1.0);
        assert_eq!(Waveform::Sawtooth.sample(0.0), -1.0);
        assert!((Waveform::Sine.sample(0.25) - 1.0).abs() < 1e-12);
    }
}
