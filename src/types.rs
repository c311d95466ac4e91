//! Core data types for BenchVis-RS
//!
//! Value types shared by the registry, the view layer, and the script bridge.
//!
//! # Main Types
//!
//! - [`DeviceType`] - Kind of instrument a device represents
//! - [`ConfigKey`] - A configuration property a configurable exposes
//! - [`Quantity`] / [`QuantityFlags`] - What a signal measures, and how
//! - [`Unit`] - Physical unit of a signal's samples
//! - [`SignalKey`] - The (quantity, flags) pair a channel indexes signals by
//! - [`DockArea`] - Where a view is placed inside a device tab
//!
//! Quantities and flags have stable numeric codes. Those codes are what
//! gets written to the settings store, so they must never be renumbered.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Kind of instrument a device represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeviceType {
    PowerSupply,
    ElectronicLoad,
    Multimeter,
    SoundLevelMeter,
    Thermometer,
    Hygrometer,
    Energymeter,
    LcrMeter,
    Scale,
    Powermeter,
    /// Simulated device feeding generated samples
    Demo,
    /// Device created by the user, holds user channels only
    User,
    #[default]
    Unknown,
}

impl DeviceType {
    /// Short lowercase tag used when generating device ids
    pub fn tag(&self) -> &'static str {
        match self {
            DeviceType::PowerSupply => "psu",
            DeviceType::ElectronicLoad => "load",
            DeviceType::Multimeter => "dmm",
            DeviceType::SoundLevelMeter => "slm",
            DeviceType::Thermometer => "thermo",
            DeviceType::Hygrometer => "hygro",
            DeviceType::Energymeter => "energy",
            DeviceType::LcrMeter => "lcr",
            DeviceType::Scale => "scale",
            DeviceType::Powermeter => "pwr",
            DeviceType::Demo => "demo",
            DeviceType::User => "user",
            DeviceType::Unknown => "dev",
        }
    }

    /// Source/sink instruments: supplies and loads
    pub fn is_source_sink(&self) -> bool {
        matches!(self, DeviceType::PowerSupply | DeviceType::ElectronicLoad)
    }

    /// Instruments that report a measured quantity with a selectable range
    pub fn is_measurement(&self) -> bool {
        matches!(
            self,
            DeviceType::Multimeter
                | DeviceType::SoundLevelMeter
                | DeviceType::Thermometer
                | DeviceType::Hygrometer
                | DeviceType::Energymeter
                | DeviceType::LcrMeter
                | DeviceType::Scale
                | DeviceType::Powermeter
        )
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceType::PowerSupply => "Power Supply",
            DeviceType::ElectronicLoad => "Electronic Load",
            DeviceType::Multimeter => "Multimeter",
            DeviceType::SoundLevelMeter => "Sound Level Meter",
            DeviceType::Thermometer => "Thermometer",
            DeviceType::Hygrometer => "Hygrometer",
            DeviceType::Energymeter => "Energy Meter",
            DeviceType::LcrMeter => "LCR Meter",
            DeviceType::Scale => "Scale",
            DeviceType::Powermeter => "Power Meter",
            DeviceType::Demo => "Demo Device",
            DeviceType::User => "User Device",
            DeviceType::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// A configuration property exposed by a configurable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfigKey {
    Enabled,
    Regulation,
    VoltageTarget,
    CurrentLimit,
    PowerTarget,
    ResistanceTarget,
    OverVoltageProtectionEnabled,
    OverVoltageProtectionThreshold,
    OverCurrentProtectionEnabled,
    OverCurrentProtectionThreshold,
    UnderVoltageConditionEnabled,
    UnderVoltageConditionThreshold,
    MeasuredQuantity,
    Range,
    Amplitude,
    Offset,
    Frequency,
    Samplerate,
    DataLog,
}

impl ConfigKey {
    /// Keys that make a supply or load controllable from a source/sink view
    pub const SOURCE_SINK: &'static [ConfigKey] = &[
        ConfigKey::Enabled,
        ConfigKey::Regulation,
        ConfigKey::VoltageTarget,
        ConfigKey::CurrentLimit,
        ConfigKey::OverVoltageProtectionEnabled,
        ConfigKey::OverVoltageProtectionThreshold,
        ConfigKey::OverCurrentProtectionEnabled,
        ConfigKey::OverCurrentProtectionThreshold,
        ConfigKey::UnderVoltageConditionEnabled,
        ConfigKey::UnderVoltageConditionThreshold,
    ];

    /// Keys driven by the demo control view
    pub const DEMO: &'static [ConfigKey] = &[
        ConfigKey::MeasuredQuantity,
        ConfigKey::Amplitude,
        ConfigKey::Offset,
    ];

    /// Keys driven by the measurement control view
    pub const MEASUREMENT: &'static [ConfigKey] = &[ConfigKey::MeasuredQuantity, ConfigKey::Range];
}

/// Set of config keys, ordered for stable display
pub type ConfigKeySet = BTreeSet<ConfigKey>;

/// What a signal measures
///
/// Codes follow the measured-quantity numbering used by bench instrument
/// drivers, starting at 10000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quantity {
    Voltage,
    Current,
    Resistance,
    Capacitance,
    Temperature,
    Frequency,
    DutyCycle,
    Continuity,
    Conductance,
    Power,
    Gain,
    SoundPressureLevel,
    RelativeHumidity,
    Time,
    Pressure,
    PowerFactor,
    ApparentPower,
    Mass,
    Energy,
    ElectricCharge,
}

impl Quantity {
    const CODES: &'static [(Quantity, u32)] = &[
        (Quantity::Voltage, 10000),
        (Quantity::Current, 10001),
        (Quantity::Resistance, 10002),
        (Quantity::Capacitance, 10003),
        (Quantity::Temperature, 10004),
        (Quantity::Frequency, 10005),
        (Quantity::DutyCycle, 10006),
        (Quantity::Continuity, 10007),
        (Quantity::Conductance, 10009),
        (Quantity::Power, 10010),
        (Quantity::Gain, 10011),
        (Quantity::SoundPressureLevel, 10012),
        (Quantity::RelativeHumidity, 10014),
        (Quantity::Time, 10015),
        (Quantity::Pressure, 10017),
        (Quantity::PowerFactor, 10029),
        (Quantity::ApparentPower, 10030),
        (Quantity::Mass, 10031),
        (Quantity::Energy, 10033),
        (Quantity::ElectricCharge, 10034),
    ];

    /// All known quantities
    pub fn all() -> impl Iterator<Item = Quantity> {
        Self::CODES.iter().map(|(q, _)| *q)
    }

    /// Stable numeric code, as persisted
    pub fn code(&self) -> u32 {
        Self::CODES
            .iter()
            .find(|(q, _)| q == self)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    /// Look up a quantity by its persisted code
    pub fn from_code(code: u32) -> Option<Quantity> {
        Self::CODES.iter().find(|(_, c)| *c == code).map(|(q, _)| *q)
    }

    /// Unit a fresh signal of this quantity defaults to
    pub fn default_unit(&self) -> Unit {
        match self {
            Quantity::Voltage => Unit::Volt,
            Quantity::Current => Unit::Ampere,
            Quantity::Resistance => Unit::Ohm,
            Quantity::Capacitance => Unit::Farad,
            Quantity::Temperature => Unit::Celsius,
            Quantity::Frequency => Unit::Hertz,
            Quantity::DutyCycle | Quantity::RelativeHumidity => Unit::Percentage,
            Quantity::Continuity => Unit::Boolean,
            Quantity::Conductance => Unit::Siemens,
            Quantity::Power => Unit::Watt,
            Quantity::Gain => Unit::Decibel,
            Quantity::SoundPressureLevel => Unit::DecibelSpl,
            Quantity::Time => Unit::Second,
            Quantity::Pressure => Unit::Pascal,
            Quantity::PowerFactor => Unit::Unitless,
            Quantity::ApparentPower => Unit::VoltAmpere,
            Quantity::Mass => Unit::Gram,
            Quantity::Energy => Unit::WattHour,
            Quantity::ElectricCharge => Unit::Coulomb,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Quantity::Voltage => "Voltage",
            Quantity::Current => "Current",
            Quantity::Resistance => "Resistance",
            Quantity::Capacitance => "Capacitance",
            Quantity::Temperature => "Temperature",
            Quantity::Frequency => "Frequency",
            Quantity::DutyCycle => "Duty Cycle",
            Quantity::Continuity => "Continuity",
            Quantity::Conductance => "Conductance",
            Quantity::Power => "Power",
            Quantity::Gain => "Gain",
            Quantity::SoundPressureLevel => "Sound Pressure Level",
            Quantity::RelativeHumidity => "Relative Humidity",
            Quantity::Time => "Time",
            Quantity::Pressure => "Pressure",
            Quantity::PowerFactor => "Power Factor",
            Quantity::ApparentPower => "Apparent Power",
            Quantity::Mass => "Mass",
            Quantity::Energy => "Energy",
            Quantity::ElectricCharge => "Electric Charge",
        };
        write!(f, "{}", name)
    }
}

/// Bitmask of measurement qualifiers (AC, DC, RMS, hold, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct QuantityFlags(u64);

impl QuantityFlags {
    pub const NONE: QuantityFlags = QuantityFlags(0);
    pub const AC: QuantityFlags = QuantityFlags(0x01);
    pub const DC: QuantityFlags = QuantityFlags(0x02);
    pub const RMS: QuantityFlags = QuantityFlags(0x04);
    pub const DIODE: QuantityFlags = QuantityFlags(0x08);
    pub const HOLD: QuantityFlags = QuantityFlags(0x10);
    pub const MAX: QuantityFlags = QuantityFlags(0x20);
    pub const MIN: QuantityFlags = QuantityFlags(0x40);
    pub const AUTORANGE: QuantityFlags = QuantityFlags(0x80);
    pub const RELATIVE: QuantityFlags = QuantityFlags(0x100);
    pub const AVG: QuantityFlags = QuantityFlags(0x40000);
    pub const REFERENCE: QuantityFlags = QuantityFlags(0x80000);
    pub const FOUR_WIRE: QuantityFlags = QuantityFlags(0x200000);

    const NAMES: &'static [(QuantityFlags, &'static str)] = &[
        (QuantityFlags::AC, "AC"),
        (QuantityFlags::DC, "DC"),
        (QuantityFlags::RMS, "RMS"),
        (QuantityFlags::DIODE, "Diode"),
        (QuantityFlags::HOLD, "Hold"),
        (QuantityFlags::MAX, "Max"),
        (QuantityFlags::MIN, "Min"),
        (QuantityFlags::AUTORANGE, "Auto"),
        (QuantityFlags::RELATIVE, "Rel"),
        (QuantityFlags::AVG, "Avg"),
        (QuantityFlags::REFERENCE, "Ref"),
        (QuantityFlags::FOUR_WIRE, "4W"),
    ];

    pub const fn from_bits(bits: u64) -> Self {
        QuantityFlags(bits)
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn contains(&self, other: QuantityFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for QuantityFlags {
    type Output = QuantityFlags;

    fn bitor(self, rhs: QuantityFlags) -> QuantityFlags {
        QuantityFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for QuantityFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join(" "))
    }
}

/// Physical unit of a signal's samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Unit {
    Volt,
    Ampere,
    Ohm,
    Farad,
    Celsius,
    Hertz,
    Percentage,
    Boolean,
    Second,
    Siemens,
    Watt,
    VoltAmpere,
    WattHour,
    Decibel,
    DecibelSpl,
    Pascal,
    Gram,
    Coulomb,
    #[default]
    Unitless,
}

impl Unit {
    /// Symbol shown next to values and on plot axes
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Volt => "V",
            Unit::Ampere => "A",
            Unit::Ohm => "Ω",
            Unit::Farad => "F",
            Unit::Celsius => "°C",
            Unit::Hertz => "Hz",
            Unit::Percentage => "%",
            Unit::Boolean => "",
            Unit::Second => "s",
            Unit::Siemens => "S",
            Unit::Watt => "W",
            Unit::VoltAmpere => "VA",
            Unit::WattHour => "Wh",
            Unit::Decibel => "dB",
            Unit::DecibelSpl => "dB SPL",
            Unit::Pascal => "Pa",
            Unit::Gram => "g",
            Unit::Coulomb => "C",
            Unit::Unitless => "",
        }
    }
}

/// Key a channel indexes its signals by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalKey {
    pub quantity: Quantity,
    pub flags: QuantityFlags,
}

impl SignalKey {
    pub fn new(quantity: Quantity, flags: QuantityFlags) -> Self {
        Self { quantity, flags }
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.flags.is_empty() {
            write!(f, "{}", self.quantity)
        } else {
            write!(f, "{} {}", self.quantity, self.flags)
        }
    }
}

/// Placement of a view inside a device tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DockArea {
    Left,
    Right,
    Top,
    #[default]
    Bottom,
    Floating,
}

impl DockArea {
    pub const ALL: [DockArea; 5] = [
        DockArea::Left,
        DockArea::Right,
        DockArea::Top,
        DockArea::Bottom,
        DockArea::Floating,
    ];

    /// Name used in the settings store
    pub fn as_str(&self) -> &'static str {
        match self {
            DockArea::Left => "left",
            DockArea::Right => "right",
            DockArea::Top => "top",
            DockArea::Bottom => "bottom",
            DockArea::Floating => "floating",
        }
    }

    pub fn parse(s: &str) -> Option<DockArea> {
        Self::ALL.iter().copied().find(|a| a.as_str() == s)
    }
}

impl fmt::Display for DockArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_codes_are_unique() {
        let mut codes: Vec<u32> = Quantity::all().map(|q| q.code()).collect();
        let len = codes.len();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), len);
    }

    #[test]
    fn test_quantity_from_code() {
        assert_eq!(Quantity::from_code(10000), Some(Quantity::Voltage));
        assert_eq!(Quantity::from_code(10001), Some(Quantity::Current));
        assert_eq!(Quantity::from_code(42), None);
    }

    #[test]
    fn test_flags_display() {
        let flags = QuantityFlags::AC | QuantityFlags::RMS;
        assert_eq!(flags.to_string(), "AC RMS");
        assert!(flags.contains(QuantityFlags::AC));
        assert!(!flags.contains(QuantityFlags::DC));
        assert_eq!(QuantityFlags::NONE.to_string(), "");
    }

    #[test]
    fn test_signal_key_display() {
        let key = SignalKey::new(Quantity::Voltage, QuantityFlags::DC);
        assert_eq!(key.to_string(), "Voltage DC");
        let key = SignalKey::new(Quantity::Current, QuantityFlags::NONE);
        assert_eq!(key.to_string(), "Current");
    }

    #[test]
    fn test_device_type_groups() {
        assert!(DeviceType::PowerSupply.is_source_sink());
        assert!(DeviceType::ElectronicLoad.is_source_sink());
        assert!(!DeviceType::Multimeter.is_source_sink());
        assert!(DeviceType::Scale.is_measurement());
        assert!(!DeviceType::Demo.is_measurement());
    }

    #[test]
    fn test_dock_area_parse() {
        for area in DockArea::ALL {
            assert_eq!(DockArea::parse(area.as_str()), Some(area));
        }
        assert_eq!(DockArea::parse("middle"), None);
    }
}
