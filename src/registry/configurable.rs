//! Configurables: sets of getable/setable properties on a device

use crate::types::{ConfigKey, ConfigKeySet, DeviceType};

/// A configurable unit of a device, e.g. one output of a power supply
#[derive(Debug, Clone)]
pub struct Configurable {
    name: String,
    device_id: String,
    device_type: DeviceType,
    getable: ConfigKeySet,
    setable: ConfigKeySet,
}

impl Configurable {
    pub(super) fn new(
        name: &str,
        device_id: String,
        device_type: DeviceType,
        getable: ConfigKeySet,
        setable: ConfigKeySet,
    ) -> Self {
        Self {
            name: name.to_string(),
            device_id,
            device_type,
            getable,
            setable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn getable_keys(&self) -> &ConfigKeySet {
        &self.getable
    }

    pub fn setable_keys(&self) -> &ConfigKeySet {
        &self.setable
    }

    pub fn is_getable(&self, key: ConfigKey) -> bool {
        self.getable.contains(&key)
    }

    pub fn is_setable(&self, key: ConfigKey) -> bool {
        self.setable.contains(&key)
    }

    /// True if any of `keys` can be read or written
    pub fn has_get_or_set_any(&self, keys: &[ConfigKey]) -> bool {
        keys.iter().any(|k| self.is_getable(*k) || self.is_setable(*k))
    }

    /// True if the configurable exposes at least one key
    pub fn has_any_key(&self) -> bool {
        !self.getable.is_empty() || !self.setable.is_empty()
    }
}
