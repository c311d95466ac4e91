//! Hierarchical key/value settings store
//!
//! Keys are `/`-separated paths. Callers open nested groups with
//! [`SettingsStore::begin_group`] and then read and write short keys relative
//! to the current group, which keeps save/restore code for nested objects
//! (a view containing curves containing signals) free of path bookkeeping.
//!
//! The store is passed explicitly to whatever saves or restores state, and
//! is written to disk as TOML.

use crate::error::{BenchVisError, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// A single stored value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        SettingValue::Int(v)
    }
}

impl From<u32> for SettingValue {
    fn from(v: u32) -> Self {
        SettingValue::Int(i64::from(v))
    }
}

impl From<u64> for SettingValue {
    /// Stored bit-for-bit, so masks above `i64::MAX` survive a round trip
    fn from(v: u64) -> Self {
        SettingValue::Int(v as i64)
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        SettingValue::Float(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::Text(v.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::Text(v)
    }
}

/// Hierarchical settings with a current-group cursor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsStore {
    #[serde(default)]
    values: BTreeMap<String, SettingValue>,
    #[serde(skip)]
    groups: Vec<String>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BenchVisError::Config(format!("Failed to read settings {:?}: {}", path, e))
        })?;
        toml::from_str::<Self>(&content)
            .map_err(BenchVisError::from)
            .with_context(|| format!("Failed to parse settings {:?}", path))
    }

    /// Write the store to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved {} settings to {:?}", self.values.len(), path);
        Ok(())
    }

    /// Enter a child group; keys are relative to it until `end_group`
    pub fn begin_group(&mut self, name: &str) {
        self.groups.push(name.to_string());
    }

    pub fn end_group(&mut self) {
        self.groups.pop();
    }

    /// Current group path, empty at the root
    pub fn group(&self) -> String {
        self.groups.join("/")
    }

    fn full_key(&self, key: &str) -> String {
        if self.groups.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.group(), key)
        }
    }

    fn group_prefix(&self) -> String {
        if self.groups.is_empty() {
            String::new()
        } else {
            format!("{}/", self.group())
        }
    }

    pub fn set_value(&mut self, key: &str, value: impl Into<SettingValue>) {
        let key = self.full_key(key);
        self.values.insert(key, value.into());
    }

    pub fn value(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(&self.full_key(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(&self.full_key(key))
    }

    pub fn string(&self, key: &str) -> Option<String> {
        match self.value(key)? {
            SettingValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.value(key)? {
            SettingValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn u32(&self, key: &str) -> Option<u32> {
        self.int(key).and_then(|v| u32::try_from(v).ok())
    }

    /// Bit-for-bit counterpart of `From<u64>`
    pub fn u64(&self, key: &str) -> Option<u64> {
        self.int(key).map(|v| v as u64)
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        match self.value(key)? {
            SettingValue::Float(v) => Some(*v),
            SettingValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.value(key)? {
            SettingValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Names of the direct child groups of the current group
    pub fn child_groups(&self) -> Vec<String> {
        let prefix = self.group_prefix();
        let groups: BTreeSet<String> = self
            .values
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter_map(|rest| rest.split_once('/').map(|(head, _)| head.to_string()))
            .collect();
        groups.into_iter().collect()
    }

    /// Remove a child group of the current group and everything under it
    pub fn remove_group(&mut self, name: &str) {
        let prefix = format!("{}/", self.full_key(name));
        self.values.retain(|k, _| !k.starts_with(&prefix));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_prefix_keys() {
        let mut store = SettingsStore::new();
        store.begin_group("devtab");
        store.begin_group("view0");
        store.set_value("id", "data:1234");
        store.end_group();
        store.set_value("device", "psu:1");
        store.end_group();

        assert_eq!(store.string("devtab/view0/id").as_deref(), Some("data:1234"));
        assert_eq!(store.string("devtab/device").as_deref(), Some("psu:1"));
        assert!(store.group().is_empty());
    }

    #[test]
    fn test_child_groups() {
        let mut store = SettingsStore::new();
        store.set_value("a/x", 1u32);
        store.set_value("a/sub/y", 2u32);
        store.set_value("b/z", 3u32);
        store.set_value("top", true);

        assert_eq!(store.child_groups(), vec!["a", "b"]);

        store.begin_group("a");
        assert_eq!(store.child_groups(), vec!["sub"]);
        store.end_group();
    }

    #[test]
    fn test_typed_getters() {
        let mut store = SettingsStore::new();
        store.set_value("code", 10000u32);
        store.set_value("mask", u64::MAX);
        store.set_value("ratio", 0.5);
        store.set_value("name", "A1");

        assert_eq!(store.u32("code"), Some(10000));
        assert_eq!(store.u64("mask"), Some(u64::MAX));
        assert_eq!(store.float("ratio"), Some(0.5));
        assert_eq!(store.float("code"), Some(10000.0));
        assert_eq!(store.u32("name"), None);
        assert_eq!(store.string("missing"), None);
    }

    #[test]
    fn test_remove_group() {
        let mut store = SettingsStore::new();
        store.set_value("tab/view0/id", "data:1");
        store.set_value("tab/view1/id", "data:2");
        store.begin_group("tab");
        store.remove_group("view0");
        assert_eq!(store.child_groups(), vec!["view1"]);
        store.end_group();
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.toml");

        let mut store = SettingsStore::new();
        store.set_value("tab/device", "demo:1");
        store.set_value("tab/view0/signal_qf", 0x200002u64);
        store.set_value("tab/view0/visible", true);
        store.save(&path).unwrap();

        let loaded = SettingsStore::load(&path).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SettingsStore::load(dir.path().join("nope.toml")).is_err());
    }
}
