//! Configuration module for BenchVis-RS
//!
//! This module handles:
//! - Application preferences ([`AppConfig`]), stored as TOML
//! - The hierarchical [`SettingsStore`] used to save and restore device tabs
//!   and their views between sessions
//!
//! # App Data Location
//!
//! - **Linux**: `~/.local/share/dev.benchvis.benchvis-rs/`
//! - **macOS**: `~/Library/Application Support/dev.benchvis.benchvis-rs/`
//! - **Windows**: `%APPDATA%\dev.benchvis.benchvis-rs\`
//!
//! # Files
//!
//! - `config.toml` - Preferences
//! - `session.toml` - Device tab layout from the last session
//! - `logs/` - Rolling log files, when file logging is enabled

pub mod settings_store;

pub use settings_store::{SettingValue, SettingsStore};

use crate::error::{BenchVisError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for data directories
pub const APP_ID: &str = "dev.benchvis.benchvis-rs";

pub const CONFIG_FILE: &str = "config.toml";

pub const SESSION_FILE: &str = "session.toml";

pub const LOG_DIR: &str = "logs";

/// Default Rhai operation budget per script run
pub const DEFAULT_MAX_OPERATIONS: u64 = 50_000_000;

/// Default sample rate of the demo device
pub const DEFAULT_DEMO_SAMPLE_RATE_HZ: f64 = 20.0;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        BenchVisError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            BenchVisError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

pub fn session_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(SESSION_FILE))
}

// ==================== App Config ====================

/// Script-to-UI bridge settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Timeout applied to blocking UI calls; `None` waits forever
    #[serde(default)]
    pub default_timeout_ms: Option<u64>,
}

impl BridgeConfig {
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }
}

/// Script engine limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptConfig {
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,

    #[serde(default = "default_max_call_levels")]
    pub max_call_levels: usize,

    /// Directory the script file dialog opens in
    #[serde(default)]
    pub default_dir: Option<PathBuf>,
}

fn default_max_operations() -> u64 {
    DEFAULT_MAX_OPERATIONS
}

fn default_max_call_levels() -> usize {
    64
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            max_operations: DEFAULT_MAX_OPERATIONS,
            max_call_levels: default_max_call_levels(),
            default_dir: None,
        }
    }
}

/// Demo device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: f64,
}

fn default_sample_rate() -> f64 {
    DEFAULT_DEMO_SAMPLE_RATE_HZ
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_rate_hz: DEFAULT_DEMO_SAMPLE_RATE_HZ,
        }
    }
}

/// UI preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiPreferences {
    #[serde(default = "default_true")]
    pub dark_mode: bool,

    #[serde(default = "default_font_scale")]
    pub font_scale: f32,

    /// Restore device tabs from the last session on startup
    #[serde(default = "default_true")]
    pub restore_session: bool,
}

fn default_true() -> bool {
    true
}

fn default_font_scale() -> f32 {
    1.0
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            dark_mode: true,
            font_scale: 1.0,
            restore_session: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to a daily rolling file in the app data dir
    #[serde(default)]
    pub file_logging: bool,
}

/// Persistent application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version for future migration support
    #[serde(default = "default_config_version")]
    pub version: u32,

    #[serde(default)]
    pub bridge: BridgeConfig,

    #[serde(default)]
    pub script: ScriptConfig,

    #[serde(default)]
    pub demo: DemoConfig,

    #[serde(default)]
    pub ui: UiPreferences,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_config_version() -> u32 {
    1
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            bridge: BridgeConfig::default(),
            script: ScriptConfig::default(),
            demo: DemoConfig::default(),
            ui: UiPreferences::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load a config file; a missing file yields the defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| BenchVisError::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| BenchVisError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        let path = config_path().ok_or_else(|| {
            BenchVisError::Config("Could not determine config path".to_string())
        })?;
        Self::load_from(path)
    }

    /// Load config, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| BenchVisError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| BenchVisError::Config(format!("Failed to write config: {}", e)))
    }

    /// Save to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(dir.join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bridge.default_timeout(), None);
        assert!(config.demo.enabled);
        assert_eq!(config.script.max_operations, DEFAULT_MAX_OPERATIONS);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [bridge]
            default_timeout_ms = 2500

            [demo]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(
            config.bridge.default_timeout(),
            Some(Duration::from_millis(2500))
        );
        assert!(!config.demo.enabled);
        assert_eq!(config.demo.sample_rate_hz, DEFAULT_DEMO_SAMPLE_RATE_HZ);
        assert!(config.ui.dark_mode);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut config = AppConfig::default();
        config.ui.font_scale = 1.25;
        config.logging.file_logging = true;
        config.save_to(&path).unwrap();

        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
