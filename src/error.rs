//! Error handling for the BenchVis-RS application
//!
//! This module defines the crate-wide error type and a Result alias. Module
//! level errors (`RegistryError`, `BridgeError`) convert into it with `?`.

use crate::bridge::BridgeError;
use crate::registry::RegistryError;
use thiserror::Error;

/// Main error type for BenchVis-RS operations
#[derive(Error, Debug)]
pub enum BenchVisError {
    /// Errors raised by the device/channel/signal registry
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Errors raised by the script-to-UI bridge
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Errors related to Rhai script execution
    #[error("Script error: {0}")]
    Script(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<BenchVisError>,
    },
}

impl BenchVisError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        BenchVisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        BenchVisError::Script(err.to_string())
    }
}

impl From<toml::de::Error> for BenchVisError {
    fn from(err: toml::de::Error) -> Self {
        BenchVisError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for BenchVisError {
    fn from(err: toml::ser::Error) -> Self {
        BenchVisError::Serialization(err.to_string())
    }
}

/// Result type alias for BenchVis-RS operations
pub type Result<T> = std::result::Result<T, BenchVisError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BenchVisError::Config("missing data dir".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing data dir");
    }

    #[test]
    fn test_error_with_context() {
        let err = BenchVisError::Script("unexpected token".to_string());
        let with_ctx = err.with_context("Failed to run startup script");
        assert!(with_ctx.to_string().starts_with("Failed to run startup script"));
        assert!(with_ctx.to_string().contains("unexpected token"));
    }

    #[test]
    fn test_module_errors_convert() {
        let err: BenchVisError = BridgeError::CallInFlight.into();
        assert!(matches!(err, BenchVisError::Bridge(BridgeError::CallInFlight)));

        let err: BenchVisError = RegistryError::AmbiguousSignal {
            channel: "A1".to_string(),
            quantity: "Voltage".to_string(),
            count: 2,
        }
        .into();
        assert!(err.to_string().contains("A1"));
    }

    #[test]
    fn test_result_ext_context() {
        let res: Result<()> = Err(BenchVisError::Config("bad".into()));
        let err = res.context("loading config").unwrap_err();
        assert!(matches!(err, BenchVisError::WithContext { .. }));
    }
}
