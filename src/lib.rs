//! # BenchVis-RS: Scriptable Bench-Instrument Viewer
//!
//! Devices (power supplies, loads, meters, a simulated demo device) publish
//! channels and signals into a shared [`Registry`]. User scripts written in
//! Rhai run on a worker thread and build the UI through a [`UiBridge`]:
//! opening device tabs, placing data/plot/panel/control views, and asking
//! the user for input. All widget work happens on the GUI thread, which
//! drains the bridge once per frame through a [`GuiExecutor`].
//!
//! ## Architecture
//!
//! - **Registry**: devices, channels, signals and configurables
//! - **Bridge**: request queue and one-shot completions between threads
//! - **Executor**: GUI-side request handling, dialogs and notices
//! - **Views**: view model, control-view dispatch and the workspace
//! - **Scripting**: Rhai engine and the script worker thread
//! - **Frontend**: eframe/egui application with egui_dock and egui_plot
//!
//! ## Configuration
//!
//! Settings and the saved session live in the platform data directory under
//! `dev.benchvis.benchvis-rs`:
//!
//! - **Linux**: `~/.local/share/dev.benchvis.benchvis-rs/`
//! - **macOS**: `~/Library/Application Support/dev.benchvis.benchvis-rs/`
//! - **Windows**: `%APPDATA%\dev.benchvis.benchvis-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use benchvis_rs::{bridge::UiBridge, executor::GuiExecutor, Registry};
//!
//! let registry = Registry::new();
//! let (bridge, endpoint) = UiBridge::new();
//! let mut executor = GuiExecutor::new(registry.clone(), endpoint);
//!
//! let worker = std::thread::spawn(move || {
//!     bridge.show_message("Hello", "from the script thread")
//! });
//! // once per frame on the GUI thread:
//! executor.process_pending();
//! ```

pub mod bridge;
pub mod config;
pub mod demo;
pub mod error;
pub mod executor;
pub mod frontend;
pub mod registry;
pub mod scripting;
pub mod types;
pub mod views;

// Re-export commonly used types
pub use bridge::{BridgeEndpoint, CallOutcome, UiBridge, UiRequest};
pub use config::{AppConfig, SettingsStore};
pub use error::{BenchVisError, Result};
pub use executor::GuiExecutor;
pub use frontend::BenchVisApp;
pub use registry::{Channel, Configurable, Device, Registry, Signal};
pub use scripting::{ScriptEngine, ScriptEvent, ScriptRunner};
pub use types::{DeviceType, DockArea, Quantity, QuantityFlags, Unit};
pub use views::{View, ViewId, ViewKind, Workspace};
