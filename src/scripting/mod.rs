//! Rhai Scripting for Device Automation
//!
//! Scripts run on a worker thread ([`ScriptRunner`]) and talk to the GUI
//! only through the [`UiBridge`](crate::bridge::UiBridge).
//!
//! ## Lookups
//!
//! - `device(id)` / `devices()` - registry lookup; unknown ids give `()`
//! - `dev.id()`, `dev.name()`, `dev.device_type()`
//! - `dev.channel(name)`, `dev.channels()`, `dev.configurable(name)`, `dev.configurables()`
//! - `ch.name()`, `ch.index()`, `ch.actual_signal()`, `ch.signals()`
//! - `sig.name()`, `sig.unit()`, `sig.last_value()`, `sig.sample_count()`
//!
//! ## UI
//!
//! Areas are `DockArea::Left`, `Right`, `Top`, `Bottom` and `Floating`.
//! View-creating functions block until the GUI has placed the view and
//! return its id, or `""` if it could not be created.
//!
//! - `ui_add_device_tab(dev)`
//! - `ui_add_data_view(dev_id, area, sig)`
//! - `ui_add_control_view(dev_id, area, configurable)`
//! - `ui_add_plot_view(dev_id, area, ch | sig)` / `ui_add_plot_view(dev_id, area, x_sig, y_sig)`
//! - `ui_add_power_panel_view(dev_id, area, voltage_sig, current_sig)`
//! - `ui_add_value_panel_view(dev_id, area, ch | sig)`
//! - `ui_add_signal_to_data_view(dev_id, view_id, sig)`
//! - `ui_add_signal_to_plot_view(dev_id, view_id, sig)`
//! - `ui_add_signals_to_xy_plot_view(dev_id, view_id, x_sig, y_sig)`
//! - `ui_show_message_box(title, text)` - `true` if confirmed
//! - `ui_show_string_input_dialog(title, label [, value])`
//! - `ui_show_double_input_dialog(title, label [, value, decimals, step, min, max])`
//! - `ui_show_int_input_dialog(title, label [, value, step, min, max])`
//!
//! Input dialogs return `()` when canceled.
//!
//! ## Example
//!
//! ```rhai
//! let dev = devices()[0];
//! ui_add_device_tab(dev);
//! let id = ui_add_plot_view(dev.id(), DockArea::Top, dev.channel("A1"));
//! if id == "" { print("plot failed"); }
//! ```

mod engine;
mod runner;

pub use engine::ScriptEngine;
pub use runner::ScriptRunner;

/// Progress reported by the script worker
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptEvent {
    Started { name: String },
    Finished { name: String },
    Error { name: String, message: String },
    /// Output of `print` / `debug`
    Output(String),
}

/// Scripts offered by the editor's example menu
pub mod builtins {
    /// Open a tab for every device and plot its first channel
    pub const TABS_FOR_ALL: &str = r#"
for dev in devices() {
    ui_add_device_tab(dev);
    let chs = dev.channels();
    if chs.len() > 0 {
        ui_add_plot_view(dev.id(), DockArea::Top, chs[0]);
    }
}
"#;

    /// Data and value panels for the demo device
    pub const DEMO_PANELS: &str = r#"
let dev = ();
for d in devices() {
    if d.device_type() == "Demo Device" { dev = d; }
}
if dev == () {
    ui_show_message_box("Demo", "No demo device connected");
    return;
}
ui_add_device_tab(dev);
let a1 = dev.channel("A1").actual_signal();
let a2 = dev.channel("A2").actual_signal();
let data = ui_add_data_view(dev.id(), DockArea::Right, a1);
ui_add_signal_to_data_view(dev.id(), data, a2);
ui_add_value_panel_view(dev.id(), DockArea::Bottom, dev.channel("A1"));
ui_add_control_view(dev.id(), DockArea::Left, dev.configurable("A1"));
"#;

    /// XY plot of two demo signals
    pub const XY_PLOT: &str = r#"
let dev = devices()[0];
ui_add_device_tab(dev);
let x = dev.channel("A1").actual_signal();
let y = dev.channel("A2").actual_signal();
let id = ui_add_plot_view(dev.id(), DockArea::Floating, x, y);
print("xy plot: " + id);
"#;

    /// Ask the user for a value
    pub const ASK_VALUE: &str = r#"
let v = ui_show_double_input_dialog("Setpoint", "Voltage [V]", 5.0, 3, 0.1, 0.0, 30.0);
if v == () {
    print("canceled");
} else {
    print("setpoint: " + v);
}
"#;

    /// Every example, by display name
    pub const ALL: &[(&str, &str)] = &[
        ("Tabs for all devices", TABS_FOR_ALL),
        ("Demo panels", DEMO_PANELS),
        ("XY plot", XY_PLOT),
        ("Ask for a value", ASK_VALUE),
    ];
}
