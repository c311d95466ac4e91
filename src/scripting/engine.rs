//! Rhai Script Engine Implementation
//!
//! Builds a Rhai [`Engine`] with the device lookup and UI functions
//! registered. Every UI function goes through the [`UiBridge`], so the engine
//! can live on any thread except the GUI thread (blocking calls would
//! deadlock it).

use crate::bridge::{BridgeError, PlotSource, UiBridge};
use crate::config::ScriptConfig;
use crate::error::{BenchVisError, Result};
use crate::registry::{Channel, Configurable, Device, Registry, Signal};
use crate::scripting::ScriptEvent;
use crate::types::DockArea;
use crate::views::{ValueSource, ViewId};
use crossbeam_channel::Sender;
use rhai::{Array, Dynamic, Engine, EvalAltResult, Module};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

type FnResult<T> = std::result::Result<T, Box<EvalAltResult>>;

const SLEEP_SLICE: Duration = Duration::from_millis(20);

/// Largest bound the short input dialog forms use
const INPUT_LIMIT: i64 = 2_147_483_647;

fn bridge_err(e: BridgeError) -> Box<EvalAltResult> {
    e.to_string().into()
}

fn view_id(result: std::result::Result<ViewId, BridgeError>) -> FnResult<String> {
    result.map(|id| id.to_string()).map_err(bridge_err)
}

fn some_or_unit<T: Clone + Send + Sync + 'static>(value: Option<T>) -> Dynamic {
    value.map(Dynamic::from).unwrap_or(Dynamic::UNIT)
}

fn to_array<T: Clone + Send + Sync + 'static>(items: Vec<T>) -> Array {
    items.into_iter().map(Dynamic::from).collect()
}

/// Script engine with the BenchVis API registered
pub struct ScriptEngine {
    engine: Engine,
}

impl ScriptEngine {
    pub fn new(registry: Registry, bridge: UiBridge, config: &ScriptConfig) -> Self {
        let mut engine = Engine::new();
        Self::configure_limits(&mut engine, config);
        Self::register_types(&mut engine);
        Self::register_lookups(&mut engine, registry);
        Self::register_ui(&mut engine, bridge);
        Self::register_sleep(&mut engine, Arc::new(AtomicBool::new(false)));

        Self { engine }
    }

    fn configure_limits(engine: &mut Engine, config: &ScriptConfig) {
        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(config.max_call_levels);
        engine.set_max_operations(config.max_operations);
        engine.set_max_string_size(1_000_000);
        engine.set_max_array_size(100_000);
        engine.set_max_map_size(10_000);
    }

    /// Route `print` and `debug` output to the runner's event channel
    pub fn set_output(&mut self, events: Sender<ScriptEvent>) {
        let tx = events.clone();
        self.engine.on_print(move |s| {
            let _ = tx.send(ScriptEvent::Output(s.to_string()));
        });
        self.engine.on_debug(move |s, _, pos| {
            let _ = events.send(ScriptEvent::Output(format!("[{}] {}", pos, s)));
        });
    }

    /// `sleep(ms)` waits in slices so a stop request ends it early
    fn register_sleep(engine: &mut Engine, stop: Arc<AtomicBool>) {
        engine.register_fn("sleep", move |ms: i64| -> FnResult<()> {
            let deadline = Instant::now() + Duration::from_millis(ms.max(0) as u64);
            loop {
                if stop.load(Ordering::Relaxed) {
                    return Err("stopped".into());
                }
                let now = Instant::now();
                if now >= deadline {
                    return Ok(());
                }
                std::thread::sleep((deadline - now).min(SLEEP_SLICE));
            }
        });
    }

    /// Abort the running script at its next operation once `stop` is set
    pub fn set_stop_flag(&mut self, stop: Arc<AtomicBool>) {
        Self::register_sleep(&mut self.engine, stop.clone());
        self.engine.on_progress(move |_| {
            if stop.load(Ordering::Relaxed) {
                Some(Dynamic::from("stopped"))
            } else {
                None
            }
        });
    }

    fn register_types(engine: &mut Engine) {
        engine
            .register_type_with_name::<Arc<Device>>("Device")
            .register_type_with_name::<Arc<Channel>>("Channel")
            .register_type_with_name::<Arc<Signal>>("Signal")
            .register_type_with_name::<Arc<Configurable>>("Configurable")
            .register_type_with_name::<DockArea>("DockArea");

        engine.register_fn("to_string", |a: &mut DockArea| a.to_string());
        engine.register_fn("==", |a: DockArea, b: DockArea| a == b);

        let mut areas = Module::new();
        areas.set_var("Left", DockArea::Left);
        areas.set_var("Right", DockArea::Right);
        areas.set_var("Top", DockArea::Top);
        areas.set_var("Bottom", DockArea::Bottom);
        areas.set_var("Floating", DockArea::Floating);
        engine.register_static_module("DockArea", areas.into());
    }

    fn register_lookups(engine: &mut Engine, registry: Registry) {
        {
            let registry = registry.clone();
            engine.register_fn("device", move |id: &str| some_or_unit(registry.device(id)));
        }
        engine.register_fn("devices", move || to_array(registry.devices()));

        // Device
        engine.register_fn("id", |d: &mut Arc<Device>| d.id().to_string());
        engine.register_fn("name", |d: &mut Arc<Device>| d.name().to_string());
        engine.register_fn("device_type", |d: &mut Arc<Device>| {
            d.device_type().to_string()
        });
        engine.register_fn("channel", |d: &mut Arc<Device>, name: &str| {
            some_or_unit(d.channel(name))
        });
        engine.register_fn("channels", |d: &mut Arc<Device>| to_array(d.channels()));
        engine.register_fn("configurable", |d: &mut Arc<Device>, name: &str| {
            some_or_unit(d.configurable(name))
        });
        engine.register_fn("configurables", |d: &mut Arc<Device>| {
            to_array(d.configurables())
        });

        // Channel
        engine.register_fn("name", |c: &mut Arc<Channel>| c.name().to_string());
        engine.register_fn("index", |c: &mut Arc<Channel>| i64::from(c.index()));
        engine.register_fn("actual_signal", |c: &mut Arc<Channel>| {
            some_or_unit(c.active_signal())
        });
        engine.register_fn("signals", |c: &mut Arc<Channel>| to_array(c.all_signals()));

        // Signal
        engine.register_fn("name", |s: &mut Arc<Signal>| s.display_name());
        engine.register_fn("unit", |s: &mut Arc<Signal>| s.unit().symbol().to_string());
        engine.register_fn("sample_count", |s: &mut Arc<Signal>| s.len() as i64);
        engine.register_fn("last_value", |s: &mut Arc<Signal>| {
            some_or_unit(s.last_sample().map(|smp| smp.value))
        });

        // Configurable
        engine.register_fn("name", |c: &mut Arc<Configurable>| c.name().to_string());
    }

    fn register_ui(engine: &mut Engine, bridge: UiBridge) {
        // ===== Non-blocking =====
        {
            let b = bridge.clone();
            engine.register_fn("ui_add_device_tab", move |d: Arc<Device>| -> FnResult<()> {
                b.add_device_tab(d).map_err(bridge_err)
            });
        }
        {
            let b = bridge.clone();
            engine.register_fn(
                "ui_add_signal_to_data_view",
                move |dev: &str, view: &str, s: Arc<Signal>| -> FnResult<()> {
                    b.add_signal_to_data_view(dev, &ViewId::from(view), s)
                        .map_err(bridge_err)
                },
            );
        }
        {
            let b = bridge.clone();
            engine.register_fn(
                "ui_add_signal_to_plot_view",
                move |dev: &str, view: &str, s: Arc<Signal>| -> FnResult<()> {
                    b.add_signal_to_plot_view(dev, &ViewId::from(view), s)
                        .map_err(bridge_err)
                },
            );
        }
        {
            let b = bridge.clone();
            engine.register_fn(
                "ui_add_signals_to_xy_plot_view",
                move |dev: &str, view: &str, x: Arc<Signal>, y: Arc<Signal>| -> FnResult<()> {
                    b.add_signals_to_xy_plot_view(dev, &ViewId::from(view), x, y)
                        .map_err(bridge_err)
                },
            );
        }

        // ===== Blocking: views =====
        {
            let b = bridge.clone();
            engine.register_fn(
                "ui_add_data_view",
                move |dev: &str, area: DockArea, s: Arc<Signal>| -> FnResult<String> {
                    view_id(b.create_data_view(dev, area, s))
                },
            );
        }
        {
            let b = bridge.clone();
            engine.register_fn(
                "ui_add_control_view",
                move |dev: &str, area: DockArea, c: Arc<Configurable>| -> FnResult<String> {
                    view_id(b.create_control_view(dev, area, c))
                },
            );
        }
        {
            let b = bridge.clone();
            engine.register_fn(
                "ui_add_plot_view",
                move |dev: &str, area: DockArea, c: Arc<Channel>| -> FnResult<String> {
                    view_id(b.create_plot_view(dev, area, PlotSource::Channel(c)))
                },
            );
        }
        {
            let b = bridge.clone();
            engine.register_fn(
                "ui_add_plot_view",
                move |dev: &str, area: DockArea, s: Arc<Signal>| -> FnResult<String> {
                    view_id(b.create_plot_view(dev, area, PlotSource::Signal(s)))
                },
            );
        }
        {
            let b = bridge.clone();
            engine.register_fn(
                "ui_add_plot_view",
                move |dev: &str, area: DockArea, x: Arc<Signal>, y: Arc<Signal>| -> FnResult<String> {
                    view_id(b.create_plot_view(dev, area, PlotSource::Xy { x, y }))
                },
            );
        }
        {
            let b = bridge.clone();
            engine.register_fn(
                "ui_add_power_panel_view",
                move |dev: &str, area: DockArea, v: Arc<Signal>, i: Arc<Signal>| -> FnResult<String> {
                    view_id(b.create_power_panel_view(dev, area, v, i))
                },
            );
        }
        {
            let b = bridge.clone();
            engine.register_fn(
                "ui_add_value_panel_view",
                move |dev: &str, area: DockArea, c: Arc<Channel>| -> FnResult<String> {
                    view_id(b.create_value_panel_view(dev, area, ValueSource::Channel(c)))
                },
            );
        }
        {
            let b = bridge.clone();
            engine.register_fn(
                "ui_add_value_panel_view",
                move |dev: &str, area: DockArea, s: Arc<Signal>| -> FnResult<String> {
                    view_id(b.create_value_panel_view(dev, area, ValueSource::Signal(s)))
                },
            );
        }

        // ===== Blocking: dialogs =====
        {
            let b = bridge.clone();
            engine.register_fn(
                "ui_show_message_box",
                move |title: &str, text: &str| -> FnResult<bool> {
                    b.show_message(title, text).map_err(bridge_err)
                },
            );
        }
        {
            let b = bridge.clone();
            engine.register_fn(
                "ui_show_string_input_dialog",
                move |title: &str, label: &str| -> FnResult<Dynamic> {
                    b.show_string_input(title, label, "")
                        .map(some_or_unit)
                        .map_err(bridge_err)
                },
            );
        }
        {
            let b = bridge.clone();
            engine.register_fn(
                "ui_show_string_input_dialog",
                move |title: &str, label: &str, value: &str| -> FnResult<Dynamic> {
                    b.show_string_input(title, label, value)
                        .map(some_or_unit)
                        .map_err(bridge_err)
                },
            );
        }
        {
            let b = bridge.clone();
            engine.register_fn(
                "ui_show_double_input_dialog",
                move |title: &str, label: &str| -> FnResult<Dynamic> {
                    b.show_double_input(
                        title,
                        label,
                        0.0,
                        1,
                        0.1,
                        -INPUT_LIMIT as f64,
                        INPUT_LIMIT as f64,
                    )
                    .map(some_or_unit)
                    .map_err(bridge_err)
                },
            );
        }
        {
            let b = bridge.clone();
            engine.register_fn(
                "ui_show_double_input_dialog",
                move |title: &str,
                      label: &str,
                      value: f64,
                      decimals: i64,
                      step: f64,
                      min: f64,
                      max: f64|
                      -> FnResult<Dynamic> {
                    let decimals = u32::try_from(decimals.max(0)).unwrap_or(0);
                    b.show_double_input(title, label, value, decimals, step, min, max)
                        .map(some_or_unit)
                        .map_err(bridge_err)
                },
            );
        }
        {
            let b = bridge.clone();
            engine.register_fn(
                "ui_show_int_input_dialog",
                move |title: &str, label: &str| -> FnResult<Dynamic> {
                    b.show_int_input(title, label, 0, 1, -INPUT_LIMIT, INPUT_LIMIT)
                        .map(some_or_unit)
                        .map_err(bridge_err)
                },
            );
        }
        engine.register_fn(
            "ui_show_int_input_dialog",
            move |title: &str,
                  label: &str,
                  value: i64,
                  step: i64,
                  min: i64,
                  max: i64|
                  -> FnResult<Dynamic> {
                bridge
                    .show_int_input(title, label, value, step, min, max)
                    .map(some_or_unit)
                    .map_err(bridge_err)
            },
        );
    }

    /// Compile and run a script to completion
    pub fn run(&self, source: &str) -> Result<()> {
        self.engine
            .run(source)
            .map_err(BenchVisError::from_rhai_error)
    }

    /// Check that a script compiles
    pub fn validate(&self, source: &str) -> Result<()> {
        self.engine
            .compile(source)
            .map(|_| ())
            .map_err(|e| BenchVisError::Script(format!("Compilation error: {}", e)))
    }

    /// Get a reference to the underlying Rhai engine
    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}
