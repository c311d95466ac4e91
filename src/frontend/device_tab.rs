//! Rendering of a device tab and the views it hosts
//!
//! Views are laid out by their [`DockArea`]: side and top/bottom panels
//! inside the tab, floating views in their own window. The remaining space
//! shows an overview of the device's channels.

use crate::demo::{DemoDriver, Waveform};
use crate::frontend::widgets::{curve_color, ValueDisplay};
use crate::registry::{Device, Signal};
use crate::types::{DockArea, Quantity};
use crate::views::{DeviceTab, View, ViewContent, ViewId, ViewKind};
use egui::{Color32, Id, RichText, Ui};
use egui_plot::{Corner, Legend, Line, Plot, PlotPoints};
use std::sync::Arc;

/// Something the user did to a view
#[derive(Debug, Clone, PartialEq)]
pub enum ViewAction {
    Close { device_id: String, view_id: ViewId },
}

/// Render a device tab
pub fn render(
    ui: &mut Ui,
    tab: &DeviceTab,
    mut demo: Option<&mut DemoDriver>,
    actions: &mut Vec<ViewAction>,
) {
    let device = &tab.device;
    let in_area = |area: DockArea| -> Vec<&View> {
        tab.views.iter().filter(|v| v.area == area).collect()
    };

    let top = in_area(DockArea::Top);
    if !top.is_empty() {
        egui::TopBottomPanel::top(Id::new((device.id(), "top")))
            .resizable(true)
            .default_height(220.0)
            .show_inside(ui, |ui| render_row(ui, device, &top, demo.as_deref_mut(), actions));
    }

    let bottom = in_area(DockArea::Bottom);
    if !bottom.is_empty() {
        egui::TopBottomPanel::bottom(Id::new((device.id(), "bottom")))
            .resizable(true)
            .default_height(220.0)
            .show_inside(ui, |ui| render_row(ui, device, &bottom, demo.as_deref_mut(), actions));
    }

    let left = in_area(DockArea::Left);
    if !left.is_empty() {
        egui::SidePanel::left(Id::new((device.id(), "left")))
            .resizable(true)
            .default_width(280.0)
            .show_inside(ui, |ui| render_column(ui, device, &left, demo.as_deref_mut(), actions));
    }

    let right = in_area(DockArea::Right);
    if !right.is_empty() {
        egui::SidePanel::right(Id::new((device.id(), "right")))
            .resizable(true)
            .default_width(280.0)
            .show_inside(ui, |ui| render_column(ui, device, &right, demo.as_deref_mut(), actions));
    }

    let ctx = ui.ctx().clone();
    for view in in_area(DockArea::Floating) {
        let mut open = true;
        egui::Window::new(view.title())
            .id(Id::new(view.id.as_str()))
            .open(&mut open)
            .default_size([420.0, 260.0])
            .show(&ctx, |ui| render_view_body(ui, device, view, demo.as_deref_mut()));
        if !open {
            actions.push(ViewAction::Close {
                device_id: device.id().to_string(),
                view_id: view.id.clone(),
            });
        }
    }

    egui::CentralPanel::default().show_inside(ui, |ui| render_overview(ui, device));
}

fn render_row(
    ui: &mut Ui,
    device: &Arc<Device>,
    views: &[&View],
    mut demo: Option<&mut DemoDriver>,
    actions: &mut Vec<ViewAction>,
) {
    let width = ui.available_width() / views.len() as f32;
    ui.horizontal_top(|ui| {
        for view in views {
            ui.allocate_ui(egui::vec2(width, ui.available_height()), |ui| {
                render_framed(ui, device, view, demo.as_deref_mut(), actions);
            });
        }
    });
}

fn render_column(
    ui: &mut Ui,
    device: &Arc<Device>,
    views: &[&View],
    mut demo: Option<&mut DemoDriver>,
    actions: &mut Vec<ViewAction>,
) {
    egui::ScrollArea::vertical().show(ui, |ui| {
        for view in views {
            render_framed(ui, device, view, demo.as_deref_mut(), actions);
        }
    });
}

fn render_framed(
    ui: &mut Ui,
    device: &Arc<Device>,
    view: &View,
    demo: Option<&mut DemoDriver>,
    actions: &mut Vec<ViewAction>,
) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.horizontal(|ui| {
            ui.label(RichText::new(view.title()).strong());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("✖").on_hover_text("Close view").clicked() {
                    actions.push(ViewAction::Close {
                        device_id: device.id().to_string(),
                        view_id: view.id.clone(),
                    });
                }
            });
        });
        ui.separator();
        render_view_body(ui, device, view, demo);
    });
}

fn render_view_body(ui: &mut Ui, device: &Arc<Device>, view: &View, demo: Option<&mut DemoDriver>) {
    match &view.content {
        ViewContent::Data { signals } => render_data(ui, view, signals),
        ViewContent::TimePlot { curves } => {
            let start = device.start_timestamp();
            Plot::new(view.id.as_str())
                .legend(Legend::default().position(Corner::RightTop))
                .x_axis_label("Time [s]")
                .show(ui, |plot_ui| {
                    for (i, curve) in curves.iter().enumerate() {
                        let Some(signal) = curve.signal() else {
                            continue;
                        };
                        let points: Vec<[f64; 2]> = signal
                            .samples()
                            .iter()
                            .map(|s| [s.timestamp - start, s.value])
                            .collect();
                        let name = format!("{} [{}]", curve.name(), signal.unit().symbol());
                        plot_ui.line(
                            Line::new(name, PlotPoints::from(points))
                                .color(curve_color(i))
                                .width(1.5),
                        );
                    }
                });
        }
        ViewContent::XyPlot { curves } => {
            Plot::new(view.id.as_str())
                .legend(Legend::default().position(Corner::RightTop))
                .show(ui, |plot_ui| {
                    for (i, curve) in curves.iter().enumerate() {
                        let points: Vec<[f64; 2]> = curve
                            .x
                            .samples()
                            .iter()
                            .zip(curve.y.samples().iter())
                            .map(|(x, y)| [x.value, y.value])
                            .collect();
                        let name = format!("{} / {}", curve.y.display_name(), curve.x.display_name());
                        plot_ui.line(
                            Line::new(name, PlotPoints::from(points))
                                .color(curve_color(i))
                                .width(1.5),
                        );
                    }
                });
        }
        ViewContent::PowerPanel { voltage, current } => render_power_panel(ui, voltage, current),
        ViewContent::ValuePanel { source } => {
            ui.add(ValueDisplay::for_signal(source.signal().as_deref()).with_size(32.0));
        }
        ViewContent::Control { configurable } => {
            if view.kind == ViewKind::DemoControl {
                if let Some(driver) = demo.filter(|d| d.device().id() == configurable.device_id()) {
                    render_demo_control(ui, driver, configurable.name());
                    return;
                }
            }
            egui::Grid::new(view.id.as_str())
                .num_columns(3)
                .striped(true)
                .show(ui, |ui| {
                    ui.label(RichText::new("Key").strong());
                    ui.label(RichText::new("Get").strong());
                    ui.label(RichText::new("Set").strong());
                    ui.end_row();
                    let keys = configurable
                        .getable_keys()
                        .union(configurable.setable_keys())
                        .copied()
                        .collect::<Vec<_>>();
                    for key in keys {
                        ui.label(format!("{:?}", key));
                        ui.label(if configurable.is_getable(key) { "✔" } else { "" });
                        ui.label(if configurable.is_setable(key) { "✔" } else { "" });
                        ui.end_row();
                    }
                });
        }
    }
}

fn render_data(ui: &mut Ui, view: &View, signals: &[Arc<Signal>]) {
    egui::Grid::new(view.id.as_str())
        .num_columns(3)
        .striped(true)
        .show(ui, |ui| {
            ui.label(RichText::new("Signal").strong());
            ui.label(RichText::new("Value").strong());
            ui.label(RichText::new("Samples").strong());
            ui.end_row();
            for signal in signals {
                ui.label(signal.display_name());
                ui.monospace(signal.format_last().unwrap_or_else(|| "-".to_string()));
                ui.label(signal.len().to_string());
                ui.end_row();
            }
        });
}

fn render_power_panel(ui: &mut Ui, voltage: &Signal, current: &Signal) {
    let v = voltage.last_sample().map(|s| s.value);
    let i = current.last_sample().map(|s| s.value);

    ui.horizontal_wrapped(|ui| {
        ui.add(ValueDisplay::for_signal(Some(voltage)).with_color(Color32::from_rgb(255, 165, 0)));
        ui.add(ValueDisplay::for_signal(Some(current)).with_color(Color32::from_rgb(220, 20, 60)));
        if let (Some(v), Some(i)) = (v, i) {
            ui.add(ValueDisplay::new("Power", format!("{:.3} W", v * i)));
            let resistance = if i != 0.0 {
                format!("{:.3} Ω", v / i)
            } else {
                "∞ Ω".to_string()
            };
            ui.add(ValueDisplay::new("Resistance", resistance));
        }
    });
}

fn render_demo_control(ui: &mut Ui, driver: &mut DemoDriver, channel: &str) {
    let Some(params) = driver.params_mut(channel) else {
        ui.label(format!("No generator for {}", channel));
        return;
    };

    egui::Grid::new(("demo_control", channel))
        .num_columns(2)
        .show(ui, |ui| {
            ui.label("Waveform");
            egui::ComboBox::from_id_salt(("waveform", channel))
                .selected_text(params.waveform.name())
                .show_ui(ui, |ui| {
                    for w in Waveform::ALL {
                        ui.selectable_value(&mut params.waveform, w, w.name());
                    }
                });
            ui.end_row();

            ui.label("Quantity");
            egui::ComboBox::from_id_salt(("quantity", channel))
                .selected_text(params.quantity.to_string())
                .show_ui(ui, |ui| {
                    for q in [
                        Quantity::Voltage,
                        Quantity::Current,
                        Quantity::Resistance,
                        Quantity::Power,
                        Quantity::Frequency,
                    ] {
                        ui.selectable_value(&mut params.quantity, q, q.to_string());
                    }
                });
            ui.end_row();

            ui.label("Amplitude");
            ui.add(egui::Slider::new(&mut params.amplitude, 0.0..=50.0));
            ui.end_row();

            ui.label("Offset");
            ui.add(egui::Slider::new(&mut params.offset, -50.0..=50.0));
            ui.end_row();

            ui.label("Frequency");
            ui.add(egui::Slider::new(&mut params.frequency, 0.01..=10.0).logarithmic(true).suffix(" Hz"));
            ui.end_row();
        });
}

fn render_overview(ui: &mut Ui, device: &Device) {
    ui.heading(device.name());
    ui.label(RichText::new(format!("{} · {}", device.device_type(), device.id())).color(Color32::GRAY));
    ui.separator();

    egui::Grid::new(("overview", device.id()))
        .num_columns(3)
        .striped(true)
        .show(ui, |ui| {
            ui.label(RichText::new("Channel").strong());
            ui.label(RichText::new("Active signal").strong());
            ui.label(RichText::new("Value").strong());
            ui.end_row();
            for channel in device.channels() {
                ui.label(channel.name());
                match channel.active_signal() {
                    Some(signal) => {
                        ui.label(signal.key().to_string());
                        ui.monospace(signal.format_last().unwrap_or_else(|| "-".to_string()));
                    }
                    None => {
                        ui.label("-");
                        ui.label("-");
                    }
                }
                ui.end_row();
            }
        });
}
