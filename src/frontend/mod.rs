//! Frontend module for egui UI
//!
//! [`BenchVisApp`] implements [`eframe::App`]. Every frame it:
//!
//! 1. folds registry events into the workspace
//! 2. ticks the demo device
//! 3. executes queued bridge requests ([`GuiExecutor::process_pending`])
//! 4. collects script runner events
//! 5. renders the dock area (device tabs and the script tab), the front
//!    script dialog and warning notices
//!
//! # Submodules
//!
//! - `tab_viewer` - egui_dock tab viewer
//! - `device_tab` - device tab layout and view rendering
//! - `dialogs` - script dialogs and notices
//! - [`script_editor`] - Rhai editor tab
//! - `widgets` - small reusable widgets

mod device_tab;
mod dialogs;
pub mod script_editor;
mod tab_viewer;
pub mod widgets;

pub use device_tab::ViewAction;
pub use script_editor::{ScriptAction, ScriptTab};
pub use tab_viewer::AppTab;

use crate::bridge::UiBridge;
use crate::config::{self, AppConfig, SettingsStore};
use crate::demo::{now_seconds, DemoDriver};
use crate::executor::GuiExecutor;
use crate::registry::{Registry, RegistryEvent};
use crate::scripting::ScriptRunner;
use egui::{Color32, RichText};
use egui_dock::DockState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tab_viewer::AppTabViewer;

/// Main application state
pub struct BenchVisApp {
    config: AppConfig,
    registry: Registry,
    executor: GuiExecutor,
    runner: Option<ScriptRunner>,
    demo: Option<DemoDriver>,
    dock_state: DockState<AppTab>,
    script: ScriptTab,
}

impl BenchVisApp {
    /// Create the application; `startup_script` is loaded and run at once
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        startup_script: Option<PathBuf>,
    ) -> Self {
        let mut style = (*cc.egui_ctx.style()).clone();
        style.text_styles.iter_mut().for_each(|(_, font_id)| {
            font_id.size *= config.ui.font_scale;
        });
        cc.egui_ctx.set_style(style);

        let registry = Registry::new();

        let demo = if config.demo.enabled {
            match DemoDriver::connect(&registry, &config.demo, now_seconds()) {
                Ok(driver) => Some(driver),
                Err(e) => {
                    tracing::error!("Failed to start demo device: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let (bridge, endpoint) = UiBridge::new();
        let mut bridge = bridge.with_timeout(config.bridge.default_timeout());
        let repaint_ctx = cc.egui_ctx.clone();
        bridge.set_waker(Arc::new(move || repaint_ctx.request_repaint()));

        let mut executor = GuiExecutor::new(registry.clone(), endpoint);

        if config.ui.restore_session {
            restore_session(&registry, &mut executor);
        }

        let runner = match ScriptRunner::spawn(registry.clone(), bridge, config.script.clone()) {
            Ok(runner) => Some(runner),
            Err(e) => {
                tracing::error!("Failed to start script runner: {}", e);
                None
            }
        };

        let mut app = Self {
            config,
            registry,
            executor,
            runner,
            demo,
            dock_state: DockState::new(vec![AppTab::Script]),
            script: ScriptTab::new(),
        };

        if let Some(path) = startup_script {
            if app.open_script(path) {
                app.run_script();
            }
        }

        app
    }

    fn open_script(&mut self, path: PathBuf) -> bool {
        match script_editor::load_script(&path) {
            Ok(source) => {
                tracing::info!("Loaded script {}", path.display());
                self.script.source = source;
                self.script.path = Some(path);
                true
            }
            Err(e) => {
                self.executor.warn("Open script", e.to_string());
                false
            }
        }
    }

    fn save_script(&mut self) {
        let path = match &self.script.path {
            Some(path) => path.clone(),
            None => {
                let mut dialog = rfd::FileDialog::new()
                    .set_title("Save Script")
                    .add_filter("Rhai script", &["rhai"]);
                if let Some(dir) = &self.config.script.default_dir {
                    dialog = dialog.set_directory(dir);
                }
                match dialog.save_file() {
                    Some(path) => path,
                    None => return,
                }
            }
        };
        match std::fs::write(&path, &self.script.source) {
            Ok(()) => {
                tracing::info!("Saved script {}", path.display());
                self.script.path = Some(path);
            }
            Err(e) => self
                .executor
                .warn("Save script", format!("{}: {}", path.display(), e)),
        }
    }

    fn run_script(&mut self) {
        let Some(runner) = &self.runner else {
            self.executor.warn("Run script", "The script runner is not available");
            return;
        };
        if !runner.run_script(self.script.name(), self.script.source.clone()) {
            self.executor.warn("Run script", "A script is already running");
        }
    }

    fn handle_script_action(&mut self, action: ScriptAction) {
        match action {
            ScriptAction::Run => self.run_script(),
            ScriptAction::Check => {
                if let Some(runner) = &self.runner {
                    let result = runner.check(&self.script.source);
                    self.script.apply_check(result);
                }
            }
            ScriptAction::Stop => {
                if let Some(runner) = &self.runner {
                    runner.stop();
                }
            }
            ScriptAction::Open => {
                let mut dialog = rfd::FileDialog::new()
                    .set_title("Open Script")
                    .add_filter("Rhai script", &["rhai"]);
                if let Some(dir) = &self.config.script.default_dir {
                    dialog = dialog.set_directory(dir);
                }
                if let Some(path) = dialog.pick_file() {
                    self.open_script(path);
                }
            }
            ScriptAction::Save => self.save_script(),
        }
    }

    fn sync_dock_tabs(&mut self, events: &[RegistryEvent]) {
        for event in events {
            if let RegistryEvent::DeviceRemoved(id) = event {
                if let Some(location) = self.dock_state.find_tab(&AppTab::Device(id.clone())) {
                    self.dock_state.remove_tab(location);
                }
            }
        }

        let device_ids: Vec<String> = self
            .executor
            .workspace()
            .tabs()
            .iter()
            .map(|t| t.device.id().to_string())
            .collect();
        for id in device_ids {
            let tab = AppTab::Device(id);
            if self.dock_state.find_tab(&tab).is_none() {
                self.dock_state.push_to_first_leaf(tab);
            }
        }
    }

    fn open_device_tab(&mut self, id: &str) {
        if let Some(device) = self.registry.device(id) {
            self.executor.workspace_mut().add_device_tab(device);
        }
        if let Some(location) = self.dock_state.find_tab(&AppTab::Device(id.to_string())) {
            self.dock_state.set_active_tab(location);
        }
    }

    fn render_menu(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Script...").clicked() {
                        self.handle_script_action(ScriptAction::Open);
                        ui.close();
                    }
                    if ui.button("Save Script").clicked() {
                        self.handle_script_action(ScriptAction::Save);
                        ui.close();
                    }
                    ui.separator();
                    if ui.button("Save Session").clicked() {
                        self.save_session();
                        ui.close();
                    }
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("Devices", |ui| {
                    let devices = self.registry.devices();
                    if devices.is_empty() {
                        ui.label("No devices connected");
                    }
                    for device in devices {
                        let label = format!("{} ({})", device.name(), device.id());
                        if ui.button(label).clicked() {
                            self.open_device_tab(device.id());
                            ui.close();
                        }
                    }
                });

                ui.menu_button("View", |ui| {
                    if ui.button("Script").clicked() {
                        match self.dock_state.find_tab(&AppTab::Script) {
                            Some(location) => self.dock_state.set_active_tab(location),
                            None => self.dock_state.push_to_first_leaf(AppTab::Script),
                        }
                        ui.close();
                    }
                    let mut dark = ctx.style().visuals.dark_mode;
                    if ui.checkbox(&mut dark, "Dark mode").changed() {
                        ctx.set_visuals(if dark {
                            egui::Visuals::dark()
                        } else {
                            egui::Visuals::light()
                        });
                        self.config.ui.dark_mode = dark;
                    }
                });
            });
        });
    }

    fn render_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.spacing_mut().item_spacing.x = 8.0;
                ui.label(RichText::new(format!("Devices: {}", self.registry.device_count())).small());
                ui.separator();
                if self.script.running {
                    ui.add(widgets::StatusIndicator::running());
                } else {
                    ui.add(widgets::StatusIndicator::idle());
                }
                let dialogs = self.executor.pending_dialogs();
                if dialogs > 0 {
                    ui.separator();
                    ui.label(RichText::new(format!("Dialogs waiting: {}", dialogs)).small());
                }
                if let Some(timeout) = self.config.bridge.default_timeout() {
                    ui.separator();
                    ui.label(
                        RichText::new(format!("UI call timeout: {} ms", timeout.as_millis()))
                            .small()
                            .color(Color32::GRAY),
                    );
                }
            });
        });
    }

    fn save_session(&mut self) {
        let Some(path) = config::session_path() else {
            tracing::warn!("No data directory, session not saved");
            return;
        };
        let mut settings = SettingsStore::new();
        self.executor.workspace().save(&mut settings);
        match settings.save(&path) {
            Ok(()) => tracing::info!("Session saved to {}", path.display()),
            Err(e) => tracing::warn!("Failed to save session: {}", e),
        }
    }
}

fn restore_session(registry: &Registry, executor: &mut GuiExecutor) {
    let Some(path) = config::session_path().filter(|p| p.exists()) else {
        return;
    };
    match SettingsStore::load(&path) {
        Ok(mut settings) => {
            let restored = executor.workspace_mut().restore(registry, &mut settings);
            tracing::info!("Restored {} views from {}", restored, path.display());
        }
        Err(e) => tracing::warn!("Failed to load session {}: {}", path.display(), e),
    }
}

impl eframe::App for BenchVisApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let events = self.executor.sync_registry();
        if let Some(demo) = &mut self.demo {
            demo.tick(now_seconds());
        }
        self.executor.process_pending();
        if let Some(runner) = &self.runner {
            for event in runner.drain_events() {
                self.script.apply_event(event);
            }
        }
        self.sync_dock_tabs(&events);

        self.render_menu(ctx);
        self.render_status_bar(ctx);

        let mut viewer = AppTabViewer {
            workspace: self.executor.workspace(),
            demo: self.demo.as_mut(),
            script: &mut self.script,
            view_actions: Vec::new(),
            script_action: None,
            closed_devices: Vec::new(),
        };
        egui_dock::DockArea::new(&mut self.dock_state)
            .style(egui_dock::Style::from_egui(ctx.style().as_ref()))
            .show(ctx, &mut viewer);

        let AppTabViewer {
            view_actions,
            script_action,
            closed_devices,
            ..
        } = viewer;

        for action in view_actions {
            match action {
                ViewAction::Close { device_id, view_id } => {
                    self.executor.workspace_mut().close_view(&device_id, &view_id);
                }
            }
        }
        for id in closed_devices {
            self.executor.workspace_mut().remove_device_tab(&id);
        }
        if let Some(action) = script_action {
            self.handle_script_action(action);
        }

        dialogs::render_bridge_dialog(ctx, &mut self.executor);
        dialogs::render_notices(ctx, &mut self.executor);

        if self.demo.is_some() || self.script.running {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if self.config.ui.restore_session {
            self.save_session();
        }
        if let Err(e) = self.config.save() {
            tracing::warn!("Failed to save config: {}", e);
        }
        if let Some(runner) = self.runner.take() {
            runner.stop();
        }
    }
}
