//! Device tabs and the views they host
//!
//! Owned by the GUI thread. Every mutation here is requested by the script
//! through the bridge or made directly by the user.

use super::{TimeCurve, View, ViewContent, ViewId, ViewKind, XyCurve};
use crate::config::SettingsStore;
use crate::registry::{Device, Registry, Signal};
use std::sync::Arc;
use thiserror::Error;

/// Failures while creating or extending views
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    #[error("No tab for device {0}")]
    NoDeviceTab(String),

    #[error("No view {view} in tab {device}")]
    NoView { device: String, view: String },

    #[error("View {view} is a {actual} view, expected {expected}")]
    WrongKind {
        view: String,
        actual: &'static str,
        expected: &'static str,
    },

    #[error("Cannot add new y signal without an existing x signal!")]
    NoXSignal,
}

/// A tab showing one device and its views
#[derive(Debug, Clone)]
pub struct DeviceTab {
    pub device: Arc<Device>,
    pub views: Vec<View>,
}

impl DeviceTab {
    pub fn new(device: Arc<Device>) -> Self {
        Self {
            device,
            views: Vec::new(),
        }
    }

    pub fn view(&self, id: &ViewId) -> Option<&View> {
        self.views.iter().find(|v| &v.id == id)
    }

    fn view_mut(&mut self, id: &ViewId) -> Result<&mut View, ViewError> {
        let device = self.device.id().to_string();
        self.views
            .iter_mut()
            .find(|v| &v.id == id)
            .ok_or_else(|| ViewError::NoView {
                device,
                view: id.to_string(),
            })
    }
}

/// All open device tabs, in the order they were opened
#[derive(Debug, Default)]
pub struct Workspace {
    tabs: Vec<DeviceTab>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tabs(&self) -> &[DeviceTab] {
        &self.tabs
    }

    pub fn tab(&self, device_id: &str) -> Option<&DeviceTab> {
        self.tabs.iter().find(|t| t.device.id() == device_id)
    }

    fn tab_mut(&mut self, device_id: &str) -> Result<&mut DeviceTab, ViewError> {
        self.tabs
            .iter_mut()
            .find(|t| t.device.id() == device_id)
            .ok_or_else(|| ViewError::NoDeviceTab(device_id.to_string()))
    }

    /// Open a tab for the device; returns false if one is already open
    pub fn add_device_tab(&mut self, device: Arc<Device>) -> bool {
        if self.tab(device.id()).is_some() {
            return false;
        }
        tracing::info!("Opening tab for {}", device.id());
        self.tabs.push(DeviceTab::new(device));
        true
    }

    pub fn remove_device_tab(&mut self, device_id: &str) -> bool {
        let before = self.tabs.len();
        self.tabs.retain(|t| t.device.id() != device_id);
        before != self.tabs.len()
    }

    pub fn view(&self, device_id: &str, view_id: &ViewId) -> Option<&View> {
        self.tab(device_id)?.view(view_id)
    }

    /// Place a view in a device's tab
    pub fn add_view(&mut self, device_id: &str, view: View) -> Result<ViewId, ViewError> {
        let tab = self.tab_mut(device_id)?;
        let id = view.id.clone();
        tracing::debug!("Adding view {} to {}", id, device_id);
        tab.views.push(view);
        Ok(id)
    }

    pub fn close_view(&mut self, device_id: &str, view_id: &ViewId) -> bool {
        match self.tab_mut(device_id) {
            Ok(tab) => {
                let before = tab.views.len();
                tab.views.retain(|v| &v.id != view_id);
                before != tab.views.len()
            }
            Err(_) => false,
        }
    }

    pub fn add_signal_to_data_view(
        &mut self,
        device_id: &str,
        view_id: &ViewId,
        signal: Arc<Signal>,
    ) -> Result<(), ViewError> {
        let view = self.tab_mut(device_id)?.view_mut(view_id)?;
        match &mut view.content {
            ViewContent::Data { signals } => {
                if !signals.iter().any(|s| Arc::ptr_eq(s, &signal)) {
                    signals.push(signal);
                }
                Ok(())
            }
            _ => Err(wrong_kind(view_id, view.kind, ViewKind::Data)),
        }
    }

    /// Add a signal to a time or XY plot
    ///
    /// On an XY plot the signal becomes a new y curve against the x signal
    /// of the plot's first curve.
    pub fn add_signal_to_plot_view(
        &mut self,
        device_id: &str,
        view_id: &ViewId,
        signal: Arc<Signal>,
    ) -> Result<(), ViewError> {
        let view = self.tab_mut(device_id)?.view_mut(view_id)?;
        match &mut view.content {
            ViewContent::TimePlot { curves } => {
                curves.push(TimeCurve::Signal(signal));
                Ok(())
            }
            ViewContent::XyPlot { curves } => {
                let x = curves.first().ok_or(ViewError::NoXSignal)?.x.clone();
                curves.push(XyCurve { x, y: signal });
                Ok(())
            }
            _ => Err(wrong_kind(view_id, view.kind, ViewKind::SignalPlot)),
        }
    }

    pub fn add_signals_to_xy_plot_view(
        &mut self,
        device_id: &str,
        view_id: &ViewId,
        x: Arc<Signal>,
        y: Arc<Signal>,
    ) -> Result<(), ViewError> {
        let view = self.tab_mut(device_id)?.view_mut(view_id)?;
        match &mut view.content {
            ViewContent::XyPlot { curves } => {
                curves.push(XyCurve { x, y });
                Ok(())
            }
            _ => Err(wrong_kind(view_id, view.kind, ViewKind::XyPlot)),
        }
    }

    /// Write all tabs and views into the current settings group
    ///
    /// Tab groups left from an earlier save are removed first.
    pub fn save(&self, settings: &mut SettingsStore) {
        for group in settings.child_groups() {
            if group.starts_with("tab") {
                settings.remove_group(&group);
            }
        }
        for (t, tab) in self.tabs.iter().enumerate() {
            settings.begin_group(&format!("tab{}", t));
            settings.set_value("device", tab.device.id());
            for (v, view) in tab.views.iter().enumerate() {
                settings.begin_group(&format!("view{}", v));
                view.save(settings);
                settings.end_group();
            }
            settings.end_group();
        }
    }

    /// Reopen saved tabs whose device is connected and rebuild their views
    ///
    /// Returns the number of views restored. Tabs for missing devices and
    /// views whose handles no longer resolve are skipped.
    pub fn restore(&mut self, registry: &Registry, settings: &mut SettingsStore) -> usize {
        let mut restored = 0;
        let mut tab_groups: Vec<String> = settings
            .child_groups()
            .into_iter()
            .filter(|g| g.starts_with("tab"))
            .collect();
        tab_groups.sort_by_key(|g| g[3..].parse::<usize>().unwrap_or(usize::MAX));

        for tab_group in tab_groups {
            settings.begin_group(&tab_group);
            let device = settings.string("device").and_then(|id| registry.device(&id));
            match device {
                Some(device) => {
                    let device_id = device.id().to_string();
                    self.add_device_tab(device);
                    let mut view_groups: Vec<String> = settings
                        .child_groups()
                        .into_iter()
                        .filter(|g| g.starts_with("view"))
                        .collect();
                    view_groups.sort_by_key(|g| g[4..].parse::<usize>().unwrap_or(usize::MAX));

                    for view_group in view_groups {
                        settings.begin_group(&view_group);
                        match View::restore(registry, settings) {
                            Some(view) => {
                                if self.add_view(&device_id, view).is_ok() {
                                    restored += 1;
                                }
                            }
                            None => tracing::warn!("Could not restore view {}", settings.group()),
                        }
                        settings.end_group();
                    }
                }
                None => tracing::warn!("Skipping tab {}: device not connected", tab_group),
            }
            settings.end_group();
        }
        restored
    }
}

fn wrong_kind(view_id: &ViewId, actual: ViewKind, expected: ViewKind) -> ViewError {
    ViewError::WrongKind {
        view: view_id.to_string(),
        actual: actual.tag(),
        expected: expected.tag(),
    }
}
