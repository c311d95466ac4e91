//! TabViewer implementation for the dock area
//!
//! One tab per open device plus the script tab. Device tabs are rendered by
//! [`device_tab::render`]; user actions are collected and applied by the app
//! after the dock area has been drawn.

use egui::{Ui, WidgetText};
use egui_dock::widgets::tab_viewer::OnCloseResponse;

use crate::demo::DemoDriver;
use crate::frontend::device_tab::{self, ViewAction};
use crate::frontend::script_editor::{ScriptAction, ScriptTab};
use crate::views::Workspace;

/// A tab in the dock area
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AppTab {
    Script,
    /// Device id
    Device(String),
}

pub struct AppTabViewer<'a> {
    pub workspace: &'a Workspace,
    pub demo: Option<&'a mut DemoDriver>,
    pub script: &'a mut ScriptTab,
    pub view_actions: Vec<ViewAction>,
    pub script_action: Option<ScriptAction>,
    /// Device tabs the user closed this frame
    pub closed_devices: Vec<String>,
}

impl egui_dock::TabViewer for AppTabViewer<'_> {
    type Tab = AppTab;

    fn title(&mut self, tab: &mut AppTab) -> WidgetText {
        match tab {
            AppTab::Script => WidgetText::from(format!("Script · {}", self.script.name())),
            AppTab::Device(id) => self
                .workspace
                .tab(id)
                .map(|t| WidgetText::from(t.device.name()))
                .unwrap_or_else(|| WidgetText::from(id.as_str())),
        }
    }

    fn ui(&mut self, ui: &mut Ui, tab: &mut AppTab) {
        match tab {
            AppTab::Script => {
                if let Some(action) = self.script.show(ui) {
                    self.script_action = Some(action);
                }
            }
            AppTab::Device(id) => match self.workspace.tab(id) {
                Some(device_tab) => device_tab::render(
                    ui,
                    device_tab,
                    self.demo.as_deref_mut(),
                    &mut self.view_actions,
                ),
                None => {
                    ui.label(format!("Device {} is not connected", id));
                }
            },
        }
    }

    fn closeable(&mut self, tab: &mut AppTab) -> bool {
        matches!(tab, AppTab::Device(_))
    }

    fn on_close(&mut self, tab: &mut AppTab) -> OnCloseResponse {
        match tab {
            AppTab::Device(id) => {
                self.closed_devices.push(id.clone());
                OnCloseResponse::Close
            }
            AppTab::Script => OnCloseResponse::Ignore,
        }
    }
}
