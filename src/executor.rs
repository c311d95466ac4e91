//! GUI-thread side of the bridge
//!
//! [`GuiExecutor`] owns the workspace and the GUI end of the bridge. The
//! frontend calls [`GuiExecutor::process_pending`] once per frame; requests
//! are handled strictly in arrival order. View requests are answered right
//! away. Dialog requests are queued and answered when the user responds.
//!
//! A view that cannot be built produces a user-visible notice and answers
//! the script with an invalid view id; the script keeps running.

use crate::bridge::{BridgeEndpoint, PlotSource, Responder, UiRequest};
use crate::registry::{Registry, RegistryEvent};
use crate::views::{control_view_for_configurable, View, ViewId, Workspace};
use std::collections::VecDeque;

/// A dialog waiting for the user, with its editable value
#[derive(Debug)]
pub enum PendingDialog {
    Message {
        title: String,
        text: String,
        responder: Responder<()>,
    },
    StringInput {
        title: String,
        label: String,
        value: String,
        responder: Responder<String>,
    },
    DoubleInput {
        title: String,
        label: String,
        value: f64,
        decimals: u32,
        step: f64,
        min: f64,
        max: f64,
        responder: Responder<f64>,
    },
    IntInput {
        title: String,
        label: String,
        value: i64,
        step: i64,
        min: i64,
        max: i64,
        responder: Responder<i64>,
    },
}

impl PendingDialog {
    pub fn title(&self) -> &str {
        match self {
            PendingDialog::Message { title, .. }
            | PendingDialog::StringInput { title, .. }
            | PendingDialog::DoubleInput { title, .. }
            | PendingDialog::IntInput { title, .. } => title,
        }
    }

    /// False once the requesting call has timed out
    fn is_live(&self) -> bool {
        match self {
            PendingDialog::Message { responder, .. } => responder.is_armed(),
            PendingDialog::StringInput { responder, .. } => responder.is_armed(),
            PendingDialog::DoubleInput { responder, .. } => responder.is_armed(),
            PendingDialog::IntInput { responder, .. } => responder.is_armed(),
        }
    }

    fn accept(self) {
        match self {
            PendingDialog::Message { responder, .. } => {
                responder.complete(());
            }
            PendingDialog::StringInput { value, responder, .. } => {
                responder.complete(value);
            }
            PendingDialog::DoubleInput {
                value,
                min,
                max,
                responder,
                ..
            } => {
                responder.complete(value.clamp(min, max));
            }
            PendingDialog::IntInput {
                value,
                min,
                max,
                responder,
                ..
            } => {
                responder.complete(value.clamp(min, max));
            }
        }
    }

    fn cancel(self) {
        match self {
            PendingDialog::Message { responder, .. } => {
                responder.cancel();
            }
            PendingDialog::StringInput { responder, .. } => {
                responder.cancel();
            }
            PendingDialog::DoubleInput { responder, .. } => {
                responder.cancel();
            }
            PendingDialog::IntInput { responder, .. } => {
                responder.cancel();
            }
        }
    }
}

/// Ordered dialog bounds; a NaN bound leaves that side open
fn float_bounds(min: f64, max: f64) -> (f64, f64) {
    let min = if min.is_nan() { f64::NEG_INFINITY } else { min };
    let max = if max.is_nan() { f64::INFINITY } else { max };
    if min <= max {
        (min, max)
    } else {
        (max, min)
    }
}

/// A warning shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub title: String,
    pub text: String,
}

/// Executes bridge requests on the GUI thread
pub struct GuiExecutor {
    registry: Registry,
    workspace: Workspace,
    endpoint: BridgeEndpoint,
    dialogs: VecDeque<PendingDialog>,
    notices: Vec<Notice>,
}

impl GuiExecutor {
    pub fn new(registry: Registry, endpoint: BridgeEndpoint) -> Self {
        Self {
            registry,
            workspace: Workspace::new(),
            endpoint,
            dialogs: VecDeque::new(),
            notices: Vec::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspace
    }

    /// Handle every queued request; returns how many were handled
    pub fn process_pending(&mut self) -> usize {
        let requests = self.endpoint.drain();
        let count = requests.len();
        for request in requests {
            self.handle(request);
        }
        self.dialogs.retain(PendingDialog::is_live);
        count
    }

    /// Apply registry changes to the workspace
    ///
    /// Returns the events so the frontend can react to them as well.
    pub fn sync_registry(&mut self) -> Vec<RegistryEvent> {
        let events = self.registry.drain_events();
        for event in &events {
            match event {
                RegistryEvent::DeviceRemoved(id) => {
                    if self.workspace.remove_device_tab(id) {
                        tracing::info!("Closed tab of disconnected device {}", id);
                    }
                }
                RegistryEvent::ActiveSignalChanged {
                    device_id,
                    channel,
                    signal,
                } => {
                    tracing::trace!(
                        "{}/{} now shows {}",
                        device_id,
                        channel,
                        signal.display_name()
                    );
                }
                RegistryEvent::DeviceAdded(_) => {}
            }
        }
        events
    }

    fn handle(&mut self, request: UiRequest) {
        tracing::debug!("Handling UI request {}", request.name());
        match request {
            UiRequest::AddDeviceTab { device } => {
                self.workspace.add_device_tab(device);
            }
            UiRequest::AddSignalToDataView {
                device_id,
                view_id,
                signal,
            } => {
                if let Err(e) = self
                    .workspace
                    .add_signal_to_data_view(&device_id, &view_id, signal)
                {
                    self.warn("Add signal to data view", e.to_string());
                }
            }
            UiRequest::AddSignalToPlotView {
                device_id,
                view_id,
                signal,
            } => {
                if let Err(e) = self
                    .workspace
                    .add_signal_to_plot_view(&device_id, &view_id, signal)
                {
                    self.warn("Add signal to plot view", e.to_string());
                }
            }
            UiRequest::AddSignalsToXyPlotView {
                device_id,
                view_id,
                x_signal,
                y_signal,
            } => {
                if let Err(e) = self.workspace.add_signals_to_xy_plot_view(
                    &device_id, &view_id, x_signal, y_signal,
                ) {
                    self.warn("Add signals to XY plot view", e.to_string());
                }
            }
            UiRequest::AddDataView {
                device_id,
                area,
                signal,
                responder,
            } => {
                let view = View::data(area, signal);
                self.place_view(&device_id, Some(view), responder);
            }
            UiRequest::AddControlView {
                device_id,
                area,
                configurable,
                responder,
            } => {
                let view = control_view_for_configurable(&configurable, area);
                if view.is_none() {
                    self.warn(
                        "Add control view",
                        format!("No control view for configurable {}", configurable.name()),
                    );
                }
                self.place_view(&device_id, view, responder);
            }
            UiRequest::AddPlotView {
                device_id,
                area,
                source,
                responder,
            } => {
                let view = match source {
                    PlotSource::Channel(channel) => View::channel_plot(area, channel),
                    PlotSource::Signal(signal) => View::signal_plot(area, signal),
                    PlotSource::Xy { x, y } => View::xy_plot(area, x, y),
                };
                self.place_view(&device_id, Some(view), responder);
            }
            UiRequest::AddPowerPanelView {
                device_id,
                area,
                voltage,
                current,
                responder,
            } => {
                let view = View::power_panel(area, voltage, current);
                self.place_view(&device_id, Some(view), responder);
            }
            UiRequest::AddValuePanelView {
                device_id,
                area,
                source,
                responder,
            } => {
                let view = View::value_panel(area, source);
                self.place_view(&device_id, Some(view), responder);
            }
            UiRequest::ShowMessageBox {
                title,
                text,
                responder,
            } => self.dialogs.push_back(PendingDialog::Message {
                title,
                text,
                responder,
            }),
            UiRequest::ShowStringInput {
                title,
                label,
                value,
                responder,
            } => self.dialogs.push_back(PendingDialog::StringInput {
                title,
                label,
                value,
                responder,
            }),
            UiRequest::ShowDoubleInput {
                title,
                label,
                value,
                decimals,
                step,
                min,
                max,
                responder,
            } => {
                let (min, max) = float_bounds(min, max);
                self.dialogs.push_back(PendingDialog::DoubleInput {
                    title,
                    label,
                    value,
                    decimals,
                    step,
                    min,
                    max,
                    responder,
                })
            }
            UiRequest::ShowIntInput {
                title,
                label,
                value,
                step,
                min,
                max,
                responder,
            } => {
                let (min, max) = if min <= max { (min, max) } else { (max, min) };
                self.dialogs.push_back(PendingDialog::IntInput {
                    title,
                    label,
                    value,
                    step,
                    min,
                    max,
                    responder,
                })
            }
        }
    }

    /// Add a built view to its tab and answer the request
    ///
    /// Always completes the call; failures answer with an invalid id.
    fn place_view(&mut self, device_id: &str, view: Option<View>, responder: Responder<ViewId>) {
        let id = match view {
            Some(view) => match self.workspace.add_view(device_id, view) {
                Ok(id) => id,
                Err(e) => {
                    self.warn("Add view", e.to_string());
                    ViewId::invalid()
                }
            },
            None => ViewId::invalid(),
        };
        if !responder.complete(id.clone()) {
            tracing::debug!("View {} created after its call resolved", id);
        }
    }

    /// Record a user-visible warning
    pub fn warn(&mut self, title: &str, text: impl Into<String>) {
        let text = text.into();
        tracing::warn!("{}: {}", title, text);
        self.notices.push(Notice {
            title: title.to_string(),
            text,
        });
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn dismiss_notice(&mut self, index: usize) {
        if index < self.notices.len() {
            self.notices.remove(index);
        }
    }

    /// Dialog to show now, if any
    pub fn current_dialog(&self) -> Option<&PendingDialog> {
        self.dialogs.front()
    }

    /// Mutable access so the frontend can edit the input value
    pub fn current_dialog_mut(&mut self) -> Option<&mut PendingDialog> {
        self.dialogs.front_mut()
    }

    pub fn pending_dialogs(&self) -> usize {
        self.dialogs.len()
    }

    /// Answer the current dialog with its current value
    pub fn accept_dialog(&mut self) {
        if let Some(dialog) = self.dialogs.pop_front() {
            dialog.accept();
        }
    }

    pub fn cancel_dialog(&mut self) {
        if let Some(dialog) = self.dialogs.pop_front() {
            dialog.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{call, CallOutcome, UiBridge};
    use crate::registry::ChannelKind;
    use crate::types::{ConfigKey, ConfigKeySet, DeviceType, DockArea, Quantity, QuantityFlags, Unit};
    use crate::views::{ValueSource, ViewContent, ViewKind};
    use std::sync::Arc;

    fn setup() -> (UiBridge, GuiExecutor) {
        let (bridge, endpoint) = UiBridge::new();
        (bridge, GuiExecutor::new(Registry::new(), endpoint))
    }

    #[test]
    fn test_view_request_round_trip() {
        let (bridge, mut exec) = setup();
        let dev = exec.registry().create_device(DeviceType::Demo, "Demo", 0.0);
        let sig = dev
            .add_channel("A1", &[], ChannelKind::Fixed)
            .unwrap()
            .add_signal(Quantity::Voltage, QuantityFlags::NONE, Unit::Volt)
            .unwrap();

        let device = dev.clone();
        let script = std::thread::spawn(move || {
            bridge.add_device_tab(device.clone()).unwrap();
            bridge
                .create_data_view(device.id(), DockArea::Left, sig)
                .unwrap()
        });

        let mut handled = 0;
        while !script.is_finished() {
            handled += exec.process_pending();
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        let id = script.join().unwrap();

        assert_eq!(handled, 2);
        assert_eq!(id.kind(), Some(ViewKind::Data));
        assert!(exec.workspace().view(dev.id(), &id).is_some());
    }

    #[test]
    fn test_failed_view_completes_with_invalid_id() {
        let (_bridge, mut exec) = setup();
        let dev = exec.registry().create_device(DeviceType::Demo, "Demo", 0.0);
        let sig = dev
            .add_channel("A1", &[], ChannelKind::Fixed)
            .unwrap()
            .add_signal(Quantity::Voltage, QuantityFlags::NONE, Unit::Volt)
            .unwrap();

        // No tab was opened for the device
        let (responder, pending) = call();
        exec.handle(UiRequest::AddDataView {
            device_id: dev.id().to_string(),
            area: DockArea::Left,
            signal: sig,
            responder,
        });

        assert_eq!(
            pending.wait(None).unwrap(),
            CallOutcome::Completed(ViewId::invalid())
        );
        assert_eq!(exec.notices().len(), 1);
    }

    #[test]
    fn test_control_view_dispatch() {
        let (_bridge, mut exec) = setup();
        let dev = exec
            .registry()
            .create_device(DeviceType::PowerSupply, "PSU", 0.0);
        let conf = dev
            .add_configurable(
                "output1",
                ConfigKeySet::new(),
                [ConfigKey::Enabled, ConfigKey::VoltageTarget].into_iter().collect(),
            )
            .unwrap();
        exec.workspace_mut().add_device_tab(dev.clone());

        let (responder, pending) = call();
        exec.handle(UiRequest::AddControlView {
            device_id: dev.id().to_string(),
            area: DockArea::Right,
            configurable: conf,
            responder,
        });
        let id = pending.wait(None).unwrap().completed().unwrap();
        assert_eq!(id.kind(), Some(ViewKind::SourceSinkControl));
        assert!(exec.workspace().view(dev.id(), &id).is_some());
    }

    #[test]
    fn test_xy_warning_on_missing_x_signal() {
        let (_bridge, mut exec) = setup();
        let dev = exec.registry().create_device(DeviceType::Demo, "Demo", 0.0);
        let sig = dev
            .add_channel("A1", &[], ChannelKind::Fixed)
            .unwrap()
            .add_signal(Quantity::Voltage, QuantityFlags::NONE, Unit::Volt)
            .unwrap();
        exec.workspace_mut().add_device_tab(dev.clone());
        let mut view = View::xy_plot(DockArea::Left, sig.clone(), sig.clone());
        if let ViewContent::XyPlot { curves } = &mut view.content {
            curves.clear();
        }
        let view_id = exec.workspace_mut().add_view(dev.id(), view).unwrap();

        exec.handle(UiRequest::AddSignalToPlotView {
            device_id: dev.id().to_string(),
            view_id,
            signal: sig,
        });
        assert_eq!(
            exec.notices()[0].text,
            "Cannot add new y signal without an existing x signal!"
        );
        exec.dismiss_notice(0);
        assert!(exec.notices().is_empty());
    }

    #[test]
    fn test_dialog_queue_accept_and_cancel() {
        let (_bridge, mut exec) = setup();
        let (r1, p1) = call();
        let (r2, p2) = call();
        exec.handle(UiRequest::ShowIntInput {
            title: "Count".into(),
            label: "n".into(),
            value: 3,
            step: 1,
            min: 0,
            max: 10,
            responder: r1,
        });
        exec.handle(UiRequest::ShowStringInput {
            title: "Name".into(),
            label: "name".into(),
            value: "A".into(),
            responder: r2,
        });
        assert_eq!(exec.pending_dialogs(), 2);
        assert_eq!(exec.current_dialog().unwrap().title(), "Count");

        if let Some(PendingDialog::IntInput { value, .. }) = exec.current_dialog_mut() {
            *value = 42;
        }
        exec.accept_dialog();
        exec.cancel_dialog();

        // Out-of-range input is clamped on accept
        assert_eq!(p1.wait(None).unwrap(), CallOutcome::Completed(10));
        assert_eq!(p2.wait(None).unwrap(), CallOutcome::Canceled);
        assert!(exec.current_dialog().is_none());
    }

    #[test]
    fn test_inverted_int_bounds_are_swapped() {
        let (_bridge, mut exec) = setup();
        let (responder, pending) = call();
        exec.handle(UiRequest::ShowIntInput {
            title: "t".into(),
            label: "l".into(),
            value: 5,
            step: 1,
            min: 10,
            max: 0,
            responder,
        });
        match exec.current_dialog() {
            Some(PendingDialog::IntInput { min, max, .. }) => assert_eq!((*min, *max), (0, 10)),
            other => panic!("unexpected dialog {:?}", other),
        }
        exec.accept_dialog();
        assert_eq!(pending.wait(None).unwrap(), CallOutcome::Completed(5));
    }

    #[test]
    fn test_nan_and_inverted_double_bounds() {
        let (_bridge, mut exec) = setup();
        let (r1, p1) = call();
        let (r2, p2) = call();
        exec.handle(UiRequest::ShowDoubleInput {
            title: "t".into(),
            label: "l".into(),
            value: 2.5,
            decimals: 1,
            step: 0.1,
            min: f64::NAN,
            max: 1.0,
            responder: r1,
        });
        exec.handle(UiRequest::ShowDoubleInput {
            title: "t".into(),
            label: "l".into(),
            value: -3.0,
            decimals: 1,
            step: 0.1,
            min: 5.0,
            max: f64::NAN,
            responder: r2,
        });
        exec.accept_dialog();
        exec.accept_dialog();
        assert_eq!(p1.wait(None).unwrap(), CallOutcome::Completed(1.0));
        assert_eq!(p2.wait(None).unwrap(), CallOutcome::Completed(5.0));
    }

    #[test]
    fn test_timed_out_dialog_is_dropped() {
        let (_bridge, mut exec) = setup();
        let (responder, pending) = call();
        exec.handle(UiRequest::ShowMessageBox {
            title: "t".into(),
            text: "x".into(),
            responder,
        });
        assert_eq!(
            pending.wait(Some(std::time::Duration::from_millis(1))).unwrap(),
            CallOutcome::TimedOut
        );
        exec.process_pending();
        assert_eq!(exec.pending_dialogs(), 0);
    }

    #[test]
    fn test_device_removal_closes_tab() {
        let (_bridge, mut exec) = setup();
        let dev = exec.registry().create_device(DeviceType::Demo, "Demo", 0.0);
        exec.workspace_mut().add_device_tab(dev.clone());
        let id = dev.id().to_string();
        drop(dev);

        exec.registry().remove_device(&id);
        let events = exec.sync_registry();
        assert!(events
            .iter()
            .any(|e| matches!(e, RegistryEvent::DeviceRemoved(d) if d == &id)));
        assert!(exec.workspace().tab(&id).is_none());
    }

    #[test]
    fn test_value_panel_follows_channel() {
        let (_bridge, mut exec) = setup();
        let dev = exec.registry().create_device(DeviceType::Demo, "Demo", 0.0);
        let ch = dev.add_channel("A1", &[], ChannelKind::Fixed).unwrap();
        exec.workspace_mut().add_device_tab(dev.clone());

        let (responder, pending) = call();
        exec.handle(UiRequest::AddValuePanelView {
            device_id: dev.id().to_string(),
            area: DockArea::Top,
            source: ValueSource::Channel(ch.clone()),
            responder,
        });
        let id = pending.wait(None).unwrap().completed().unwrap();

        ch.push_sample(5.0, 1.0, Quantity::Voltage, QuantityFlags::DC, Unit::Volt, 5, 3)
            .unwrap();
        match &exec.workspace().view(dev.id(), &id).unwrap().content {
            ViewContent::ValuePanel { source } => {
                let sig = source.signal().unwrap();
                assert!(Arc::ptr_eq(&sig, &ch.active_signal().unwrap()));
            }
            other => panic!("unexpected content {:?}", other),
        }
    }
}
