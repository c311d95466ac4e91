//! Thread boundary between the script worker and the GUI thread.
//!
//! The script thread holds a [`UiBridge`]; the GUI thread owns the matching
//! [`BridgeEndpoint`] and drains it once per frame. Requests carry registry
//! handles (`Arc`s), never references to GUI state.
//!
//! Two call shapes:
//!
//! - **Non-blocking**: the request is queued and the call returns at once
//!   (opening a device tab, adding signals to existing views).
//! - **Blocking**: the request carries a [`Responder`]; the script thread
//!   waits until the GUI completes or cancels it, or until the call's
//!   timeout runs out. Only one blocking call may be in flight per bridge
//!   context.
//!
//! ```text
//!   script thread                         GUI thread
//!   ─────────────                         ──────────
//!   create_data_view ──UiRequest──────▶  GuiExecutor::process_pending
//!        │ (waits)                             │ builds the view
//!        ◀──────────── Responder::complete(id) ┘
//! ```

pub mod pending;

pub use pending::{call, CallOutcome, PendingCall, Responder};

use crate::registry::{Channel, Configurable, Device, Signal};
use crate::types::DockArea;
use crate::views::{ValueSource, ViewId};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Channel capacity for requests (script → GUI).
const REQUEST_CHANNEL_CAPACITY: usize = 256;

/// Failures of the bridge itself, as opposed to a request's outcome
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("GUI side of the bridge is gone")]
    Disconnected,

    #[error("another blocking UI call is already in flight on this context")]
    CallInFlight,
}

/// Lifecycle of the blocking call on a bridge context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    RequestSent,
    Completed,
    Canceled,
    TimedOut,
}

impl CallState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => CallState::RequestSent,
            2 => CallState::Completed,
            3 => CallState::Canceled,
            4 => CallState::TimedOut,
            _ => CallState::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            CallState::Idle => 0,
            CallState::RequestSent => 1,
            CallState::Completed => 2,
            CallState::Canceled => 3,
            CallState::TimedOut => 4,
        }
    }
}

/// Plot source for `create_*_plot_view`
#[derive(Debug, Clone)]
pub enum PlotSource {
    Channel(Arc<Channel>),
    Signal(Arc<Signal>),
    Xy { x: Arc<Signal>, y: Arc<Signal> },
}

/// Requests sent from the script thread to the GUI thread.
#[derive(Debug)]
pub enum UiRequest {
    AddDeviceTab {
        device: Arc<Device>,
    },
    AddSignalToDataView {
        device_id: String,
        view_id: ViewId,
        signal: Arc<Signal>,
    },
    AddSignalToPlotView {
        device_id: String,
        view_id: ViewId,
        signal: Arc<Signal>,
    },
    AddSignalsToXyPlotView {
        device_id: String,
        view_id: ViewId,
        x_signal: Arc<Signal>,
        y_signal: Arc<Signal>,
    },
    AddDataView {
        device_id: String,
        area: DockArea,
        signal: Arc<Signal>,
        responder: Responder<ViewId>,
    },
    AddControlView {
        device_id: String,
        area: DockArea,
        configurable: Arc<Configurable>,
        responder: Responder<ViewId>,
    },
    AddPlotView {
        device_id: String,
        area: DockArea,
        source: PlotSource,
        responder: Responder<ViewId>,
    },
    AddPowerPanelView {
        device_id: String,
        area: DockArea,
        voltage: Arc<Signal>,
        current: Arc<Signal>,
        responder: Responder<ViewId>,
    },
    AddValuePanelView {
        device_id: String,
        area: DockArea,
        source: ValueSource,
        responder: Responder<ViewId>,
    },
    /// Completed means confirmed, canceled means declined
    ShowMessageBox {
        title: String,
        text: String,
        responder: Responder<()>,
    },
    ShowStringInput {
        title: String,
        label: String,
        value: String,
        responder: Responder<String>,
    },
    ShowDoubleInput {
        title: String,
        label: String,
        value: f64,
        decimals: u32,
        step: f64,
        min: f64,
        max: f64,
        responder: Responder<f64>,
    },
    ShowIntInput {
        title: String,
        label: String,
        value: i64,
        step: i64,
        min: i64,
        max: i64,
        responder: Responder<i64>,
    },
}

impl UiRequest {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            UiRequest::AddDeviceTab { .. } => "add_device_tab",
            UiRequest::AddSignalToDataView { .. } => "add_signal_to_data_view",
            UiRequest::AddSignalToPlotView { .. } => "add_signal_to_plot_view",
            UiRequest::AddSignalsToXyPlotView { .. } => "add_signals_to_xy_plot_view",
            UiRequest::AddDataView { .. } => "add_data_view",
            UiRequest::AddControlView { .. } => "add_control_view",
            UiRequest::AddPlotView { .. } => "add_plot_view",
            UiRequest::AddPowerPanelView { .. } => "add_power_panel_view",
            UiRequest::AddValuePanelView { .. } => "add_value_panel_view",
            UiRequest::ShowMessageBox { .. } => "show_message_box",
            UiRequest::ShowStringInput { .. } => "show_string_input",
            UiRequest::ShowDoubleInput { .. } => "show_double_input",
            UiRequest::ShowIntInput { .. } => "show_int_input",
        }
    }
}

/// Callback the bridge invokes after queueing a request, e.g. to repaint
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// Script-side handle for issuing UI requests.
///
/// Clones share the same call context, so at most one blocking call is in
/// flight across all of them. Use [`UiBridge::new_context`] for an
/// independent context.
#[derive(Clone)]
pub struct UiBridge {
    tx: Sender<UiRequest>,
    state: Arc<AtomicU8>,
    timeout: Option<Duration>,
    waker: Option<Waker>,
}

impl fmt::Debug for UiBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiBridge")
            .field("state", &self.call_state())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Resets the context to idle when a blocking call ends, however it ends
struct InFlight<'a> {
    state: &'a AtomicU8,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state.store(CallState::Idle.as_u8(), Ordering::Release);
    }
}

impl UiBridge {
    /// Create a bridge pair: `(bridge_for_script, endpoint_for_gui)`.
    pub fn new() -> (Self, BridgeEndpoint) {
        let (tx, rx) = bounded(REQUEST_CHANNEL_CAPACITY);
        let bridge = Self {
            tx,
            state: Arc::new(AtomicU8::new(CallState::Idle.as_u8())),
            timeout: None,
            waker: None,
        };
        (bridge, BridgeEndpoint { rx })
    }

    /// Same channel, independent call context
    pub fn new_context(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            state: Arc::new(AtomicU8::new(CallState::Idle.as_u8())),
            timeout: self.timeout,
            waker: self.waker.clone(),
        }
    }

    /// Copy of this bridge whose blocking calls time out after `timeout`
    pub fn with_timeout(&self, timeout: Option<Duration>) -> Self {
        let mut bridge = self.clone();
        bridge.timeout = timeout;
        bridge
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn set_waker(&mut self, waker: Waker) {
        self.waker = Some(waker);
    }

    pub fn call_state(&self) -> CallState {
        CallState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn send(&self, request: UiRequest) -> Result<(), BridgeError> {
        tracing::debug!("UI request: {}", request.name());
        self.tx.send(request).map_err(|_| BridgeError::Disconnected)?;
        if let Some(waker) = &self.waker {
            waker();
        }
        Ok(())
    }

    /// Issue a blocking request and wait for its outcome
    pub fn call<T>(
        &self,
        make: impl FnOnce(Responder<T>) -> UiRequest,
    ) -> Result<CallOutcome<T>, BridgeError> {
        let idle = CallState::Idle.as_u8();
        let sent = CallState::RequestSent.as_u8();
        if self
            .state
            .compare_exchange(idle, sent, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(BridgeError::CallInFlight);
        }
        let _in_flight = InFlight { state: &self.state };

        let (responder, pending) = pending::call();
        self.send(make(responder))?;
        let outcome = pending.wait(self.timeout)?;

        let terminal = match &outcome {
            CallOutcome::Completed(_) => CallState::Completed,
            CallOutcome::Canceled => CallState::Canceled,
            CallOutcome::TimedOut => {
                tracing::warn!("UI call timed out after {:?}", self.timeout);
                CallState::TimedOut
            }
        };
        self.state.store(terminal.as_u8(), Ordering::Release);
        Ok(outcome)
    }

    fn call_view(
        &self,
        make: impl FnOnce(Responder<ViewId>) -> UiRequest,
    ) -> Result<ViewId, BridgeError> {
        Ok(self.call(make)?.completed().unwrap_or_else(ViewId::invalid))
    }

    // --- Non-blocking ---

    pub fn add_device_tab(&self, device: Arc<Device>) -> Result<(), BridgeError> {
        self.send(UiRequest::AddDeviceTab { device })
    }

    pub fn add_signal_to_data_view(
        &self,
        device_id: &str,
        view_id: &ViewId,
        signal: Arc<Signal>,
    ) -> Result<(), BridgeError> {
        self.send(UiRequest::AddSignalToDataView {
            device_id: device_id.to_string(),
            view_id: view_id.clone(),
            signal,
        })
    }

    pub fn add_signal_to_plot_view(
        &self,
        device_id: &str,
        view_id: &ViewId,
        signal: Arc<Signal>,
    ) -> Result<(), BridgeError> {
        self.send(UiRequest::AddSignalToPlotView {
            device_id: device_id.to_string(),
            view_id: view_id.clone(),
            signal,
        })
    }

    pub fn add_signals_to_xy_plot_view(
        &self,
        device_id: &str,
        view_id: &ViewId,
        x_signal: Arc<Signal>,
        y_signal: Arc<Signal>,
    ) -> Result<(), BridgeError> {
        self.send(UiRequest::AddSignalsToXyPlotView {
            device_id: device_id.to_string(),
            view_id: view_id.clone(),
            x_signal,
            y_signal,
        })
    }

    // --- Blocking: views ---
    //
    // Each returns the new view's id, or an invalid id if the GUI could not
    // build the view or the call timed out.

    pub fn create_data_view(
        &self,
        device_id: &str,
        area: DockArea,
        signal: Arc<Signal>,
    ) -> Result<ViewId, BridgeError> {
        self.call_view(|responder| UiRequest::AddDataView {
            device_id: device_id.to_string(),
            area,
            signal,
            responder,
        })
    }

    pub fn create_control_view(
        &self,
        device_id: &str,
        area: DockArea,
        configurable: Arc<Configurable>,
    ) -> Result<ViewId, BridgeError> {
        self.call_view(|responder| UiRequest::AddControlView {
            device_id: device_id.to_string(),
            area,
            configurable,
            responder,
        })
    }

    pub fn create_plot_view(
        &self,
        device_id: &str,
        area: DockArea,
        source: PlotSource,
    ) -> Result<ViewId, BridgeError> {
        self.call_view(|responder| UiRequest::AddPlotView {
            device_id: device_id.to_string(),
            area,
            source,
            responder,
        })
    }

    pub fn create_power_panel_view(
        &self,
        device_id: &str,
        area: DockArea,
        voltage: Arc<Signal>,
        current: Arc<Signal>,
    ) -> Result<ViewId, BridgeError> {
        self.call_view(|responder| UiRequest::AddPowerPanelView {
            device_id: device_id.to_string(),
            area,
            voltage,
            current,
            responder,
        })
    }

    pub fn create_value_panel_view(
        &self,
        device_id: &str,
        area: DockArea,
        source: ValueSource,
    ) -> Result<ViewId, BridgeError> {
        self.call_view(|responder| UiRequest::AddValuePanelView {
            device_id: device_id.to_string(),
            area,
            source,
            responder,
        })
    }

    // --- Blocking: dialogs ---

    /// True if the user confirmed; false if declined or timed out
    pub fn show_message(&self, title: &str, text: &str) -> Result<bool, BridgeError> {
        let outcome = self.call(|responder| UiRequest::ShowMessageBox {
            title: title.to_string(),
            text: text.to_string(),
            responder,
        })?;
        Ok(matches!(outcome, CallOutcome::Completed(())))
    }

    /// The entered text, or `None` if canceled or timed out
    pub fn show_string_input(
        &self,
        title: &str,
        label: &str,
        value: &str,
    ) -> Result<Option<String>, BridgeError> {
        Ok(self
            .call(|responder| UiRequest::ShowStringInput {
                title: title.to_string(),
                label: label.to_string(),
                value: value.to_string(),
                responder,
            })?
            .completed())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn show_double_input(
        &self,
        title: &str,
        label: &str,
        value: f64,
        decimals: u32,
        step: f64,
        min: f64,
        max: f64,
    ) -> Result<Option<f64>, BridgeError> {
        Ok(self
            .call(|responder| UiRequest::ShowDoubleInput {
                title: title.to_string(),
                label: label.to_string(),
                value,
                decimals,
                step,
                min,
                max,
                responder,
            })?
            .completed())
    }

    pub fn show_int_input(
        &self,
        title: &str,
        label: &str,
        value: i64,
        step: i64,
        min: i64,
        max: i64,
    ) -> Result<Option<i64>, BridgeError> {
        Ok(self
            .call(|responder| UiRequest::ShowIntInput {
                title: title.to_string(),
                label: label.to_string(),
                value,
                step,
                min,
                max,
                responder,
            })?
            .completed())
    }
}

/// GUI-side end of the bridge
pub struct BridgeEndpoint {
    rx: Receiver<UiRequest>,
}

impl BridgeEndpoint {
    /// Try to receive a single request without blocking.
    pub fn try_recv(&self) -> Option<UiRequest> {
        self.rx.try_recv().ok()
    }

    /// Drain all pending requests, in arrival order.
    pub fn drain(&self) -> Vec<UiRequest> {
        let mut requests = Vec::new();
        while let Ok(request) = self.rx.try_recv() {
            requests.push(request);
        }
        requests
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
