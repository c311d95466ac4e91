//! Views placed inside device tabs
//!
//! A view is plain data: a kind, a dock area, and the registry handles it
//! displays. Rendering lives in the frontend; this module only knows how to
//! build, extend, save, and restore views.
//!
//! View ids have the form `"<kind-tag>:<uuid>"`. The tag is what restore
//! reads back to decide which kind of view to rebuild. An empty id means
//! "no view" and is what a failed creation hands back to the script.

pub mod dispatch;
pub mod workspace;

pub use dispatch::{control_view_for_configurable, matching_rule, ViewRule, CONTROL_VIEW_RULES};
pub use workspace::{DeviceTab, ViewError, Workspace};

use crate::config::SettingsStore;
use crate::registry::{persist, Channel, Configurable, Registry, Signal};
use crate::types::DockArea;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of a view, `"<kind-tag>:<uuid>"`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewId(String);

impl ViewId {
    pub fn new(kind: ViewKind) -> Self {
        ViewId(format!("{}:{}", kind.tag(), Uuid::new_v4()))
    }

    /// The empty id handed back when no view was created
    pub fn invalid() -> Self {
        ViewId(String::new())
    }

    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Kind encoded in the id, if any
    pub fn kind(&self) -> Option<ViewKind> {
        let (tag, _) = self.0.split_once(':')?;
        ViewKind::from_tag(tag)
    }
}

impl From<String> for ViewId {
    fn from(s: String) -> Self {
        ViewId(s)
    }
}

impl From<&str> for ViewId {
    fn from(s: &str) -> Self {
        ViewId(s.to_string())
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every kind of view the workspace can host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Data,
    ChannelPlot,
    SignalPlot,
    XyPlot,
    PowerPanel,
    ValuePanel,
    SourceSinkControl,
    DemoControl,
    MeasurementControl,
    GenericControl,
}

impl ViewKind {
    const TAGS: &'static [(ViewKind, &'static str)] = &[
        (ViewKind::Data, "data"),
        (ViewKind::ChannelPlot, "plot_ch"),
        (ViewKind::SignalPlot, "plot_sig"),
        (ViewKind::XyPlot, "plot_xy"),
        (ViewKind::PowerPanel, "powerpanel"),
        (ViewKind::ValuePanel, "valuepanel"),
        (ViewKind::SourceSinkControl, "sourcesinkcontrol"),
        (ViewKind::DemoControl, "democontrol"),
        (ViewKind::MeasurementControl, "measurementcontrol"),
        (ViewKind::GenericControl, "genericcontrol"),
    ];

    pub fn tag(&self) -> &'static str {
        Self::TAGS
            .iter()
            .find(|(k, _)| k == self)
            .map(|(_, t)| *t)
            .unwrap_or("view")
    }

    pub fn from_tag(tag: &str) -> Option<ViewKind> {
        Self::TAGS.iter().find(|(_, t)| *t == tag).map(|(k, _)| *k)
    }

    pub fn is_control(&self) -> bool {
        matches!(
            self,
            ViewKind::SourceSinkControl
                | ViewKind::DemoControl
                | ViewKind::MeasurementControl
                | ViewKind::GenericControl
        )
    }
}

/// A curve in a time plot
#[derive(Debug, Clone)]
pub enum TimeCurve {
    /// Follows whichever signal is active on the channel
    Channel(Arc<Channel>),
    Signal(Arc<Signal>),
}

impl TimeCurve {
    /// Signal currently plotted by this curve
    pub fn signal(&self) -> Option<Arc<Signal>> {
        match self {
            TimeCurve::Channel(ch) => ch.active_signal(),
            TimeCurve::Signal(sig) => Some(sig.clone()),
        }
    }

    pub fn name(&self) -> String {
        match self {
            TimeCurve::Channel(ch) => ch.name().to_string(),
            TimeCurve::Signal(sig) => sig.display_name(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct XyCurve {
    pub x: Arc<Signal>,
    pub y: Arc<Signal>,
}

/// Source of a value panel
#[derive(Debug, Clone)]
pub enum ValueSource {
    Channel(Arc<Channel>),
    Signal(Arc<Signal>),
}

impl ValueSource {
    pub fn signal(&self) -> Option<Arc<Signal>> {
        match self {
            ValueSource::Channel(ch) => ch.active_signal(),
            ValueSource::Signal(sig) => Some(sig.clone()),
        }
    }
}

/// What a view displays
#[derive(Debug, Clone)]
pub enum ViewContent {
    Data { signals: Vec<Arc<Signal>> },
    TimePlot { curves: Vec<TimeCurve> },
    XyPlot { curves: Vec<XyCurve> },
    PowerPanel { voltage: Arc<Signal>, current: Arc<Signal> },
    ValuePanel { source: ValueSource },
    Control { configurable: Arc<Configurable> },
}

/// A view hosted by a device tab
#[derive(Debug, Clone)]
pub struct View {
    pub id: ViewId,
    pub kind: ViewKind,
    pub area: DockArea,
    pub content: ViewContent,
}

impl View {
    fn with_kind(kind: ViewKind, area: DockArea, content: ViewContent) -> Self {
        Self {
            id: ViewId::new(kind),
            kind,
            area,
            content,
        }
    }

    pub fn data(area: DockArea, signal: Arc<Signal>) -> Self {
        Self::with_kind(
            ViewKind::Data,
            area,
            ViewContent::Data {
                signals: vec![signal],
            },
        )
    }

    pub fn channel_plot(area: DockArea, channel: Arc<Channel>) -> Self {
        Self::with_kind(
            ViewKind::ChannelPlot,
            area,
            ViewContent::TimePlot {
                curves: vec![TimeCurve::Channel(channel)],
            },
        )
    }

    pub fn signal_plot(area: DockArea, signal: Arc<Signal>) -> Self {
        Self::with_kind(
            ViewKind::SignalPlot,
            area,
            ViewContent::TimePlot {
                curves: vec![TimeCurve::Signal(signal)],
            },
        )
    }

    pub fn xy_plot(area: DockArea, x: Arc<Signal>, y: Arc<Signal>) -> Self {
        Self::with_kind(
            ViewKind::XyPlot,
            area,
            ViewContent::XyPlot {
                curves: vec![XyCurve { x, y }],
            },
        )
    }

    pub fn power_panel(area: DockArea, voltage: Arc<Signal>, current: Arc<Signal>) -> Self {
        Self::with_kind(
            ViewKind::PowerPanel,
            area,
            ViewContent::PowerPanel { voltage, current },
        )
    }

    pub fn value_panel(area: DockArea, source: ValueSource) -> Self {
        Self::with_kind(ViewKind::ValuePanel, area, ViewContent::ValuePanel { source })
    }

    /// Control view of the given kind; `kind` must be a control kind
    pub fn control(kind: ViewKind, area: DockArea, configurable: Arc<Configurable>) -> Self {
        debug_assert!(kind.is_control());
        Self::with_kind(kind, area, ViewContent::Control { configurable })
    }

    /// Title shown on the view's frame
    pub fn title(&self) -> String {
        match &self.content {
            ViewContent::Data { signals } => match signals.first() {
                Some(sig) => format!("Data {}", sig.display_name()),
                None => "Data".to_string(),
            },
            ViewContent::TimePlot { curves } => match curves.first() {
                Some(curve) => format!("Plot {}", curve.name()),
                None => "Plot".to_string(),
            },
            ViewContent::XyPlot { curves } => match curves.first() {
                Some(c) => format!("XY {} / {}", c.y.display_name(), c.x.display_name()),
                None => "XY Plot".to_string(),
            },
            ViewContent::PowerPanel { voltage, .. } => {
                format!("Power Panel {}", voltage.channel_name())
            }
            ViewContent::ValuePanel { source } => match source {
                ValueSource::Channel(ch) => format!("Value {}", ch.name()),
                ValueSource::Signal(sig) => format!("Value {}", sig.display_name()),
            },
            ViewContent::Control { configurable } => {
                format!("Control {}", configurable.name())
            }
        }
    }

    /// Write the view into the current settings group
    pub fn save(&self, settings: &mut SettingsStore) {
        settings.set_value("id", self.id.as_str());
        settings.set_value("area", self.area.as_str());

        match &self.content {
            ViewContent::Data { signals } => {
                for (i, sig) in signals.iter().enumerate() {
                    settings.begin_group(&format!("signal{}", i));
                    persist::save_signal(sig, settings, "");
                    settings.end_group();
                }
            }
            ViewContent::TimePlot { curves } => {
                for (i, curve) in curves.iter().enumerate() {
                    settings.begin_group(&format!("curve{}", i));
                    match curve {
                        TimeCurve::Channel(ch) => persist::save_channel(ch, settings, ""),
                        TimeCurve::Signal(sig) => persist::save_signal(sig, settings, ""),
                    }
                    settings.end_group();
                }
            }
            ViewContent::XyPlot { curves } => {
                // Only the first curve is persisted, like the x/y pair it was created with
                if let Some(curve) = curves.first() {
                    persist::save_signal(&curve.x, settings, "x_");
                    persist::save_signal(&curve.y, settings, "y_");
                }
            }
            ViewContent::PowerPanel { voltage, current } => {
                persist::save_signal(voltage, settings, "v_");
                persist::save_signal(current, settings, "i_");
            }
            ViewContent::ValuePanel { source } => match source {
                ValueSource::Channel(ch) => persist::save_channel(ch, settings, ""),
                ValueSource::Signal(sig) => persist::save_signal(sig, settings, ""),
            },
            ViewContent::Control { configurable } => {
                persist::save_configurable(configurable, settings, "");
            }
        }
    }

    /// Rebuild a view from the current settings group
    ///
    /// Returns `None` when the id is unknown or the handles it needs no
    /// longer resolve. Curves and signals that fail to resolve are dropped
    /// individually.
    pub fn restore(registry: &Registry, settings: &mut SettingsStore) -> Option<View> {
        let id = ViewId::from(settings.string("id")?);
        let kind = id.kind()?;
        let area = settings
            .string("area")
            .and_then(|a| DockArea::parse(&a))
            .unwrap_or_default();

        let content = match kind {
            ViewKind::Data => {
                let signals = restore_grouped(registry, settings, "signal", persist::restore_signal);
                if signals.is_empty() {
                    return None;
                }
                ViewContent::Data { signals }
            }
            ViewKind::ChannelPlot => {
                let curves: Vec<TimeCurve> =
                    restore_grouped(registry, settings, "curve", persist::restore_channel)
                        .into_iter()
                        .map(TimeCurve::Channel)
                        .collect();
                if curves.is_empty() {
                    return None;
                }
                ViewContent::TimePlot { curves }
            }
            ViewKind::SignalPlot => {
                let curves: Vec<TimeCurve> =
                    restore_grouped(registry, settings, "curve", persist::restore_signal)
                        .into_iter()
                        .map(TimeCurve::Signal)
                        .collect();
                if curves.is_empty() {
                    return None;
                }
                ViewContent::TimePlot { curves }
            }
            ViewKind::XyPlot => {
                let x = persist::restore_signal(registry, settings, "x_")?;
                let y = persist::restore_signal(registry, settings, "y_")?;
                ViewContent::XyPlot {
                    curves: vec![XyCurve { x, y }],
                }
            }
            ViewKind::PowerPanel => ViewContent::PowerPanel {
                voltage: persist::restore_signal(registry, settings, "v_")?,
                current: persist::restore_signal(registry, settings, "i_")?,
            },
            ViewKind::ValuePanel => {
                let source = if persist::is_signal(settings, "") {
                    ValueSource::Signal(persist::restore_signal(registry, settings, "")?)
                } else {
                    ValueSource::Channel(persist::restore_channel(registry, settings, "")?)
                };
                ViewContent::ValuePanel { source }
            }
            ViewKind::SourceSinkControl
            | ViewKind::DemoControl
            | ViewKind::MeasurementControl
            | ViewKind::GenericControl => ViewContent::Control {
                configurable: persist::restore_configurable(registry, settings, "")?,
            },
        };

        Some(View {
            id,
            kind,
            area,
            content,
        })
    }
}

/// Restore every child group starting with `prefix`, in group order
fn restore_grouped<T>(
    registry: &Registry,
    settings: &mut SettingsStore,
    prefix: &str,
    restore: fn(&Registry, &SettingsStore, &str) -> Option<T>,
) -> Vec<T> {
    let mut groups: Vec<String> = settings
        .child_groups()
        .into_iter()
        .filter(|g| g.starts_with(prefix))
        .collect();
    groups.sort_by_key(|g| g[prefix.len()..].parse::<usize>().unwrap_or(usize::MAX));

    let mut restored = Vec::new();
    for group in groups {
        settings.begin_group(&group);
        match restore(registry, settings, "") {
            Some(item) => restored.push(item),
            None => tracing::warn!("Skipping unresolved {} in {}", group, settings.group()),
        }
        settings.end_group();
    }
    restored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_id_shape() {
        let id = ViewId::new(ViewKind::XyPlot);
        assert!(id.is_valid());
        assert!(id.as_str().starts_with("plot_xy:"));
        assert_eq!(id.kind(), Some(ViewKind::XyPlot));
        assert_ne!(id, ViewId::new(ViewKind::XyPlot));
    }

    #[test]
    fn test_invalid_view_id() {
        let id = ViewId::invalid();
        assert!(!id.is_valid());
        assert_eq!(id.as_str(), "");
        assert_eq!(id.kind(), None);
    }

    #[test]
    fn test_kind_tags_round_trip() {
        for (kind, tag) in ViewKind::TAGS {
            assert_eq!(ViewKind::from_tag(tag), Some(*kind));
        }
        assert_eq!(ViewKind::from_tag("sequence"), None);
    }
}
