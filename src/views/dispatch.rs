//! Picking a control view for a configurable
//!
//! Rules are tried in order and the first whose predicate holds builds the
//! view. A configurable exposing no keys at all gets no view.

use super::{View, ViewKind};
use crate::registry::Configurable;
use crate::types::{ConfigKey, DockArea};
use std::sync::Arc;

/// A (predicate, view kind) pair in the dispatch table
pub struct ViewRule {
    pub name: &'static str,
    pub predicate: fn(&Configurable) -> bool,
    pub kind: ViewKind,
}

impl ViewRule {
    pub fn build(&self, configurable: Arc<Configurable>, area: DockArea) -> View {
        View::control(self.kind, area, configurable)
    }
}

fn is_source_sink(c: &Configurable) -> bool {
    c.device_type().is_source_sink() && c.has_get_or_set_any(ConfigKey::SOURCE_SINK)
}

fn is_demo(c: &Configurable) -> bool {
    c.device_type() == crate::types::DeviceType::Demo && c.has_get_or_set_any(ConfigKey::DEMO)
}

fn is_measurement(c: &Configurable) -> bool {
    c.device_type().is_measurement() && c.has_get_or_set_any(ConfigKey::MEASUREMENT)
}

fn is_generic(c: &Configurable) -> bool {
    c.has_any_key()
}

/// Dispatch table, most specific first
pub static CONTROL_VIEW_RULES: &[ViewRule] = &[
    ViewRule {
        name: "source/sink",
        predicate: is_source_sink,
        kind: ViewKind::SourceSinkControl,
    },
    ViewRule {
        name: "demo",
        predicate: is_demo,
        kind: ViewKind::DemoControl,
    },
    ViewRule {
        name: "measurement",
        predicate: is_measurement,
        kind: ViewKind::MeasurementControl,
    },
    ViewRule {
        name: "generic",
        predicate: is_generic,
        kind: ViewKind::GenericControl,
    },
];

/// First rule matching the configurable
pub fn matching_rule(configurable: &Configurable) -> Option<&'static ViewRule> {
    CONTROL_VIEW_RULES
        .iter()
        .find(|rule| (rule.predicate)(configurable))
}

/// Build the control view for a configurable, if any rule matches
pub fn control_view_for_configurable(
    configurable: &Arc<Configurable>,
    area: DockArea,
) -> Option<View> {
    let rule = matching_rule(configurable)?;
    tracing::debug!(
        "Configurable {} dispatched to {} control view",
        configurable.name(),
        rule.name
    );
    Some(rule.build(configurable.clone(), area))
}
