//! Small reusable widgets
//!
//! - [`StatusIndicator`] - Colored status dot with label
//! - [`ValueDisplay`] - Large formatted measurement with unit and signal name
//! - [`curve_color`] - Stable palette for plot curves

use crate::registry::Signal;
use egui::{Color32, Response, RichText, Ui, Widget};

const PALETTE: [Color32; 8] = [
    Color32::from_rgb(100, 149, 237),
    Color32::from_rgb(255, 165, 0),
    Color32::from_rgb(60, 179, 113),
    Color32::from_rgb(220, 20, 60),
    Color32::from_rgb(186, 85, 211),
    Color32::from_rgb(255, 215, 0),
    Color32::from_rgb(64, 224, 208),
    Color32::from_rgb(244, 164, 96),
];

/// Color of the n-th curve in a plot
pub fn curve_color(index: usize) -> Color32 {
    PALETTE[index % PALETTE.len()]
}

/// A colored status dot with a label
pub struct StatusIndicator {
    color: Color32,
    label: String,
    tooltip: Option<String>,
}

impl StatusIndicator {
    pub fn new(color: Color32, label: impl Into<String>) -> Self {
        Self {
            color,
            label: label.into(),
            tooltip: None,
        }
    }

    pub fn running() -> Self {
        Self::new(Color32::GREEN, "Running")
    }

    pub fn idle() -> Self {
        Self::new(Color32::GRAY, "Idle")
    }

    pub fn failed() -> Self {
        Self::new(Color32::RED, "Failed")
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }
}

impl Widget for StatusIndicator {
    fn ui(self, ui: &mut Ui) -> Response {
        let response = ui
            .horizontal(|ui| {
                ui.colored_label(self.color, "●");
                ui.label(&self.label);
            })
            .response;

        match self.tooltip {
            Some(tooltip) => response.on_hover_text(tooltip),
            None => response,
        }
    }
}

/// The last value of a signal in a large font
pub struct ValueDisplay {
    caption: String,
    value: String,
    color: Option<Color32>,
    size: f32,
}

impl ValueDisplay {
    pub fn new(caption: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
            value: value.into(),
            color: None,
            size: 28.0,
        }
    }

    /// Display for a signal, or a placeholder when there is none yet
    pub fn for_signal(signal: Option<&Signal>) -> Self {
        match signal {
            Some(sig) => Self::new(
                sig.display_name(),
                sig.format_last().unwrap_or_else(|| "-".to_string()),
            ),
            None => Self::new("No signal", "-"),
        }
    }

    pub fn with_color(mut self, color: Color32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }
}

impl Widget for ValueDisplay {
    fn ui(self, ui: &mut Ui) -> Response {
        ui.vertical(|ui| {
            let mut text = RichText::new(self.value).monospace().size(self.size);
            if let Some(color) = self.color {
                text = text.color(color);
            }
            ui.label(text);
            ui.label(RichText::new(self.caption).small().color(Color32::GRAY));
        })
        .response
    }
}
