//! Script Editor Tab
//!
//! Rhai editor with syntax highlighting and autocomplete for the device and
//! UI functions, plus the run controls and output log of the script runner.

use crate::error::{BenchVisError, Result, ResultExt};
use crate::scripting::{builtins, ScriptEvent};
use egui::{text::LayoutJob, Color32, FontId, RichText, TextFormat, Ui};
use std::path::PathBuf;

/// Lines kept in the output log
const MAX_LOG_LINES: usize = 500;

/// Documentation for a function available in scripts
#[derive(Debug, Clone)]
pub struct ScriptItem {
    pub name: &'static str,
    pub description: &'static str,
    pub signature: &'static str,
    pub category: ScriptItemCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptItemCategory {
    /// Registry lookups: device(), devices()
    Lookup,
    /// Methods on device, channel and signal handles
    Handle,
    /// View creation and dialogs
    Ui,
    /// sleep(), print()
    Utility,
}

impl ScriptItemCategory {
    pub const ALL: [ScriptItemCategory; 4] = [
        ScriptItemCategory::Lookup,
        ScriptItemCategory::Handle,
        ScriptItemCategory::Ui,
        ScriptItemCategory::Utility,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Lookup => "Lookup",
            Self::Handle => "Handles",
            Self::Ui => "UI",
            Self::Utility => "Utility",
        }
    }

    pub fn color(&self) -> Color32 {
        match self {
            Self::Lookup => Color32::from_rgb(86, 156, 214),
            Self::Handle => Color32::from_rgb(156, 220, 254),
            Self::Ui => Color32::from_rgb(220, 220, 170),
            Self::Utility => Color32::from_rgb(206, 145, 120),
        }
    }
}

const fn item(
    name: &'static str,
    signature: &'static str,
    description: &'static str,
    category: ScriptItemCategory,
) -> ScriptItem {
    ScriptItem {
        name,
        description,
        signature,
        category,
    }
}

use ScriptItemCategory::{Handle, Lookup, Ui as UiCat, Utility};

/// Every function offered by autocomplete and the help panel
pub static SCRIPT_ITEMS: &[ScriptItem] = &[
    item("device", "device(id)", "Device by id, or ()", Lookup),
    item("devices", "devices()", "All connected devices", Lookup),
    item("id", "dev.id()", "Device id", Handle),
    item("name", "x.name()", "Name of a device, channel, signal or configurable", Handle),
    item("device_type", "dev.device_type()", "Device type name", Handle),
    item("channel", "dev.channel(name)", "Channel by name, or ()", Handle),
    item("channels", "dev.channels()", "Channels ordered by index", Handle),
    item("configurable", "dev.configurable(name)", "Configurable by name, or ()", Handle),
    item("configurables", "dev.configurables()", "All configurables", Handle),
    item("actual_signal", "ch.actual_signal()", "Active signal of a channel, or ()", Handle),
    item("signals", "ch.signals()", "All signals of a channel", Handle),
    item("last_value", "sig.last_value()", "Latest sample value, or ()", Handle),
    item("sample_count", "sig.sample_count()", "Number of samples", Handle),
    item("unit", "sig.unit()", "Unit symbol", Handle),
    item("ui_add_device_tab", "ui_add_device_tab(dev)", "Open a tab for the device", UiCat),
    item("ui_add_data_view", "ui_add_data_view(dev_id, area, sig)", "Table of signal values", UiCat),
    item("ui_add_control_view", "ui_add_control_view(dev_id, area, conf)", "Control view for a configurable", UiCat),
    item("ui_add_plot_view", "ui_add_plot_view(dev_id, area, ch | sig | x, y)", "Time or XY plot", UiCat),
    item("ui_add_power_panel_view", "ui_add_power_panel_view(dev_id, area, v, i)", "Power panel", UiCat),
    item("ui_add_value_panel_view", "ui_add_value_panel_view(dev_id, area, ch | sig)", "Single large value", UiCat),
    item("ui_add_signal_to_data_view", "ui_add_signal_to_data_view(dev_id, view_id, sig)", "Extend a data view", UiCat),
    item("ui_add_signal_to_plot_view", "ui_add_signal_to_plot_view(dev_id, view_id, sig)", "Extend a plot view", UiCat),
    item("ui_add_signals_to_xy_plot_view", "ui_add_signals_to_xy_plot_view(dev_id, view_id, x, y)", "Add an XY curve", UiCat),
    item("ui_show_message_box", "ui_show_message_box(title, text)", "true if confirmed", UiCat),
    item("ui_show_string_input_dialog", "ui_show_string_input_dialog(title, label [, value])", "Text or ()", UiCat),
    item("ui_show_double_input_dialog", "ui_show_double_input_dialog(title, label [, value, decimals, step, min, max])", "Number or ()", UiCat),
    item("ui_show_int_input_dialog", "ui_show_int_input_dialog(title, label [, value, step, min, max])", "Integer or ()", UiCat),
    item("sleep", "sleep(ms)", "Pause the script", Utility),
    item("print", "print(text)", "Write to the output log", Utility),
];

const KEYWORDS: &[&str] = &[
    "fn", "let", "const", "if", "else", "while", "for", "in", "loop", "break", "continue",
    "return", "throw", "true", "false", "switch", "import", "export", "as",
];

/// Autocomplete state
#[derive(Debug, Clone, Default)]
pub struct ScriptEditorState {
    pub autocomplete_open: bool,
    pub suggestions: Vec<&'static ScriptItem>,
    pub selected_suggestion: usize,
    pub current_word: String,
    pub autocomplete_start_pos: usize,
    pub show_help: bool,
}

impl ScriptEditorState {
    pub fn update_suggestions(&mut self, word: &str) {
        let word = word.to_lowercase();
        self.suggestions = SCRIPT_ITEMS
            .iter()
            .filter(|item| item.name.starts_with(&word))
            .collect();
        self.selected_suggestion = 0;
    }

    pub fn select_next(&mut self) {
        if !self.suggestions.is_empty() {
            self.selected_suggestion = (self.selected_suggestion + 1) % self.suggestions.len();
        }
    }

    pub fn select_prev(&mut self) {
        if !self.suggestions.is_empty() {
            self.selected_suggestion = if self.selected_suggestion == 0 {
                self.suggestions.len() - 1
            } else {
                self.selected_suggestion - 1
            };
        }
    }

    pub fn selected(&self) -> Option<&'static ScriptItem> {
        self.suggestions.get(self.selected_suggestion).copied()
    }
}

/// What the user asked the script tab to do
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptAction {
    Run,
    Check,
    Stop,
    Open,
    Save,
}

/// Content and status of the script tab
#[derive(Debug, Default)]
pub struct ScriptTab {
    pub source: String,
    pub path: Option<PathBuf>,
    pub editor: ScriptEditorState,
    pub log: Vec<(Color32, String)>,
    pub running: bool,
    pub last_error: Option<String>,
}

impl ScriptTab {
    pub fn new() -> Self {
        Self {
            source: builtins::TABS_FOR_ALL.trim().to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> String {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled.rhai".to_string())
    }

    fn push_log(&mut self, color: Color32, line: String) {
        self.log.push((color, line));
        if self.log.len() > MAX_LOG_LINES {
            let excess = self.log.len() - MAX_LOG_LINES;
            self.log.drain(..excess);
        }
    }

    /// Fold runner events into the tab status and log
    pub fn apply_event(&mut self, event: ScriptEvent) {
        match event {
            ScriptEvent::Started { name } => {
                self.running = true;
                self.last_error = None;
                self.push_log(Color32::GRAY, format!("▶ {}", name));
            }
            ScriptEvent::Finished { name } => {
                self.running = false;
                self.push_log(Color32::GRAY, format!("■ {} finished", name));
            }
            ScriptEvent::Error { name, message } => {
                self.running = false;
                self.push_log(Color32::RED, format!("✖ {}: {}", name, message));
                self.last_error = Some(message);
            }
            ScriptEvent::Output(line) => self.push_log(Color32::LIGHT_GRAY, line),
        }
    }

    /// Log the outcome of a syntax check
    pub fn apply_check(&mut self, result: Result<()>) {
        match result {
            Ok(()) => {
                self.last_error = None;
                self.push_log(Color32::GREEN, format!("✔ {} compiles", self.name()));
            }
            Err(e) => {
                let message = e.to_string();
                self.push_log(Color32::RED, format!("✖ {}", message));
                self.last_error = Some(message);
            }
        }
    }

    /// Render the tab; returns the action the user picked, if any
    pub fn show(&mut self, ui: &mut Ui) -> Option<ScriptAction> {
        let mut action = None;

        ui.horizontal(|ui| {
            if self.running {
                if ui.button("⏹ Stop").clicked() {
                    action = Some(ScriptAction::Stop);
                }
                ui.add(crate::frontend::widgets::StatusIndicator::running());
            } else {
                if ui.button("▶ Run").clicked() {
                    action = Some(ScriptAction::Run);
                }
                if ui.button("✔ Check").clicked() {
                    action = Some(ScriptAction::Check);
                }
                match &self.last_error {
                    Some(e) => {
                        ui.add(crate::frontend::widgets::StatusIndicator::failed().with_tooltip(e));
                    }
                    None => {
                        ui.add(crate::frontend::widgets::StatusIndicator::idle());
                    }
                }
            }
            ui.separator();
            if ui.button("Open...").clicked() {
                action = Some(ScriptAction::Open);
            }
            if ui.button("Save").clicked() {
                action = Some(ScriptAction::Save);
            }
            ui.menu_button("Examples", |ui| {
                for (name, source) in builtins::ALL {
                    if ui.button(*name).clicked() {
                        self.source = source.trim().to_string();
                        self.path = None;
                        ui.close();
                    }
                }
            });
            ui.separator();
            if ui.selectable_label(self.editor.show_help, "Help").clicked() {
                self.editor.show_help = !self.editor.show_help;
            }
            ui.label(RichText::new(self.name()).small().color(Color32::GRAY));
        });
        ui.separator();

        egui::TopBottomPanel::bottom("script_output")
            .resizable(true)
            .default_height(140.0)
            .show_inside(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("Output").strong());
                    if ui.small_button("Clear").clicked() {
                        self.log.clear();
                    }
                });
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        for (color, line) in &self.log {
                            ui.label(RichText::new(line).monospace().color(*color));
                        }
                    });
            });

        egui::CentralPanel::default().show_inside(ui, |ui| {
            ScriptEditor::new(&mut self.source, &mut self.editor).show(ui);
        });

        action
    }
}

/// Code editor widget
pub struct ScriptEditor<'a> {
    script: &'a mut String,
    state: &'a mut ScriptEditorState,
}

impl<'a> ScriptEditor<'a> {
    pub fn new(script: &'a mut String, state: &'a mut ScriptEditorState) -> Self {
        Self { script, state }
    }

    pub fn show(self, ui: &mut Ui) -> egui::Response {
        let Self { script, state } = self;

        ui.horizontal_top(|ui| {
            let mut layouter = |ui: &Ui, text: &dyn egui::TextBuffer, wrap_width: f32| {
                let mut job = highlight_rhai_script(text.as_str());
                job.wrap.max_width = wrap_width;
                ui.painter().layout_job(job)
            };

            let editor_width = if state.show_help {
                ui.available_width() - 320.0
            } else {
                ui.available_width()
            };

            let output = egui::ScrollArea::vertical()
                .id_salt("script_scroll")
                .max_width(editor_width)
                .show(ui, |ui| {
                    egui::TextEdit::multiline(script)
                        .code_editor()
                        .desired_width(editor_width)
                        .desired_rows(24)
                        .layouter(&mut layouter)
                        .show(ui)
                })
                .inner;
            let response = output.response;

            if response.changed() {
                if let Some(cursor) = output.cursor_range {
                    let pos = cursor.primary.index;
                    let word = extract_word_at_cursor(script, pos);
                    state.autocomplete_start_pos = pos - word.chars().count();
                    if word.len() >= 2 {
                        state.update_suggestions(&word);
                        state.autocomplete_open = !state.suggestions.is_empty();
                    } else {
                        state.autocomplete_open = false;
                    }
                    state.current_word = word;
                }
            }

            if state.autocomplete_open {
                handle_autocomplete_keys(ui, script, state);
            }

            if state.autocomplete_open && !state.suggestions.is_empty() {
                egui::Popup::from_response(&response)
                    .close_behavior(egui::PopupCloseBehavior::CloseOnClickOutside)
                    .show(|ui| {
                        egui::ScrollArea::vertical().max_height(200.0).show(ui, |ui| {
                            for (i, item) in state.suggestions.iter().enumerate() {
                                let fill = if i == state.selected_suggestion {
                                    ui.visuals().selection.bg_fill
                                } else {
                                    Color32::TRANSPARENT
                                };
                                egui::Frame::new().fill(fill).show(ui, |ui| {
                                    ui.horizontal(|ui| {
                                        ui.label(
                                            RichText::new(item.name)
                                                .color(item.category.color())
                                                .monospace(),
                                        );
                                        ui.label(
                                            RichText::new(item.description)
                                                .small()
                                                .color(Color32::GRAY),
                                        );
                                    });
                                });
                            }
                        });
                    });
            }

            if state.show_help {
                ui.separator();
                render_help_panel(ui);
            }

            response
        })
        .inner
    }
}

fn handle_autocomplete_keys(ui: &Ui, script: &mut String, state: &mut ScriptEditorState) {
    if ui.input(|i| i.key_pressed(egui::Key::ArrowDown)) {
        state.select_next();
    }
    if ui.input(|i| i.key_pressed(egui::Key::ArrowUp)) {
        state.select_prev();
    }
    if ui.input(|i| i.key_pressed(egui::Key::Tab)) {
        if let Some(item) = state.selected() {
            let completion = format!("{}(", item.name);
            let start = char_to_byte(script, state.autocomplete_start_pos);
            let end = char_to_byte(
                script,
                state.autocomplete_start_pos + state.current_word.chars().count(),
            );
            script.replace_range(start..end, &completion);
        }
        state.autocomplete_open = false;
    }
    if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
        state.autocomplete_open = false;
    }
}

fn char_to_byte(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

/// The identifier ending at `cursor_pos` (a char index)
fn extract_word_at_cursor(text: &str, cursor_pos: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let end = cursor_pos.min(chars.len());
    let mut start = end;
    while start > 0 {
        let c = chars[start - 1];
        if c.is_alphanumeric() || c == '_' {
            start -= 1;
        } else {
            break;
        }
    }
    chars[start..end].iter().collect()
}

fn render_help_panel(ui: &mut Ui) {
    egui::ScrollArea::vertical()
        .id_salt("script_help")
        .show(ui, |ui| {
            ui.set_min_width(300.0);
            for category in ScriptItemCategory::ALL {
                ui.collapsing(
                    RichText::new(category.label())
                        .strong()
                        .color(category.color()),
                    |ui| {
                        for item in SCRIPT_ITEMS.iter().filter(|i| i.category == category) {
                            ui.label(
                                RichText::new(item.signature)
                                    .monospace()
                                    .color(category.color()),
                            );
                            ui.label(RichText::new(item.description).small());
                            ui.add_space(2.0);
                        }
                    },
                );
            }
            ui.collapsing("Areas", |ui| {
                for area in crate::types::DockArea::ALL {
                    ui.monospace(format!("DockArea::{}", area));
                }
            });
        });
}

/// Color Rhai source for the editor
pub fn highlight_rhai_script(text: &str) -> LayoutJob {
    let font = FontId::monospace(13.0);
    let format = |color: Color32| TextFormat {
        font_id: font.clone(),
        color,
        ..Default::default()
    };
    let plain = format(Color32::LIGHT_GRAY);
    let keyword = format(Color32::from_rgb(86, 156, 214));
    let function = format(Color32::from_rgb(220, 220, 170));
    let number = format(Color32::from_rgb(181, 206, 168));
    let comment = format(Color32::from_rgb(106, 153, 85));
    let string = format(Color32::from_rgb(206, 145, 120));

    let word_format = |word: &str| {
        if KEYWORDS.contains(&word) {
            keyword.clone()
        } else if SCRIPT_ITEMS.iter().any(|i| i.name == word) {
            function.clone()
        } else if word.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '_') {
            number.clone()
        } else {
            plain.clone()
        }
    };

    let mut job = LayoutJob::default();
    let mut chars = text.chars().peekable();
    let mut word = String::new();

    while let Some(c) = chars.next() {
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
            continue;
        }
        if !word.is_empty() {
            job.append(&word, 0.0, word_format(&word));
            word.clear();
        }

        if c == '/' && chars.peek() == Some(&'/') {
            let mut line = String::from("/");
            while let Some(&next) = chars.peek() {
                if next == '\n' {
                    break;
                }
                line.push(next);
                chars.next();
            }
            job.append(&line, 0.0, comment.clone());
        } else if c == '"' {
            let mut lit = String::from("\"");
            while let Some(next) = chars.next() {
                lit.push(next);
                if next == '\\' {
                    if let Some(escaped) = chars.next() {
                        lit.push(escaped);
                    }
                } else if next == '"' {
                    break;
                }
            }
            job.append(&lit, 0.0, string.clone());
        } else {
            job.append(c.encode_utf8(&mut [0; 4]), 0.0, plain.clone());
        }
    }
    if !word.is_empty() {
        job.append(&word, 0.0, word_format(&word));
    }

    job
}

/// Read a script file for the editor
pub fn load_script(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(BenchVisError::from)
        .context(path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_logged() {
        let mut tab = ScriptTab::new();
        tab.apply_check(Err(BenchVisError::Script("bad token".into())));
        assert_eq!(tab.last_error.as_deref(), Some("Script error: bad token"));
        tab.apply_check(Ok(()));
        assert!(tab.last_error.is_none());
        assert_eq!(tab.log.len(), 2);
        assert!(tab.log[1].1.contains("untitled.rhai"));
    }

    #[test]
    fn test_extract_word_at_cursor() {
        assert_eq!(extract_word_at_cursor("device", 6), "device");
        assert_eq!(extract_word_at_cursor("let d = dev", 11), "dev");
        assert_eq!(extract_word_at_cursor("ui_add(", 6), "ui_add");
        assert_eq!(extract_word_at_cursor("", 0), "");
    }

    #[test]
    fn test_suggestions_filter() {
        let mut state = ScriptEditorState::default();
        state.update_suggestions("ui_add_p");
        let names: Vec<_> = state.suggestions.iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["ui_add_plot_view", "ui_add_power_panel_view"]);
    }

    #[test]
    fn test_suggestion_navigation_wraps() {
        let mut state = ScriptEditorState::default();
        state.update_suggestions("dev");
        let count = state.suggestions.len();
        assert!(count >= 3);
        state.select_prev();
        assert_eq!(state.selected_suggestion, count - 1);
        state.select_next();
        assert_eq!(state.selected_suggestion, 0);
    }

    #[test]
    fn test_highlight_preserves_text() {
        let source = "let x = device(\"psu:1\"); // note\nprint(x);";
        assert_eq!(highlight_rhai_script(source).text, source);
    }

    #[test]
    fn test_apply_events() {
        let mut tab = ScriptTab::new();
        tab.apply_event(ScriptEvent::Started { name: "a".into() });
        assert!(tab.running);
        tab.apply_event(ScriptEvent::Output("hello".into()));
        tab.apply_event(ScriptEvent::Error {
            name: "a".into(),
            message: "boom".into(),
        });
        assert!(!tab.running);
        assert_eq!(tab.last_error.as_deref(), Some("boom"));
        assert_eq!(tab.log.len(), 3);
    }

    #[test]
    fn test_log_is_bounded() {
        let mut tab = ScriptTab::new();
        for i in 0..(MAX_LOG_LINES + 10) {
            tab.apply_event(ScriptEvent::Output(i.to_string()));
        }
        assert_eq!(tab.log.len(), MAX_LOG_LINES);
        assert_eq!(tab.log[0].1, "10");
    }
}
