//! Dialogs requested by scripts, and warning notices
//!
//! Only the front dialog of the executor's queue is shown. Closing the
//! window counts as cancel.

use crate::executor::{GuiExecutor, PendingDialog};
use egui::{Align2, Color32, Context, RichText};

enum Choice {
    Accept,
    Cancel,
}

/// Show the script dialog at the front of the queue, if any
pub fn render_bridge_dialog(ctx: &Context, executor: &mut GuiExecutor) {
    let queued = executor.pending_dialogs();
    let Some(dialog) = executor.current_dialog_mut() else {
        return;
    };

    let mut open = true;
    let mut choice = None;
    let title = dialog.title().to_string();

    egui::Window::new(title)
        .id(egui::Id::new("bridge_dialog"))
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
        .open(&mut open)
        .show(ctx, |ui| {
            let confirm_label = match dialog {
                PendingDialog::Message { text, .. } => {
                    ui.label(text.as_str());
                    "OK"
                }
                PendingDialog::StringInput { label, value, .. } => {
                    ui.label(label.as_str());
                    let response = ui.text_edit_singleline(value);
                    if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        choice = Some(Choice::Accept);
                    }
                    "OK"
                }
                PendingDialog::DoubleInput {
                    label,
                    value,
                    decimals,
                    step,
                    min,
                    max,
                    ..
                } => {
                    ui.label(label.as_str());
                    ui.add(
                        egui::DragValue::new(value)
                            .range(*min..=*max)
                            .speed(*step)
                            .fixed_decimals(*decimals as usize),
                    );
                    "OK"
                }
                PendingDialog::IntInput {
                    label,
                    value,
                    step,
                    min,
                    max,
                    ..
                } => {
                    ui.label(label.as_str());
                    ui.add(
                        egui::DragValue::new(value)
                            .range(*min..=*max)
                            .speed(*step as f64),
                    );
                    "OK"
                }
            };

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button(confirm_label).clicked() {
                    choice = Some(Choice::Accept);
                }
                if ui.button("Cancel").clicked() {
                    choice = Some(Choice::Cancel);
                }
                if queued > 1 {
                    ui.label(
                        RichText::new(format!("{} more waiting", queued - 1))
                            .small()
                            .color(Color32::GRAY),
                    );
                }
            });
        });

    if !open {
        choice = Some(Choice::Cancel);
    }
    match choice {
        Some(Choice::Accept) => executor.accept_dialog(),
        Some(Choice::Cancel) => executor.cancel_dialog(),
        None => {}
    }
}

/// Show warning notices stacked in the top right corner
pub fn render_notices(ctx: &Context, executor: &mut GuiExecutor) {
    let mut dismissed = None;
    for (i, notice) in executor.notices().iter().enumerate() {
        egui::Window::new(notice.title.as_str())
            .id(egui::Id::new(("notice", i)))
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::RIGHT_TOP, [-10.0, 40.0 + 90.0 * i as f32])
            .show(ctx, |ui| {
                ui.colored_label(Color32::YELLOW, notice.text.as_str());
                if ui.button("Dismiss").clicked() {
                    dismissed = Some(i);
                }
            });
    }
    if let Some(i) = dismissed {
        executor.dismiss_notice(i);
    }
}
