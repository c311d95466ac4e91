//! Stand-ins for the GUI thread

use super::long_timeout;
use benchvis_rs::executor::PendingDialog;
use benchvis_rs::GuiExecutor;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// What the fake user does with the front dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogAnswer {
    Accept,
    Cancel,
    /// Leave it open
    Ignore,
}

/// Run `work` on a script thread while this thread plays the GUI
///
/// The executor is pumped until the thread finishes. Each queued dialog is
/// passed to `answer` once, which may edit it before it is accepted or
/// canceled.
pub fn run_with_gui<T, F, A>(executor: &mut GuiExecutor, work: F, mut answer: A) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
    A: FnMut(&mut PendingDialog) -> DialogAnswer,
{
    let handle = thread::spawn(work);
    pump_until_finished(executor, &handle, |exec| {
        if let Some(dialog) = exec.current_dialog_mut() {
            match answer(dialog) {
                DialogAnswer::Accept => exec.accept_dialog(),
                DialogAnswer::Cancel => exec.cancel_dialog(),
                DialogAnswer::Ignore => {}
            }
        }
    });
    handle.join().expect("script thread panicked")
}

/// Pump `executor` like a frame loop until `handle` finishes
pub fn pump_until_finished<T>(
    executor: &mut GuiExecutor,
    handle: &JoinHandle<T>,
    mut per_frame: impl FnMut(&mut GuiExecutor),
) {
    let deadline = Instant::now() + long_timeout();
    while !handle.is_finished() {
        assert!(Instant::now() < deadline, "script thread did not finish");
        executor.process_pending();
        per_frame(executor);
        thread::sleep(Duration::from_millis(1));
    }
    executor.process_pending();
}

/// Pump `executor` until `done` returns true
pub fn pump_until(executor: &mut GuiExecutor, mut done: impl FnMut(&mut GuiExecutor) -> bool) {
    let deadline = Instant::now() + long_timeout();
    loop {
        executor.process_pending();
        if done(executor) {
            return;
        }
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(1));
    }
}
