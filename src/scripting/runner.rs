//! Script worker thread
//!
//! One script runs at a time. The GUI submits scripts with
//! [`ScriptRunner::run_script`] and polls [`ScriptRunner::drain_events`] once
//! per frame.

use super::{ScriptEngine, ScriptEvent};
use crate::bridge::UiBridge;
use crate::config::ScriptConfig;
use crate::error::{BenchVisError, Result};
use crate::registry::Registry;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

enum RunnerCommand {
    Run { name: String, source: String },
    Shutdown,
}

/// Handle to the script worker thread
pub struct ScriptRunner {
    command_tx: Sender<RunnerCommand>,
    event_rx: Receiver<ScriptEvent>,
    running: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    checker: ScriptEngine,
    handle: Option<JoinHandle<()>>,
}

impl ScriptRunner {
    /// Start the worker. The bridge should be a fresh context so the
    /// script's blocking calls do not share state with anyone else.
    pub fn spawn(registry: Registry, bridge: UiBridge, config: ScriptConfig) -> Result<Self> {
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let running = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));

        let checker = ScriptEngine::new(registry.clone(), bridge.new_context(), &config);
        let worker_running = running.clone();
        let worker_stop = stop.clone();
        let handle = std::thread::Builder::new()
            .name("script-runner".into())
            .spawn(move || {
                let mut engine = ScriptEngine::new(registry, bridge, &config);
                engine.set_output(event_tx.clone());
                engine.set_stop_flag(worker_stop);
                run_loop(&engine, &command_rx, &event_tx, &worker_running);
                tracing::debug!("Script runner stopped");
            })?;

        Ok(Self {
            command_tx,
            event_rx,
            running,
            stop,
            checker,
            handle: Some(handle),
        })
    }

    /// Queue a script; false if one is already running
    pub fn run_script(&self, name: impl Into<String>, source: impl Into<String>) -> bool {
        if self.running.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.stop.store(false, Ordering::Release);
        let command = RunnerCommand::Run {
            name: name.into(),
            source: source.into(),
        };
        if self.command_tx.send(command).is_err() {
            self.running.store(false, Ordering::Release);
            return false;
        }
        true
    }

    /// Read a script file and queue it
    pub fn run_file(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| BenchVisError::from(e).with_context(path.display().to_string()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(self.run_script(name, source))
    }

    /// Compile a script without running it
    pub fn check(&self, source: &str) -> Result<()> {
        self.checker.validate(source)
    }

    /// Ask the running script to abort at its next operation
    ///
    /// A script blocked in a UI call stops once that call returns.
    pub fn stop(&self) {
        if self.is_running() {
            self.stop.store(true, Ordering::Release);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Collect every event reported since the last call
    pub fn drain_events(&self) -> Vec<ScriptEvent> {
        self.event_rx.try_iter().collect()
    }

    /// Stop the worker and wait for it to exit
    pub fn shutdown(mut self) {
        self.request_shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn request_shutdown(&self) {
        self.stop.store(true, Ordering::Release);
        let _ = self.command_tx.send(RunnerCommand::Shutdown);
    }
}

impl Drop for ScriptRunner {
    fn drop(&mut self) {
        // Not joined: the worker may be parked in a UI call without timeout
        self.request_shutdown();
    }
}

fn run_loop(
    engine: &ScriptEngine,
    commands: &Receiver<RunnerCommand>,
    events: &Sender<ScriptEvent>,
    running: &AtomicBool,
) {
    while let Ok(command) = commands.recv() {
        let (name, source) = match command {
            RunnerCommand::Run { name, source } => (name, source),
            RunnerCommand::Shutdown => break,
        };

        tracing::info!("Running script {}", name);
        let _ = events.send(ScriptEvent::Started { name: name.clone() });

        let event = match engine.run(&source) {
            Ok(()) => ScriptEvent::Finished { name },
            Err(e) => {
                tracing::error!("Script {} failed: {}", name, e);
                ScriptEvent::Error {
                    name,
                    message: e.to_string(),
                }
            }
        };
        let _ = events.send(event);
        running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_idle(runner: &ScriptRunner) -> Vec<ScriptEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while runner.is_running() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        runner.drain_events()
    }

    fn runner() -> ScriptRunner {
        let (bridge, _endpoint) = UiBridge::new();
        ScriptRunner::spawn(Registry::new(), bridge, ScriptConfig::default()).unwrap()
    }

    #[test]
    fn test_events_for_successful_script() {
        let runner = runner();
        assert!(runner.run_script("ok", r#"print("hi");"#));
        let events = wait_idle(&runner);
        assert_eq!(
            events,
            vec![
                ScriptEvent::Started { name: "ok".into() },
                ScriptEvent::Output("hi".into()),
                ScriptEvent::Finished { name: "ok".into() },
            ]
        );
        runner.shutdown();
    }

    #[test]
    fn test_error_event() {
        let runner = runner();
        assert!(runner.run_script("bad", "throw \"boom\";"));
        let events = wait_idle(&runner);
        assert!(matches!(
            events.last(),
            Some(ScriptEvent::Error { name, message }) if name == "bad" && message.contains("boom")
        ));
        runner.shutdown();
    }

    #[test]
    fn test_one_script_at_a_time() {
        let runner = runner();
        assert!(runner.run_script("long", "sleep(200);"));
        assert!(!runner.run_script("second", "1"));
        wait_idle(&runner);
        assert!(runner.run_script("third", "1"));
        runner.shutdown();
    }

    #[test]
    fn test_stop_aborts_loop() {
        let runner = runner();
        assert!(runner.run_script("spin", "loop { }"));
        std::thread::sleep(Duration::from_millis(20));
        runner.stop();
        let events = wait_idle(&runner);
        assert!(!runner.is_running());
        assert!(matches!(events.last(), Some(ScriptEvent::Error { .. })));
        runner.shutdown();
    }

    #[test]
    fn test_stop_right_after_start() {
        let runner = runner();
        assert!(runner.run_script("loop", "loop { }"));
        runner.stop();
        let events = wait_idle(&runner);
        assert!(!runner.is_running());
        assert!(matches!(
            events.last(),
            Some(ScriptEvent::Error { name, .. }) if name == "loop"
        ));
        runner.shutdown();
    }

    #[test]
    fn test_stop_interrupts_sleep() {
        let runner = runner();
        assert!(runner.run_script("nap", "sleep(60000);"));
        std::thread::sleep(Duration::from_millis(50));
        let stopped_at = Instant::now();
        runner.stop();
        let events = wait_idle(&runner);
        assert!(stopped_at.elapsed() < Duration::from_secs(1));
        assert!(matches!(
            events.last(),
            Some(ScriptEvent::Error { message, .. }) if message.contains("stopped")
        ));
        runner.shutdown();
    }

    #[test]
    fn test_check_does_not_run() {
        let runner = runner();
        assert!(runner.check("print(\"hi\");").is_ok());
        assert!(runner.check("let x = ;").is_err());
        assert!(!runner.is_running());
        assert!(runner.drain_events().is_empty());
        runner.shutdown();
    }

    #[test]
    fn test_run_missing_file() {
        let runner = runner();
        assert!(runner.run_file("/nonexistent/script.rhai").is_err());
        runner.shutdown();
    }
}
