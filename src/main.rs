//! BenchVis - Main Entry Point
//!
//! Usage: `benchvis [SCRIPT]`. The optional Rhai script is loaded into the
//! script tab and run once the window is up.

use anyhow::Context as _;
use benchvis_rs::{
    config::{self, AppConfig},
    frontend::BenchVisApp,
};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(config: &AppConfig) -> Option<WorkerGuard> {
    let mut guard = None;
    let file_layer = if config.logging.file_logging {
        match config::ensure_app_data_dir() {
            Ok(dir) => {
                let appender =
                    tracing_appender::rolling::daily(dir.join(config::LOG_DIR), "benchvis.log");
                let (writer, g) = tracing_appender::non_blocking(appender);
                guard = Some(g);
                Some(fmt::layer().with_writer(writer).with_ansi(false))
            }
            Err(e) => {
                eprintln!("File logging disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,benchvis_rs=debug")),
        )
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

fn main() -> anyhow::Result<()> {
    let script = match std::env::args().nth(1) {
        Some(arg) if arg == "-h" || arg == "--help" => {
            println!("Usage: benchvis [SCRIPT]");
            return Ok(());
        }
        arg => arg.map(PathBuf::from),
    };

    let config = AppConfig::load_or_default();
    let _log_guard = init_logging(&config);

    tracing::info!("Starting BenchVis");
    if let Some(path) = &script {
        tracing::info!("Startup script: {}", path.display());
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("BenchVis"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "BenchVis",
        native_options,
        Box::new(|cc| {
            if config.ui.dark_mode {
                cc.egui_ctx.set_visuals(egui::Visuals::dark());
            } else {
                cc.egui_ctx.set_visuals(egui::Visuals::light());
            }
            Ok(Box::new(BenchVisApp::new(cc, config, script)))
        }),
    );

    tracing::info!("Shutting down...");
    result
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("GUI terminated with an error")
}
