//! Auto Angler - console front end
//!
//! Loads `config/settings.json` from the data directory, starts one fishing
//! session and prints its events until the session ends or Ctrl+C is pressed.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use auto_angler::input::EnigoDriver;
use auto_angler::utils::path::{get_data_dir, log_dir, settings_file};
use auto_angler::window::GameWindow;
use auto_angler::{
    Collaborators, FishingController, ScreenService, SessionConfig, Settings, StopOutcome,
};

const EVENT_POLL: Duration = Duration::from_millis(500);

fn init_logging(base: &Path) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // Default level 'info'; RUST_LOG overrides
    const LOG_FILTER: &str = "info,auto_angler=info";

    let log_dir = log_dir(base);
    let _ = std::fs::create_dir_all(&log_dir);
    let log_file_path = log_dir.join("debug.log");
    let file_result = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(LOG_FILTER));

    match file_result {
        Ok(file) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE);

            let stdout_layer = tracing_subscriber::fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(EnvFilter::new("warn"));

            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(stdout_layer)
                .init();

            tracing::info!("[INIT] Logging initialized, file: {:?}", log_file_path);
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new(LOG_FILTER))
                .init();
            eprintln!(
                "[INIT] Failed to create debug log file at {:?}: {}",
                log_file_path, e
            );
        }
    }
}

fn main() -> Result<()> {
    let base = get_data_dir();
    init_logging(&base);

    println!("Auto Angler {}", env!("CARGO_PKG_VERSION"));
    println!("================================");

    let settings_path = settings_file(&base);
    if !settings_path.exists() {
        Settings::default()
            .save(&settings_path)
            .context("Failed to write default settings")?;
        println!("Wrote default settings to {:?}", settings_path);
        println!("Set a cast key and at least one bobber image there, then run again.");
        return Ok(());
    }

    let settings = Settings::load(&settings_path);
    let config = SessionConfig::from_settings(&settings).context("Cannot start fishing")?;

    let collaborators = Collaborators {
        capturer: ScreenService::new(),
        driver: EnigoDriver::new()?,
        window: GameWindow::new(),
    };

    let mut controller = FishingController::new();
    let events = controller.start(config, collaborators)?;

    let stop_requested = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop_requested);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("Failed to install Ctrl+C handler")?;
    println!("Fishing started, press Ctrl+C to stop.");

    loop {
        match events.recv_timeout(EVENT_POLL) {
            Ok(event) => println!("{}", event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if stop_requested.load(Ordering::SeqCst) || !controller.is_active() {
            break;
        }
    }

    let outcome = controller.stop();
    for event in events.try_iter() {
        println!("{}", event);
    }
    tracing::info!("[CONTROL] Final status: {}", controller.status().to_json());

    match outcome {
        StopOutcome::Stopped(stats) => println!(
            "Session over: {} casts, {} bites, {} misses",
            stats.cycles, stats.catches, stats.misses
        ),
        StopOutcome::Abandoned => println!("Fishing worker did not stop cleanly."),
        StopOutcome::Panicked => println!("Fishing worker crashed, see the debug log."),
        StopOutcome::NotRunning => {}
    }

    Ok(())
}
