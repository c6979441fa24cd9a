//! DevConsole demo host entry point.
//!
//! Runs a fixed-rate frame loop around a [`ConsoleApp`] so the console can be
//! driven from the local terminal (stdin) and from a remote tool over UDP.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()          -- HostConfig from the platform config dir
//!  └─ ConsoleApp::new()      -- timers, shell, built-ins
//!       ├─ ConsoleServer     (UDP network thread + session)
//!       ├─ preferences       (TOML store, debounced autosave)
//!       └─ host commands     (quit, uptime, timers, press)
//!  └─ frame loop
//!       ├─ tick              -> ConsoleApp::update_at(delta)
//!       ├─ stdin line        -> ConsoleApp::execute(line, manual = true)
//!       └─ Ctrl-C            -> shutdown
//! ```

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use console_core::assert::select_assert_handler;
use console_core::output::LogSink;
use console_host::application::console_app::ConsoleApp;
use console_host::application::host_commands::{host_commands, QuitFlag};
use console_host::infrastructure::network::ConsoleServer;
use console_host::infrastructure::storage::config::{self, HostConfig};
use console_host::infrastructure::storage::preferences::{
    open_or_default, preference_commands, SharedPreferences,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to load config ({e}); using defaults");
            HostConfig::default()
        }
    };

    // Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.console.log_level)),
        )
        .init();

    info!("DevConsole host '{}' starting", config.console.identity);

    let mut app = ConsoleApp::new(Box::new(LogSink), select_assert_handler())
        .with_history_capacity(config.console.history_size);

    // ── Console server ────────────────────────────────────────────────────────
    if config.network.enabled {
        match ConsoleServer::start(&config.network, &config.console.identity) {
            Ok(server) => app = app.with_transport(Box::new(server)),
            Err(e) => error!("remote console unavailable: {e}"),
        }
    }

    // ── Preferences ───────────────────────────────────────────────────────────
    let prefs_path = preferences_path(&config);
    let prefs = SharedPreferences::new(
        open_or_default(&prefs_path),
        config.preferences.autosave_delay_secs,
    );
    for descriptor in preference_commands(&prefs) {
        app.register_command(descriptor);
    }

    let quit = QuitFlag::new();
    for descriptor in host_commands(&quit) {
        app.register_command(descriptor);
    }

    app.execute_after_first_tick(config.console.startup_commands.clone());

    // ── Local terminal ────────────────────────────────────────────────────────
    let mut stdin_lines = spawn_stdin_reader().context("failed to start stdin reader")?;

    // ── Frame loop ────────────────────────────────────────────────────────────
    let rate = config.console.tick_rate_hz.max(1);
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(rate)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!("DevConsole host ready at {rate} Hz.  Type 'cmdlist' for commands, Ctrl-C to exit.");

    let mut last_tick = Instant::now();
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("shutdown signal received");
                break;
            }
            Some(line) = stdin_lines.recv() => {
                let _ = app.execute(&line, true);
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                let delta = now.duration_since(last_tick).as_secs_f64();
                last_tick = now;
                app.update_at(delta, now);
                if quit.is_requested() {
                    break;
                }
            }
        }
    }

    app.shutdown();
    prefs.flush();
    info!("DevConsole host stopped");
    Ok(())
}

/// Preferences live next to the config file, or in the working directory
/// when the platform has no config directory.
fn preferences_path(config: &HostConfig) -> PathBuf {
    match config::config_dir() {
        Ok(dir) => dir.join(&config.preferences.file_name),
        Err(e) => {
            warn!("{e}; keeping preferences in the working directory");
            PathBuf::from(&config.preferences.file_name)
        }
    }
}

/// Reads stdin on a plain thread; blocking reads must not hold up the runtime
/// at shutdown.
fn spawn_stdin_reader() -> std::io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("devconsole-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}
