// draftsync entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open database
// 4. Build the HTTP fetcher and push-channel opener
// 5. Create AppState and restore the saved board
// 6. Create mpsc channels
// 7. Spawn app logic task
// 8. Run the console until the user quits
// 9. Cleanup on exit

mod console;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use draftsync_app::app;
use draftsync_core::config;
use draftsync_core::db::Database;
use draftsync_core::sources::channel::WsChannelOpener;
use draftsync_core::sources::http::HttpFetcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("draftsync starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: stream {}, refresh at {:?}",
        if config.stream.enabled { "on" } else { "off" },
        config.refresh.hours
    );

    // 3. Open database
    let db_path = config.db_path();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db = Database::open(&db_path.to_string_lossy()).context("failed to open database")?;
    info!("Database opened at {}", db_path.display());

    // 4. Network plumbing
    let fetcher = Arc::new(HttpFetcher::new().context("failed to build HTTP client")?);
    let opener = Arc::new(WsChannelOpener);

    // 5. Create the application state and restore the saved board
    let (mut app_state, channels) = app::AppState::new(config, Box::new(db), fetcher, opener);
    if app::recover_from_store(&mut app_state) {
        info!("Board restored from previous session");
    } else {
        info!("Starting with a fresh board");
    }

    // 6. Create mpsc channels
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    // 7. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, ui_tx, app_state, channels).await {
            error!("Application loop error: {e:#}");
        }
    });

    // 8. Run the console (blocks until the user quits or stdin closes)
    info!("Application ready");
    if let Err(e) = console::run(ui_rx, cmd_tx).await {
        error!("Console error: {e:#}");
    }

    // 9. Cleanup: wait for the app task to finish (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("draftsync shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file, keeping the terminal for the console.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("draftsync.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("draftsync=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
