// fablepath entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Build the backend client
// 4. Create mpsc channels
// 5. Spawn app logic task
// 6. Run the TUI until the user quits
// 7. Cleanup on exit

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use fablepath_api::HttpStoryBackend;
use fablepath_app::{app, StoryClient};
use fablepath_core::config;
use fablepath_tui::tui;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("fablepath starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: backend={}, max_turns={}, timeout={:?}",
        config.backend.base_url,
        config.story.max_turns,
        config.backend.request_timeout()
    );

    let backend = HttpStoryBackend::from_config(&config.backend)
        .context("failed to build HTTP client")?;

    let (api_tx, api_rx) = mpsc::channel(16);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let client = StoryClient::new(Arc::new(backend), &config.story, ui_tx, api_tx);

    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, api_rx, client).await {
            error!("Application loop error: {}", e);
        }
    });

    // Blocks until the user quits.
    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {}", e);
    }

    // The TUI dropped its command sender, so the app loop is winding down.
    let _ = tokio::time::timeout(Duration::from_secs(5), app_handle).await;

    info!("fablepath shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("fablepath.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fablepath=info,warn")),
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
