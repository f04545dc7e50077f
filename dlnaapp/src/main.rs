//! Process entry point: load configuration, wire up logging, build and run
//! the DLNA MediaServer, then wait for Ctrl+C.

use dlnaserver::logs::{LogState, SseLayer};
use dlnaserver::DlnaServerBuilder;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = dlnaconfig::get_config();
    config.validate()?;

    // ========== Logging ==========
    let log_state = LogState::new(config.get_log_cache_size());
    let env_filter = EnvFilter::try_new(config.get_log_min_level())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(SseLayer::new(log_state.clone()));

    if config.get_log_enable_console() {
        registry.with(fmt::layer()).init();
    } else {
        registry.init();
    }

    info!("starting {} {}", config.get_app_name(), config.get_app_version());

    // ========== Build and start ==========
    let server = DlnaServerBuilder::new(config)
        .with_log_state(log_state)
        .build()
        .await?;
    info!(user_id = %server.user_id(), "catalog identity resolved");

    let handle = server.start().await?;
    info!("DLNA MediaServer is ready. Press Ctrl+C to stop...");

    handle.wait().await;

    info!("DLNA MediaServer stopped");
    Ok(())
}
