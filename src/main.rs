use env_logger::{Builder, WriteStyle};
use hwinfo_bridge::config::{AppConfig, DEFAULT_CONFIG_FILE};
use log::error;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    // Load configuration first (without logging)
    let config = AppConfig::load_or_default(&config_path).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {:#}", e);
        // Fall back to default configuration
        AppConfig::default()
    });

    // Initialise logger with a configured log level
    Builder::new()
        .filter_level(config.get_log_level())
        .write_style(WriteStyle::Always)
        .format_timestamp_secs()
        .init();

    if let Err(e) = hwinfo_bridge::run(config, config_path).await {
        error!("Application error: {}", e);
        // Print chain of error causes
        let mut source = e.source();
        while let Some(cause) = source {
            error!("Caused by: {}", cause);
            source = cause.source();
        }
        return Err(e);
    }
    Ok(())
}
