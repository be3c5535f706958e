pub mod app;
pub mod collectors;
pub mod config;
pub mod control;
pub mod models;
pub mod server;
pub mod store;
pub mod utils;

use crate::app::App;
use crate::config::AppConfig;
use crate::control::ConsoleExit;
use anyhow::Context;
use log::info;
use std::path::PathBuf;

pub async fn run(config: AppConfig, config_path: PathBuf) -> anyhow::Result<()> {
    info!("Starting application");

    let store = store::from_config(&config.store).context("Failed to set up sensor store")?;
    info!("Reading sensors from {}", store.namespace());

    let mut app = App::new(config, config_path, store);
    // A bind failure is logged; the port can still be changed from the console.
    let _ = app.start().await;

    let lines = control::spawn_stdin_reader();
    let exit = tokio::select! {
        exit = control::run(&mut app, lines) => Some(exit),
        _ = tokio::signal::ctrl_c() => None,
    };

    if exit == Some(ConsoleExit::Eof) {
        info!("Console closed, serving until interrupted");
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
    }

    app.stop().await;
    info!("Application completed successfully");
    Ok(())
}
