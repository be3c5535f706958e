use crate::config::{parse_port, AppConfig, ConfigError};
use crate::server::{RunningServer, ServerError};
use crate::store::SensorStore;
use crate::utils::net::local_ip;
use chrono::{DateTime, Local};
use log::{error, info, warn};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    Stopped,
    Running { addr: SocketAddr, since: DateTime<Local> },
}

/// Owns the configuration, the sensor store and the listener handle.
///
/// `start`, `stop` and `apply_port` are the only operations that change the
/// server state, and they all take `&mut self`, so a single control task
/// drives them in order.
pub struct App {
    config: AppConfig,
    config_path: PathBuf,
    store: Arc<dyn SensorStore>,
    server: Option<RunningServer>,
}

impl App {
    pub fn new(config: AppConfig, config_path: impl Into<PathBuf>, store: Arc<dyn SensorStore>) -> Self {
        Self {
            config,
            config_path: config_path.into(),
            store,
            server: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn status(&self) -> ServerStatus {
        match &self.server {
            Some(server) if server.is_running() => ServerStatus::Running {
                addr: server.local_addr(),
                since: server.started_at(),
            },
            _ => ServerStatus::Stopped,
        }
    }

    /// Starts the server unless one is already running. A bind failure is
    /// logged and leaves the server stopped.
    pub async fn start(&mut self) -> Result<SocketAddr, ServerError> {
        if let ServerStatus::Running { addr, .. } = self.status() {
            return Ok(addr);
        }
        // A serve loop that died on its own still holds a handle.
        if let Some(dead) = self.server.take() {
            dead.shutdown().await;
        }

        let server_config = self.config.server.clone();
        match RunningServer::start(&server_config, self.store.clone()).await {
            Ok(server) => {
                let addr = server.local_addr();
                info!("Server started on port {}", addr.port());
                info!("Server Active at http://{}:{}", local_ip(), addr.port());
                self.server = Some(server);
                Ok(addr)
            }
            Err(e) => {
                error!("Server Error: {}", e);
                Err(e)
            }
        }
    }

    /// Returns whether a server was running.
    pub async fn stop(&mut self) -> bool {
        match self.server.take() {
            Some(server) => {
                info!("Stopping server...");
                server.shutdown().await;
                true
            }
            None => false,
        }
    }

    /// Validates `input`, persists the new port and restarts the server on it.
    ///
    /// Invalid input changes nothing. The old listener is fully shut down
    /// before the new one binds.
    pub async fn apply_port(&mut self, input: &str) -> Result<SocketAddr, ApplyError> {
        let port = parse_port(input).map_err(|e| {
            warn!("Invalid port number! ({})", e);
            e
        })?;

        self.config.server.port = port;
        if let Err(e) = self.config.save(&self.config_path) {
            warn!("Could not persist port {}: {:#}", port, e);
        }

        self.stop().await;
        Ok(self.start().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sensor::RawEntry;
    use crate::store::MemoryStore;
    use tempfile::{tempdir, TempDir};
    use tokio::net::TcpListener;

    async fn free_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    async fn test_app(port: u16) -> (App, TempDir) {
        let dir = tempdir().unwrap();
        let mut config = AppConfig::default();
        config.server.address = "127.0.0.1".to_string();
        config.server.port = port;
        let store = Arc::new(MemoryStore::new(vec![RawEntry::new("Value0", "42")]));
        (App::new(config, dir.path().join("config.ini"), store), dir)
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let port = free_port().await;
        let (mut app, _dir) = test_app(port).await;
        assert_eq!(app.status(), ServerStatus::Stopped);

        let addr = app.start().await.unwrap();
        assert_eq!(addr.port(), port);
        assert!(matches!(app.status(), ServerStatus::Running { .. }));

        // Starting twice keeps the same listener.
        assert_eq!(app.start().await.unwrap(), addr);

        assert!(app.stop().await);
        assert_eq!(app.status(), ServerStatus::Stopped);
        assert!(!app.stop().await);
    }

    #[tokio::test]
    async fn test_apply_port_moves_listener() {
        let first = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let second = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let old_port = first.local_addr().unwrap().port();
        let new_port = second.local_addr().unwrap().port();
        drop((first, second));
        let (mut app, dir) = test_app(old_port).await;
        app.start().await.unwrap();

        let addr = app.apply_port(&new_port.to_string()).await.unwrap();
        assert_eq!(addr.port(), new_port);
        assert_eq!(app.config().server.port, new_port);

        // Old port is released, new port is taken by us.
        assert!(TcpListener::bind(("127.0.0.1", old_port)).await.is_ok());
        assert!(TcpListener::bind(("127.0.0.1", new_port)).await.is_err());

        let saved = AppConfig::from_file(dir.path().join("config.ini")).unwrap();
        assert_eq!(saved.server.port, new_port);

        app.stop().await;
    }

    #[tokio::test]
    async fn test_invalid_port_keeps_server_running() {
        let port = free_port().await;
        let (mut app, dir) = test_app(port).await;
        let addr = app.start().await.unwrap();

        let result = app.apply_port("80eighty").await;
        assert!(matches!(result, Err(ApplyError::Config(ConfigError::InvalidPort(_)))));
        assert_eq!(app.config().server.port, port);
        assert!(matches!(app.status(), ServerStatus::Running { addr: running, .. } if running == addr));
        assert!(!dir.path().join("config.ini").exists());

        app.stop().await;
    }

    #[tokio::test]
    async fn test_bind_failure_leaves_server_stopped() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();
        let (mut app, _dir) = test_app(port).await;

        assert!(app.start().await.is_err());
        assert_eq!(app.status(), ServerStatus::Stopped);
    }
}
