//! HTTP publication of the sensor snapshot.
//!
//! `GET /api/data` reads the store on every request and answers with the JSON
//! array of records. Every other path is served from the static directory.

use crate::collectors::sensor;
use crate::config::ServerConfig;
use crate::models::sensor::SensorRecord;
use crate::store::SensorStore;
use axum::extract::{ConnectInfo, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Local};
use log::{debug, error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

pub const DATA_PATH: &str = "/api/data";

/// How long open connections get to finish after a shutdown request.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("Failed to read listener address: {0}")]
    LocalAddr(io::Error),
}

pub fn router(store: Arc<dyn SensorStore>, static_dir: &str) -> Router {
    Router::new()
        .route(DATA_PATH, get(data_handler).layer(CorsLayer::permissive()))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(store)
}

async fn data_handler(
    State(store): State<Arc<dyn SensorStore>>,
    client: Option<ConnectInfo<SocketAddr>>,
) -> Json<Vec<SensorRecord>> {
    let client = client
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    info!("Data requested from {}", client);

    let records = tokio::task::spawn_blocking(move || sensor::collect(&*store))
        .await
        .unwrap_or_else(|e| {
            error!("Sensor read task failed: {}", e);
            Vec::new()
        });
    Json(records)
}

/// Handle to a bound listener serving on a background task.
///
/// Dropping the handle also asks the server to stop, but only
/// [`RunningServer::shutdown`] waits for the port to be released.
pub struct RunningServer {
    local_addr: SocketAddr,
    started_at: DateTime<Local>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RunningServer {
    /// Binds `config.address:config.port` and starts serving.
    ///
    /// Binding happens before this returns, so a port conflict is reported
    /// here and nothing keeps running.
    pub async fn start(config: &ServerConfig, store: Arc<dyn SensorStore>) -> Result<Self, ServerError> {
        let addr = format!("{}:{}", config.address, config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr: addr.clone(), source })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
        debug!("Listening on {}", local_addr);

        let app = router(store, &config.static_dir);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                error!("Server Error: {}", e);
            }
        });

        Ok(Self {
            local_addr,
            started_at: Local::now(),
            shutdown_tx: Some(shutdown_tx),
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// False once the serve loop has ended on its own.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops accepting, lets in-flight requests finish and releases the port.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        match tokio::time::timeout(SHUTDOWN_GRACE, &mut self.task).await {
            Ok(Ok(())) => debug!("Server on {} stopped", self.local_addr),
            Ok(Err(e)) => error!("Server task failed: {}", e),
            Err(_) => {
                warn!("Server on {} did not stop within {:?}, aborting", self.local_addr, SHUTDOWN_GRACE);
                self.task.abort();
                let _ = (&mut self.task).await;
            }
        }
    }
}
