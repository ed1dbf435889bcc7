//! HTTP Game Server
//!
//! Axum router over the shared [`GameDriver`]. Every request locks the driver
//! for the duration of one operation, so moves and regenerations are applied
//! one at a time in arrival order.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Mutex;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use crate::config::DEFAULT_WEB_PORT;
use crate::driver::GameDriver;
use crate::network::protocol::{
    DeviceStatusResponse, ErrorResponse, MazeResponse, MoveResponse, NewMazeResponse,
};

/// Page served at `/`.
pub const INDEX_FILE: &str = "test.html";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Directory holding the browser front end.
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_WEB_PORT)),
            static_dir: PathBuf::from("frontend"),
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: SocketAddr,
        /// Underlying error
        source: std::io::Error,
    },

    /// The listener failed while serving.
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    driver: Arc<Mutex<GameDriver>>,
    static_dir: PathBuf,
}

impl AppState {
    /// Wrap a driver for sharing across requests.
    pub fn new(driver: GameDriver, static_dir: PathBuf) -> Self {
        Self {
            driver: Arc::new(Mutex::new(driver)),
            static_dir,
        }
    }

    /// The shared driver.
    pub fn driver(&self) -> &Arc<Mutex<GameDriver>> {
        &self.driver
    }
}

/// Build the router with all routes and middleware.
pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/", get(index))
        .route("/move/{direction}", get(move_player))
        .route("/api/new_maze", post(new_maze))
        .route("/api/maze", get(current_maze))
        .route("/api/device", get(device_status))
        .nest_service("/static", static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Response {
    let path = state.static_dir.join(INDEX_FILE);
    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            warn!("Cannot read {}: {}", path.display(), e);
            let body = ErrorResponse {
                error: format!("{} not found", INDEX_FILE),
            };
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
    }
}

async fn move_player(
    State(state): State<AppState>,
    Path(direction): Path<String>,
) -> Json<MoveResponse> {
    let report = state.driver.lock().await.attempt_move(&direction);
    Json(MoveResponse::from(report))
}

async fn new_maze(State(state): State<AppState>) -> Json<NewMazeResponse> {
    let snapshot = state.driver.lock().await.new_maze();
    Json(NewMazeResponse::from(snapshot))
}

async fn current_maze(State(state): State<AppState>) -> Json<MazeResponse> {
    let snapshot = state.driver.lock().await.snapshot();
    Json(MazeResponse::from(snapshot))
}

async fn device_status(State(state): State<AppState>) -> Json<DeviceStatusResponse> {
    let driver = state.driver.lock().await;
    let device = driver.device();
    Json(DeviceStatusResponse {
        mode: device.mode(),
        port: device.port().map(str::to_string),
        dropped: device.dropped(),
    })
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Shared handler state.
    state: AppState,
}

impl GameServer {
    /// Create a new game server around `driver`.
    pub fn new(config: ServerConfig, driver: GameDriver) -> Self {
        let state = AppState::new(driver, config.static_dir.clone());
        Self { config, state }
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Router for this server.
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Serve until Ctrl-C, then drain the device queue.
    #[instrument(skip(self), fields(addr = %self.config.bind_addr))]
    pub async fn run(self) -> Result<(), GameServerError> {
        let addr = self.config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GameServerError::Bind { addr, source })?;
        info!("Maze server listening on http://{}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        let device = self.state.driver.lock().await.device().clone();
        info!("Flushing device queue");
        device.flush().await;

        info!("Server shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
