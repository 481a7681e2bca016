//! REST API server for Airtime.
//!
//! Provides HTTP endpoints for:
//! - Session control (start, stop, status)
//! - Speaker-event and participant-status ingest
//! - Snapshot ingest from room collectors
//! - Aggregated stats queries by meeting name

pub mod error;
pub mod routes;

use crate::config::{Config, SessionConfig};
use crate::session::{SessionCommand, SessionStatusHandle, StatusBoard};
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tracing::info;

/// Shared state for session-facing routes.
#[derive(Clone)]
pub struct SessionApiState {
    pub tx: tokio::sync::mpsc::Sender<SessionCommand>,
    pub status: SessionStatusHandle,
    pub board: StatusBoard,
    pub defaults: SessionConfig,
}

pub struct ApiServer {
    port: u16,
    session_state: SessionApiState,
}

impl ApiServer {
    pub fn new(
        tx: tokio::sync::mpsc::Sender<SessionCommand>,
        status: SessionStatusHandle,
        board: StatusBoard,
        config: &Config,
    ) -> Self {
        Self {
            port: config.api.port,
            session_state: SessionApiState {
                tx,
                status,
                board,
                defaults: config.session.clone(),
            },
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            .route("/", get(status))
            .route("/version", get(version))
            .merge(routes::session::router(self.session_state.clone()))
            .merge(routes::events::router(self.session_state))
            .merge(routes::stats::router())
            .layer(ServiceBuilder::new());

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /                        - Service info");
        info!("  GET  /version                 - Version info");
        info!("  POST /session/start           - Start tracking a room");
        info!("  POST /session/stop            - Stop tracking and flush");
        info!("  GET  /session/status          - Current session state");
        info!("  POST /events                  - Raw speaker-change payload");
        info!("  POST /participants/status     - Explicit participant state");
        info!("  POST /rooms/:id/stats         - Snapshot ingest (sink target)");
        info!("  GET  /meetings/:name/stats    - Aggregated stats by meeting");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "airtime",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "airtime"
    }))
}
