use crate::api::ApiServer;
use crate::config::Config;
use crate::ledger::DurationRounding;
use crate::session::{RoomSession, SessionCommand, SessionStatusHandle, SessionTiming, StatusBoard};
use crate::sink::{AggregationSink, HttpSink};
use crate::store;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

pub async fn run_service() -> Result<()> {
    info!("Starting Airtime service");

    let config = Config::load()?;

    // Create the schema up front so the first snapshot push finds it.
    store::init_db()?;

    let (tx, rx) = mpsc::channel::<SessionCommand>(64);
    let status = SessionStatusHandle::default();
    let board = StatusBoard::default();

    let timing = SessionTiming {
        timeout_ms: config.tracker.timeout_ms as i64,
        tick_interval: Duration::from_millis(config.tracker.tick_interval_ms.max(100)),
        push_interval: Duration::from_secs(config.sink.push_interval_secs.max(1)),
        rounding: if config.tracker.round_to_seconds {
            DurationRounding::Seconds
        } else {
            DurationRounding::Milliseconds
        },
    };

    let sink: Arc<dyn AggregationSink> = Arc::new(HttpSink::new(&config.sink.endpoint));
    let session = RoomSession::new(
        timing,
        sink,
        Some(Arc::new(board.clone())),
        status.clone(),
    );

    let port = config.api.port;
    let api_server = ApiServer::new(tx, status, board, &config);
    tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server failed: {}", e);
        }
    });

    info!("Airtime is ready!");
    info!(
        "Start tracking: curl -X POST http://127.0.0.1:{}/session/start \
         -H 'Content-Type: application/json' -d '{{\"meetingName\":\"Weekly\",\"roomName\":\"Room 1\"}}'",
        port
    );
    info!(
        "Feed events:   curl -X POST http://127.0.0.1:{}/events \
         -H 'Content-Type: application/json' -d '{{\"activeSpeakerId\":\"user-1\"}}'",
        port
    );

    // The API server holds the only sender, so this runs for the service's
    // lifetime and flushes any open session when the channel closes.
    session.run(rx).await;

    Ok(())
}
