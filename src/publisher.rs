// src/publisher.rs
//! Viewer-facing side of the feed. Every WebSocket connection gets its own
//! session task with its own timer; all sessions feed the same store.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::config::ServerConfig;
use crate::error::{PipelineError, Result};
use crate::generator::{EventSource, PacketGenerator};
use crate::store::{AggregationStore, SharedStore};

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub tick: Duration,
    // Upgraded sockets outlive hyper's graceful shutdown, so sessions watch
    // this instead.
    stop: Arc<watch::Sender<bool>>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        let (stop, _) = watch::channel(false);
        AppState {
            store: SharedStore::new(AggregationStore::new(config.max_destinations)),
            tick: config.tick(),
            stop: Arc::new(stop),
        }
    }

    /// Tells every open session to send a close frame and stop its timer.
    pub fn stop_sessions(&self) {
        self.stop.send_replace(true);
    }

    fn session_stop(&self) -> watch::Receiver<bool> {
        self.stop.subscribe()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/", get(ws_handler)).with_state(state)
}

pub async fn serve<F>(config: &ServerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.validate()?;
    let listener = TcpListener::bind(config.addr())?;
    serve_listener(listener, AppState::new(config), shutdown).await
}

/// Runs the publisher on an already-bound listener until `shutdown` resolves.
pub async fn serve_listener<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    listener.set_nonblocking(true)?;
    let addr = listener.local_addr()?;
    info!(%addr, tick_ms = state.tick.as_millis() as u64, "stream publisher listening");

    let sessions = state.clone();
    axum::Server::from_tcp(listener)
        .map_err(|e| PipelineError::Serve(e.to_string()))?
        .serve(router(state).into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            shutdown.await;
            sessions.stop_sessions();
        })
        .await
        .map_err(|e| PipelineError::Serve(e.to_string()))
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, peer, state))
}

#[instrument(skip(socket, state), name = "viewer")]
async fn handle_socket(mut socket: WebSocket, peer: SocketAddr, state: AppState) {
    info!("viewer connected");
    let source = PacketGenerator::from_entropy();
    let stop = state.session_stop();
    match run_session(&mut socket, &state.store, source, state.tick, stop).await {
        Ok(frames) => info!(frames, "viewer disconnected"),
        Err(e) => warn!("viewer session ended: {}", e),
    }
}

/// Drives one connection until it closes or `stop` flips. Each tick
/// generates one event, records it in the shared store and pushes the
/// resulting snapshot. On stop the viewer gets a close frame.
///
/// The timer lives on this task's stack, so it is gone as soon as the
/// function returns, whether the viewer closed cleanly or the send failed.
/// Returns the number of frames written.
pub async fn run_session<T, S>(
    transport: &mut T,
    store: &SharedStore,
    mut source: S,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) -> Result<u64>
where
    T: Stream<Item = std::result::Result<Message, axum::Error>>
        + Sink<Message, Error = axum::Error>
        + Unpin,
    S: EventSource,
{
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut frames = 0u64;
    if *stop.borrow() {
        return Ok(frames);
    }

    loop {
        tokio::select! {
            // A close that is already waiting wins over a due tick.
            biased;

            _ = stop.changed() => {
                let _ = transport.send(Message::Close(None)).await;
                break;
            }

            inbound = transport.next() => match inbound {
                None | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            _ = ticker.tick() => {
                let event = source.next_event();
                let (snapshot, avg_bandwidth) = store.record_and_snapshot(event).await;
                debug!(total = snapshot.total_count, ?avg_bandwidth, "publishing frame");
                let frame = snapshot.to_json()?;
                transport.send(Message::Text(frame)).await?;
                frames += 1;
            }
        }
    }

    Ok(frames)
}
