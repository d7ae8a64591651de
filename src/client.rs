// src/client.rs
//! Viewer side of the feed: keeps a connection up with a fixed retry delay
//! and folds every frame into a [`Dashboard`].

use futures::StreamExt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::reconciler::{Dashboard, FrameOutcome};

type FeedStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

enum SessionEnd {
    Closed,
    Shutdown,
}

pub struct FeedClient {
    url: String,
    backoff: Duration,
    state: ConnectionState,
    dashboard: Dashboard,
}

impl FeedClient {
    pub fn new(url: impl Into<String>, backoff: Duration) -> Self {
        FeedClient {
            url: url.into(),
            backoff,
            state: ConnectionState::Disconnected,
            dashboard: Dashboard::new(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.url.clone(), config.backoff())
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    /// Connects, reads, and after any disconnect waits the fixed backoff
    /// before trying again. There is no retry limit. Returns once `shutdown`
    /// flips to true or its sender is dropped; a pending retry is abandoned.
    ///
    /// `on_frame` runs after every applied frame. The dashboard keeps its
    /// last snapshot while disconnected.
    pub async fn run<F>(&mut self, mut shutdown: watch::Receiver<bool>, mut on_frame: F)
    where
        F: FnMut(&Dashboard),
    {
        while !*shutdown.borrow() {
            self.transition(ConnectionState::Connecting);
            let connected = tokio::select! {
                res = connect_async(self.url.as_str()) => res,
                _ = shutdown.changed() => break,
            };

            match connected {
                Ok((stream, _)) => {
                    self.transition(ConnectionState::Connected);
                    match self.read_frames(stream, &mut shutdown, &mut on_frame).await {
                        Ok(SessionEnd::Shutdown) => break,
                        Ok(SessionEnd::Closed) => info!(url = %self.url, "feed closed"),
                        Err(e) => warn!(url = %self.url, "feed dropped: {}", e),
                    }
                }
                Err(e) => warn!(url = %self.url, "connect failed: {}", e),
            }

            self.transition(ConnectionState::Disconnected);
            info!(backoff_ms = self.backoff.as_millis() as u64, "scheduling reconnect");
            tokio::select! {
                _ = time::sleep(self.backoff) => {}
                _ = shutdown.changed() => break,
            }
        }

        self.transition(ConnectionState::Disconnected);
    }

    async fn read_frames<F>(
        &mut self,
        mut stream: FeedStream,
        shutdown: &mut watch::Receiver<bool>,
        on_frame: &mut F,
    ) -> Result<SessionEnd>
    where
        F: FnMut(&Dashboard),
    {
        loop {
            tokio::select! {
                msg = stream.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.apply(&text, on_frame),
                    Some(Ok(Message::Binary(bytes))) => {
                        self.apply(&String::from_utf8_lossy(&bytes), on_frame)
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::Closed),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },
                _ = shutdown.changed() => {
                    let _ = stream.close(None).await;
                    return Ok(SessionEnd::Shutdown);
                }
            }
        }
    }

    fn apply<F>(&mut self, text: &str, on_frame: &mut F)
    where
        F: FnMut(&Dashboard),
    {
        if self.dashboard.apply_text(text) == FrameOutcome::Applied {
            on_frame(&self.dashboard);
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            info!(url = %self.url, from = ?self.state, to = ?next, "feed state");
            self.state = next;
        }
    }
}
