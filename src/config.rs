use clap::Args;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::error::{PipelineError, Result};
use crate::store::DEFAULT_MAX_DESTINATIONS;

pub const DEFAULT_PORT: u16 = 5000;

#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, env = "PKTSTREAM_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Publish period per connection, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub tick_ms: u64,

    /// Most destination addresses tracked before the coldest is evicted.
    #[arg(long, default_value_t = DEFAULT_MAX_DESTINATIONS)]
    pub max_destinations: usize,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            return Err(PipelineError::Config("--tick-ms must be greater than zero".into()));
        }
        if self.max_destinations == 0 {
            return Err(PipelineError::Config(
                "--max-destinations must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            tick_ms: 1000,
            max_destinations: DEFAULT_MAX_DESTINATIONS,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ClientConfig {
    /// Feed to subscribe to.
    #[arg(long, env = "PKTSTREAM_URL", default_value = "ws://localhost:5000")]
    pub url: String,

    /// Fixed delay before each reconnect attempt, in seconds.
    #[arg(long, default_value_t = 5)]
    pub backoff_secs: u64,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.backoff_secs == 0 {
            return Err(PipelineError::Config("--backoff-secs must be greater than zero".into()));
        }
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(PipelineError::Config(format!(
                "feed url must use ws:// or wss://, got {}",
                self.url
            )));
        }
        Ok(())
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}
