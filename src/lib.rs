//! Live packet telemetry: a synthetic traffic generator, a rolling
//! aggregate store, a WebSocket publisher that pushes a snapshot to every
//! viewer each tick, and the viewer-side reconciler that turns those
//! snapshots into a per-minute history.

pub mod client;
pub mod config;
pub mod error;
pub mod generator;
pub mod models;
pub mod publisher;
pub mod reconciler;
pub mod store;

pub use error::{PipelineError, Result};
