// src/store.rs
//! Rolling aggregate state shared by every connection.
//!
//! `AggregationStore` is plain data with no interior locking. Connections
//! reach it through [`SharedStore`], which applies `record` and `snapshot`
//! under one lock so a frame never shows a half-applied tick.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::domain::{PacketEvent, Protocol};
use crate::models::dto::Snapshot;

pub const BANDWIDTH_CAPACITY: usize = 100;
pub const RECENT_CAPACITY: usize = 10;
pub const DEFAULT_MAX_DESTINATIONS: usize = 10_000;

#[derive(Debug)]
pub struct AggregationStore {
    total_count: u64,
    protocol_counts: HashMap<Protocol, u64>,
    destination_counts: HashMap<String, u64>,
    bandwidth_samples: VecDeque<u32>,
    recent_events: VecDeque<PacketEvent>,
    max_destinations: usize,
}

impl AggregationStore {
    pub fn new(max_destinations: usize) -> Self {
        AggregationStore {
            total_count: 0,
            protocol_counts: HashMap::new(),
            destination_counts: HashMap::new(),
            bandwidth_samples: VecDeque::with_capacity(BANDWIDTH_CAPACITY + 1),
            recent_events: VecDeque::with_capacity(RECENT_CAPACITY + 1),
            max_destinations: max_destinations.max(1),
        }
    }

    pub fn record(&mut self, event: PacketEvent) {
        self.total_count += 1;
        *self.protocol_counts.entry(event.protocol).or_insert(0) += 1;
        self.count_destination(event.destination.to_string());

        self.bandwidth_samples.push_back(event.size);
        if self.bandwidth_samples.len() > BANDWIDTH_CAPACITY {
            self.bandwidth_samples.pop_front();
        }

        self.recent_events.push_back(event);
        if self.recent_events.len() > RECENT_CAPACITY {
            self.recent_events.pop_front();
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            total_count: self.total_count,
            protocol_counts: self.protocol_counts.clone(),
            destination_counts: self.destination_counts.clone(),
            recent_events: self.recent_events.iter().cloned().collect(),
        }
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn bandwidth_samples(&self) -> impl Iterator<Item = u32> + '_ {
        self.bandwidth_samples.iter().copied()
    }

    pub fn average_bandwidth(&self) -> Option<f64> {
        if self.bandwidth_samples.is_empty() {
            return None;
        }
        let sum: u64 = self.bandwidth_samples.iter().map(|&s| s as u64).sum();
        Some(sum as f64 / self.bandwidth_samples.len() as f64)
    }

    fn count_destination(&mut self, destination: String) {
        if let Some(count) = self.destination_counts.get_mut(&destination) {
            *count += 1;
            return;
        }
        if self.destination_counts.len() >= self.max_destinations {
            self.evict_coldest_destination();
        }
        self.destination_counts.insert(destination, 1);
    }

    // Smallest count goes first, ties on the smaller address.
    fn evict_coldest_destination(&mut self) {
        let coldest = self
            .destination_counts
            .iter()
            .min_by(|(a_ip, a_n), (b_ip, b_n)| a_n.cmp(b_n).then_with(|| a_ip.cmp(b_ip)))
            .map(|(ip, _)| ip.clone());
        if let Some(ip) = coldest {
            self.destination_counts.remove(&ip);
        }
    }
}

impl Default for AggregationStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DESTINATIONS)
    }
}

/// Cloneable handle to the process-wide store. Owned by the server's
/// composition root and handed to each connection.
#[derive(Clone, Debug, Default)]
pub struct SharedStore {
    inner: Arc<Mutex<AggregationStore>>,
}

impl SharedStore {
    pub fn new(store: AggregationStore) -> Self {
        SharedStore {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// One tick: record the event and copy out the resulting state while
    /// holding the lock once.
    pub async fn record_and_snapshot(&self, event: PacketEvent) -> (Snapshot, Option<f64>) {
        let mut store = self.inner.lock().await;
        store.record(event);
        (store.snapshot(), store.average_bandwidth())
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.lock().await.snapshot()
    }

    pub async fn total_count(&self) -> u64 {
        self.inner.lock().await.total_count()
    }
}
