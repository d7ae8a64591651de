// src/reconciler.rs
//! Client-side folding of incoming frames into a longer-lived view.

use chrono::{DateTime, Local, TimeZone};
use std::fmt;
use tracing::warn;

use crate::models::domain::Protocol;
use crate::models::dto::Snapshot;

pub const MAX_BUCKETS: usize = 60;
pub const TOP_DESTINATIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinuteBucket {
    /// Wall-clock minute, `HH:MM`.
    pub minute: String,
    pub count: u64,
}

pub fn minute_label<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    at.format("%H:%M").to_string()
}

/// Per-minute packet counts, sorted by label and capped at [`MAX_BUCKETS`].
#[derive(Debug, Clone, Default)]
pub struct MinuteSeries {
    buckets: Vec<MinuteBucket>,
}

impl MinuteSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buckets(&self) -> &[MinuteBucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Adds `count` to the bucket for `minute`, creating it if needed, then
    /// re-sorts and drops the oldest buckets beyond the cap.
    pub fn merge(&mut self, minute: &str, count: u64) {
        match self.buckets.iter_mut().find(|b| b.minute == minute) {
            Some(bucket) => bucket.count += count,
            None => self.buckets.push(MinuteBucket {
                minute: minute.to_string(),
                count,
            }),
        }

        self.buckets.sort_by(|a, b| a.minute.cmp(&b.minute));
        if self.buckets.len() > MAX_BUCKETS {
            let excess = self.buckets.len() - MAX_BUCKETS;
            self.buckets.drain(..excess);
        }
    }

    /// Only the frame's recent-event count is added, so a second with more
    /// than ten events is under-counted.
    pub fn merge_snapshot(&mut self, snapshot: &Snapshot, minute: &str) {
        self.merge(minute, snapshot.recent_events.len() as u64);
    }

    /// First bucket holding the highest count.
    pub fn peak(&self) -> Option<&MinuteBucket> {
        let max = self.buckets.iter().map(|b| b.count).max()?;
        self.buckets.iter().find(|b| b.count == max)
    }

    /// First bucket holding the lowest count.
    pub fn trough(&self) -> Option<&MinuteBucket> {
        let min = self.buckets.iter().map(|b| b.count).min()?;
        self.buckets.iter().find(|b| b.count == min)
    }
}

/// Display helper for peak/trough lines.
pub struct Extreme<'a>(pub Option<&'a MinuteBucket>);

impl fmt::Display for Extreme<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(bucket) => write!(f, "{} packets at {}", bucket.count, bucket.minute),
            None => f.write_str("no data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolShare {
    pub protocol: Protocol,
    pub count: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationCount {
    pub address: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Applied,
    Discarded,
}

/// Everything a viewer keeps between frames: the last good snapshot and
/// the minute series built from all frames so far.
#[derive(Debug, Default)]
pub struct Dashboard {
    latest: Snapshot,
    series: MinuteSeries,
    frames_applied: u64,
    frames_discarded: u64,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> &Snapshot {
        &self.latest
    }

    pub fn series(&self) -> &MinuteSeries {
        &self.series
    }

    pub fn frames_applied(&self) -> u64 {
        self.frames_applied
    }

    pub fn frames_discarded(&self) -> u64 {
        self.frames_discarded
    }

    pub fn apply_text(&mut self, text: &str) -> FrameOutcome {
        self.apply_text_at(text, &Local::now())
    }

    /// Parses and folds one frame. A frame that does not parse leaves the
    /// dashboard untouched.
    pub fn apply_text_at<Tz: TimeZone>(&mut self, text: &str, now: &DateTime<Tz>) -> FrameOutcome
    where
        Tz::Offset: fmt::Display,
    {
        match Snapshot::from_json(text) {
            Ok(snapshot) => {
                self.apply(snapshot, &minute_label(now));
                FrameOutcome::Applied
            }
            Err(e) => {
                warn!("discarding malformed frame: {}", e);
                self.frames_discarded += 1;
                FrameOutcome::Discarded
            }
        }
    }

    pub fn apply(&mut self, snapshot: Snapshot, minute: &str) {
        self.series.merge_snapshot(&snapshot, minute);
        self.latest = snapshot;
        self.frames_applied += 1;
    }

    pub fn protocol_distribution(&self) -> Vec<ProtocolShare> {
        let total: u64 = self.latest.protocol_counts.values().sum();
        let mut rows: Vec<ProtocolShare> = self
            .latest
            .protocol_counts
            .iter()
            .map(|(&protocol, &count)| ProtocolShare {
                protocol,
                count,
                percent: if total == 0 {
                    0.0
                } else {
                    count as f64 * 100.0 / total as f64
                },
            })
            .collect();
        rows.sort_by_key(|row| row.protocol);
        rows
    }

    pub fn top_destinations(&self) -> Vec<DestinationCount> {
        let mut rows: Vec<DestinationCount> = self
            .latest
            .destination_counts
            .iter()
            .map(|(address, &count)| DestinationCount {
                address: address.clone(),
                count,
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.address.cmp(&b.address)));
        rows.truncate(TOP_DESTINATIONS);
        rows
    }

    pub fn summary(&self) -> String {
        let top = self
            .top_destinations()
            .first()
            .map(|d| format!("{} ({})", d.address, d.count))
            .unwrap_or_else(|| "no data".to_string());
        format!(
            "total={} peak=[{}] lowest=[{}] top_destination={}",
            self.latest.total_count,
            Extreme(self.series.peak()),
            Extreme(self.series.trough()),
            top
        )
    }
}
