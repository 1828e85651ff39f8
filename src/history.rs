//! Bounded per-pair price history
//!
//! Every poll cycle appends one point per pair. The buffer is capped so
//! long-running sessions hold a predictable amount of memory; once full the
//! oldest point is dropped for each new one. Points are appended with a
//! monotonically non-decreasing clock, which lets look-back queries binary
//! search instead of scanning.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

/// One observed price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub time: DateTime<Utc>,
    pub price: f64,
}

/// Fixed-capacity, time-ordered price buffer.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    points: VecDeque<PricePoint>,
    max_len: usize,
}

impl PriceHistory {
    pub fn new(max_len: usize) -> Self {
        let max_len = max_len.max(1);
        Self {
            points: VecDeque::with_capacity(max_len.min(1024)),
            max_len,
        }
    }

    /// Append a point, evicting the oldest when at capacity.
    pub fn push(&mut self, point: PricePoint) {
        if self.points.len() == self.max_len {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn oldest(&self) -> Option<&PricePoint> {
        self.points.front()
    }

    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PricePoint> {
        self.points.iter()
    }

    /// Points observed at or after `cutoff`, oldest first.
    pub fn since(&self, cutoff: DateTime<Utc>) -> impl Iterator<Item = &PricePoint> {
        let start = self.points.partition_point(|point| point.time < cutoff);
        self.points.range(start..)
    }

    /// Seconds between the oldest and newest point, 0 with fewer than two.
    pub fn span_secs(&self) -> f64 {
        match (self.oldest(), self.latest()) {
            (Some(first), Some(last)) => {
                (last.time - first.time).num_milliseconds() as f64 / 1e3
            }
            _ => 0.0,
        }
    }
}
